//! Auth-log line parsing.
//!
//! Turns one raw syslog-style line into an [`AuthEvent`]. Lines whose
//! timestamp cannot be read are rejected with a [`ParseReject`]; everything
//! else (missing origin, unrecognised message) still yields an event.

mod line;

pub use self::line::{classify, extract_origin, parse_line, parse_lines, CLASSIFICATION_RULES};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a line could not be turned into an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseReject {
    #[error("line has {tokens} tokens, need at least 3 for a timestamp")]
    TooShort { tokens: usize },
    #[error("unparseable timestamp '{raw}'")]
    BadTimestamp { raw: String },
}

/// Outcome of an authentication attempt, as far as the log line tells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Failed,
    Accepted,
    Other,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Failed => write!(f, "failed"),
            EventKind::Accepted => write!(f, "accepted"),
            EventKind::Other => write!(f, "other"),
        }
    }
}

/// One parsed authentication log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEvent {
    pub timestamp: NaiveDateTime,
    /// Token following `from`, if the line carries one.
    pub origin: Option<String>,
    pub kind: EventKind,
}

/// Per-batch diagnostic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    pub parsed: usize,
    pub too_short: usize,
    pub bad_timestamp: usize,
}

impl ParseStats {
    pub fn rejected(&self) -> usize {
        self.too_short + self.bad_timestamp
    }

    pub fn total(&self) -> usize {
        self.parsed + self.rejected()
    }

    pub(crate) fn record(&mut self, result: &Result<AuthEvent, ParseReject>) {
        match result {
            Ok(_) => self.parsed += 1,
            Err(ParseReject::TooShort { .. }) => self.too_short += 1,
            Err(ParseReject::BadTimestamp { .. }) => self.bad_timestamp += 1,
        }
    }
}
