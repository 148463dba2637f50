//! Burst detection: per-origin grouping and incident clustering.

pub mod burst;
pub mod engine;
pub mod timeline;

pub use self::burst::detect;
pub use self::engine::DetectionEngine;
pub use self::timeline::OriginTimeline;

use crate::config::ConfigError;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One dense cluster of failed attempts from a single origin.
///
/// Serialises as `{"ip", "count", "first", "last"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    #[serde(rename = "ip", alias = "origin")]
    pub origin: String,
    pub count: usize,
    pub first: NaiveDateTime,
    pub last: NaiveDateTime,
}

impl Incident {
    pub fn span(&self) -> Duration {
        self.last - self.first
    }
}

/// Validated window/threshold pair. Only constructible through [`DetectionParams::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionParams {
    window: Duration,
    threshold: usize,
}

impl DetectionParams {
    pub fn new(window: Duration, threshold: i64) -> Result<Self, ConfigError> {
        if threshold <= 0 {
            return Err(ConfigError::NonPositiveThreshold(threshold));
        }
        if window <= Duration::zero() {
            return Err(ConfigError::NonPositiveWindow(window.num_seconds()));
        }
        Ok(Self {
            window,
            threshold: threshold as usize,
        })
    }

    pub fn from_minutes(window_minutes: i64, threshold: i64) -> Result<Self, ConfigError> {
        if window_minutes <= 0 {
            return Err(ConfigError::NonPositiveWindow(window_minutes.saturating_mul(60)));
        }
        let window =
            Duration::try_minutes(window_minutes).ok_or(ConfigError::WindowOutOfRange(window_minutes))?;
        Self::new(window, threshold)
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            window: Duration::minutes(10),
            threshold: 5,
        }
    }
}
