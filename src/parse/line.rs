use super::{AuthEvent, EventKind, ParseReject, ParseStats};
use chrono::NaiveDateTime;
use tracing::debug;

/// Substring rules, evaluated first-match. Order is significant.
pub const CLASSIFICATION_RULES: &[(&str, EventKind)] = &[
    ("Failed password", EventKind::Failed),
    ("Accepted password", EventKind::Accepted),
    ("Accepted publickey", EventKind::Accepted),
];

const TIMESTAMP_FORMAT: &str = "%Y %b %d %H:%M:%S";

/// Parse one auth-log line such as
/// `Mar 10 13:58:01 host1 sshd[1023]: Failed password for root from 203.0.113.45 port 52344 ssh2`.
///
/// The syslog timestamp carries no year, so `year` is prefixed before parsing.
pub fn parse_line(line: &str, year: i32) -> Result<AuthEvent, ParseReject> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(ParseReject::TooShort {
            tokens: tokens.len(),
        });
    }

    let raw = tokens[..3].join(" ");
    let timestamp = NaiveDateTime::parse_from_str(&format!("{} {}", year, raw), TIMESTAMP_FORMAT)
        .map_err(|_| ParseReject::BadTimestamp { raw })?;

    Ok(AuthEvent {
        timestamp,
        origin: extract_origin(&tokens),
        kind: classify(line),
    })
}

/// Event kind by the first matching rule in [`CLASSIFICATION_RULES`].
pub fn classify(line: &str) -> EventKind {
    CLASSIFICATION_RULES
        .iter()
        .find(|(pattern, _)| line.contains(pattern))
        .map(|(_, kind)| *kind)
        .unwrap_or(EventKind::Other)
}

/// The token after the first literal `from`, minus trailing `,` / `;`.
pub fn extract_origin(tokens: &[&str]) -> Option<String> {
    let idx = tokens.iter().position(|t| *t == "from")?;
    let candidate = tokens.get(idx + 1)?.trim_end_matches([',', ';']);
    if candidate.is_empty() {
        return None;
    }
    Some(candidate.to_string())
}

/// Parse a batch of lines, skipping rejects and counting them.
pub fn parse_lines<I, S>(lines: I, year: i32) -> (Vec<AuthEvent>, ParseStats)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut stats = ParseStats::default();
    let mut events = Vec::new();

    for (lineno, line) in lines.into_iter().enumerate() {
        let line = line.as_ref();
        if line.trim().is_empty() {
            continue;
        }
        let result = parse_line(line, year);
        stats.record(&result);
        match result {
            Ok(event) => events.push(event),
            Err(reject) => debug!(line = lineno + 1, %reject, "skipping line"),
        }
    }

    (events, stats)
}
