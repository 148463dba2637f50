//! Anchor-and-consume burst clustering.
//!
//! A cluster starts at index `i` and extends `j` while
//! `t[j + 1] - t[i] <= window`. Clusters of at least `threshold` entries are
//! reported and consumed whole; shorter ones move the anchor by one. `j`
//! never moves backward, so each pass is linear after the sort.

use super::{DetectionParams, Incident};
use chrono::{Duration, NaiveDateTime};
use std::ops::RangeInclusive;

/// Detect bursts in one origin's timestamps. Input order does not matter.
pub fn detect(origin: &str, timestamps: &[NaiveDateTime], params: &DetectionParams) -> Vec<Incident> {
    let mut sorted = timestamps.to_vec();
    sorted.sort();

    clusters(&sorted, params.window(), params.threshold())
        .into_iter()
        .map(|range| Incident {
            origin: origin.to_string(),
            count: range.end() - range.start() + 1,
            first: sorted[*range.start()],
            last: sorted[*range.end()],
        })
        .collect()
}

/// Index ranges of reported clusters over an ascending slice.
///
/// Total for any `window`, including zero or negative ones.
pub fn clusters(
    sorted: &[NaiveDateTime],
    window: Duration,
    threshold: usize,
) -> Vec<RangeInclusive<usize>> {
    let n = sorted.len();
    let mut found = Vec::new();
    let mut i = 0;
    let mut j = 0;

    while i < n {
        if j < i {
            j = i;
        }
        while j + 1 < n && sorted[j + 1] - sorted[i] <= window {
            j += 1;
        }

        let size = j - i + 1;
        if size >= threshold {
            found.push(i..=j);
            i = j + 1;
        } else {
            i += 1;
        }
    }

    found
}
