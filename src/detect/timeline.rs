//! Per-origin failed-attempt timelines.

use crate::parse::{AuthEvent, EventKind};
use chrono::NaiveDateTime;
use std::collections::HashMap;

/// Failed-attempt timestamps keyed by origin, in first-seen origin order.
///
/// Timestamps are kept in arrival order; the detector sorts its own copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginTimeline {
    entries: Vec<(String, Vec<NaiveDateTime>)>,
    index: HashMap<String, usize>,
}

impl OriginTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a timeline from a batch of events.
    pub fn ingest<'a, I>(events: I) -> Self
    where
        I: IntoIterator<Item = &'a AuthEvent>,
    {
        let mut timeline = Self::new();
        for event in events {
            timeline.record(event);
        }
        timeline
    }

    /// Append one event. Returns `true` if it was kept.
    ///
    /// Only failed attempts with an origin are kept.
    pub fn record(&mut self, event: &AuthEvent) -> bool {
        if event.kind != EventKind::Failed {
            return false;
        }
        match event.origin.as_deref() {
            Some(origin) => {
                self.push(origin, event.timestamp);
                true
            }
            None => false,
        }
    }

    /// Append a raw timestamp for `origin`.
    pub fn push(&mut self, origin: &str, at: NaiveDateTime) {
        match self.index.get(origin) {
            Some(&idx) => self.entries[idx].1.push(at),
            None => {
                self.index.insert(origin.to_string(), self.entries.len());
                self.entries.push((origin.to_string(), vec![at]));
            }
        }
    }

    /// Number of distinct origins.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, origin: &str) -> Option<&[NaiveDateTime]> {
        self.index
            .get(origin)
            .map(|&idx| self.entries[idx].1.as_slice())
    }

    /// Origins with their timestamps, first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[NaiveDateTime])> {
        self.entries
            .iter()
            .map(|(origin, times)| (origin.as_str(), times.as_slice()))
    }

    /// Position of `origin` in first-seen order.
    pub fn rank_of(&self, origin: &str) -> Option<usize> {
        self.index.get(origin).copied()
    }

    /// Raw failed-attempt count per origin, first-seen order.
    pub fn attempt_counts(&self) -> Vec<(String, usize)> {
        self.entries
            .iter()
            .map(|(origin, times)| (origin.clone(), times.len()))
            .collect()
    }

    pub fn total_attempts(&self) -> usize {
        self.entries.iter().map(|(_, times)| times.len()).sum()
    }
}
