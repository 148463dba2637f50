use crate::detect::{Incident, OriginTimeline};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;

/// What the totals in a [`RankedSummary`] count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingBasis {
    /// Sum of incident counts per origin.
    IncidentTotals,
    /// No incidents were found; raw failed attempts per origin.
    RawAttempts,
}

impl std::fmt::Display for RankingBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RankingBasis::IncidentTotals => write!(f, "incident totals"),
            RankingBasis::RawAttempts => write!(f, "raw failed attempts"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackerTotal {
    pub origin: String,
    pub total: usize,
}

/// Origins ranked by total, descending; ties keep first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedSummary {
    pub basis: RankingBasis,
    pub entries: Vec<AttackerTotal>,
}

impl RankedSummary {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top(&self, n: usize) -> &[AttackerTotal] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn is_fallback(&self) -> bool {
        self.basis == RankingBasis::RawAttempts
    }
}

/// Sum incident counts per origin and rank them.
///
/// Ties fall back to the order in which origins first appear in `incidents`.
pub fn aggregate(incidents: &[Incident]) -> RankedSummary {
    RankedSummary {
        basis: RankingBasis::IncidentTotals,
        entries: rank(sum_by_origin(incidents)),
    }
}

/// Rank incident totals, or raw attempt counts when there are no incidents.
///
/// Ties fall back to the timeline's first-seen order.
pub fn summarize(incidents: &[Incident], timeline: &OriginTimeline) -> RankedSummary {
    if incidents.is_empty() && !timeline.is_empty() {
        return RankedSummary {
            basis: RankingBasis::RawAttempts,
            entries: rank(timeline.attempt_counts()),
        };
    }

    let mut totals = sum_by_origin(incidents);
    totals.sort_by_key(|(origin, _)| timeline.rank_of(origin).unwrap_or(usize::MAX));
    RankedSummary {
        basis: RankingBasis::IncidentTotals,
        entries: rank(totals),
    }
}

fn sum_by_origin(incidents: &[Incident]) -> Vec<(String, usize)> {
    let mut totals: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for incident in incidents {
        match index.get(incident.origin.as_str()) {
            Some(&idx) => totals[idx].1 += incident.count,
            None => {
                index.insert(&incident.origin, totals.len());
                totals.push((incident.origin.clone(), incident.count));
            }
        }
    }
    totals
}

fn rank(mut totals: Vec<(String, usize)>) -> Vec<AttackerTotal> {
    // stable: equal totals keep their incoming order
    totals.sort_by_key(|(_, total)| Reverse(*total));
    totals
        .into_iter()
        .map(|(origin, total)| AttackerTotal { origin, total })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(10, m, 0)
            .unwrap()
    }

    fn incident(origin: &str, count: usize) -> Incident {
        Incident {
            origin: origin.to_string(),
            count,
            first: at(0),
            last: at(5),
        }
    }

    fn origins(summary: &RankedSummary) -> Vec<&str> {
        summary.entries.iter().map(|e| e.origin.as_str()).collect()
    }

    #[test]
    fn test_sums_multiple_incidents_per_origin() {
        let incidents = vec![incident("a", 5), incident("b", 7), incident("a", 6)];
        let summary = aggregate(&incidents);
        assert_eq!(summary.basis, RankingBasis::IncidentTotals);
        assert_eq!(
            summary.entries,
            vec![
                AttackerTotal { origin: "a".into(), total: 11 },
                AttackerTotal { origin: "b".into(), total: 7 },
            ]
        );
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let incidents = vec![incident("c", 5), incident("a", 9), incident("b", 5), incident("d", 5)];
        let summary = aggregate(&incidents);
        assert_eq!(origins(&summary), vec!["a", "c", "b", "d"]);
        assert_eq!(aggregate(&incidents), summary);
    }

    #[test]
    fn test_empty() {
        let summary = aggregate(&[]);
        assert!(summary.is_empty());
        assert!(!summary.is_fallback());
        assert!(summary.top(10).is_empty());
    }

    #[test]
    fn test_summarize_falls_back_to_raw_counts() {
        let mut timeline = OriginTimeline::new();
        timeline.push("x", at(0));
        timeline.push("y", at(0));
        timeline.push("y", at(1));
        timeline.push("z", at(2));

        let summary = summarize(&[], &timeline);
        assert_eq!(summary.basis, RankingBasis::RawAttempts);
        assert!(summary.is_fallback());
        assert_eq!(origins(&summary), vec!["y", "x", "z"]);
        assert_eq!(summary.entries[0].total, 2);
    }

    #[test]
    fn test_summarize_without_any_data() {
        let summary = summarize(&[], &OriginTimeline::new());
        assert_eq!(summary.basis, RankingBasis::IncidentTotals);
        assert!(summary.is_empty());
    }

    #[test]
    fn test_summarize_ties_follow_timeline_order() {
        let mut timeline = OriginTimeline::new();
        timeline.push("first", at(0));
        timeline.push("second", at(0));

        let incidents = vec![incident("second", 5), incident("first", 5)];
        let summary = summarize(&incidents, &timeline);
        assert_eq!(summary.basis, RankingBasis::IncidentTotals);
        assert_eq!(origins(&summary), vec!["first", "second"]);
    }

    #[test]
    fn test_top_truncates() {
        let incidents: Vec<_> = (0..15).map(|n| incident(&format!("10.0.0.{n}"), 5 + n)).collect();
        let summary = aggregate(&incidents);
        let top = summary.top(10);
        assert_eq!(top.len(), 10);
        assert_eq!(top[0].origin, "10.0.0.14");
        assert_eq!(top[0].total, 19);
    }

    #[test]
    fn test_summary_json_shape() {
        let summary = aggregate(&[incident("a", 5)]);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["basis"], "incident_totals");
        assert_eq!(json["entries"][0]["origin"], "a");
        assert_eq!(json["entries"][0]["total"], 5);
    }
}
