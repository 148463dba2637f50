//! End-to-end detection scenarios over the library API.

use authburst::analysis::runner::{analyze_lines, analyze_reader, analyze_reader_parallel};
use authburst::analysis::RankingBasis;
use authburst::detect::{detect, DetectionEngine, DetectionParams};
use authburst::parse::{parse_line, EventKind};
use chrono::{NaiveDate, NaiveDateTime};
use std::io::Cursor;

fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 10)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

fn params(window_minutes: i64, threshold: i64) -> DetectionParams {
    DetectionParams::from_minutes(window_minutes, threshold).unwrap()
}

fn failed(ts: &str, origin: &str) -> String {
    format!("Mar 10 {ts} host1 sshd[1]: Failed password for root from {origin} port 22 ssh2")
}

#[test]
fn five_attempts_inside_window_form_one_incident() {
    let ts: Vec<_> = (0..5).map(|m| at(10, m, 0)).collect();
    let found = detect("203.0.113.45", &ts, &params(10, 5));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].count, 5);
    assert_eq!(found[0].first, at(10, 0, 0));
    assert_eq!(found[0].last, at(10, 4, 0));
}

#[test]
fn threshold_above_count_yields_nothing() {
    let ts: Vec<_> = (0..5).map(|m| at(10, m, 0)).collect();
    assert!(detect("203.0.113.45", &ts, &params(10, 6)).is_empty());
}

#[test]
fn isolated_leading_attempt_is_dropped() {
    let mut ts = vec![at(10, 0, 0)];
    ts.extend((20..25).map(|m| at(10, m, 0)));
    let found = detect("203.0.113.45", &ts, &params(10, 5));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].count, 5);
    assert_eq!(found[0].first, at(10, 20, 0));
    assert_eq!(found[0].last, at(10, 24, 0));
}

#[test]
fn empty_timestamps_yield_nothing() {
    assert!(detect("203.0.113.45", &[], &params(10, 5)).is_empty());
}

#[test]
fn invalid_user_line_parses() {
    let line = "Mar 10 13:58:01 host1 sshd[1023]: Failed password for invalid user admin from 203.0.113.45 port 52344 ssh2";
    let event = parse_line(line, 2025).unwrap();
    assert_eq!(event.kind, EventKind::Failed);
    assert_eq!(event.origin.as_deref(), Some("203.0.113.45"));
    assert_eq!(event.timestamp, at(13, 58, 1));
}

#[test]
fn pipeline_ranks_by_incident_totals() {
    let mut lines = Vec::new();
    // Two bursts from .45 separated by more than the window.
    for m in 0..5 {
        lines.push(failed(&format!("10:0{m}:00"), "203.0.113.45"));
    }
    for m in 0..5 {
        lines.push(failed(&format!("11:0{m}:00"), "203.0.113.45"));
    }
    for m in 0..7 {
        lines.push(failed(&format!("12:0{m}:00"), "192.0.2.10"));
    }
    lines.push(failed("12:30:00", "198.51.100.7"));

    let outcome = analyze_lines(&lines, 2025, &DetectionEngine::new(params(10, 5)));
    assert_eq!(outcome.incidents.len(), 3);
    assert_eq!(outcome.summary.basis, RankingBasis::IncidentTotals);
    let ranked: Vec<_> = outcome
        .summary
        .entries
        .iter()
        .map(|e| (e.origin.as_str(), e.total))
        .collect();
    assert_eq!(ranked, vec![("203.0.113.45", 10), ("192.0.2.10", 7)]);
}

#[test]
fn equal_totals_keep_first_seen_order() {
    let mut lines = Vec::new();
    for m in 0..5 {
        lines.push(failed(&format!("10:0{m}:00"), "198.51.100.7"));
        lines.push(failed(&format!("10:0{m}:30"), "192.0.2.10"));
    }
    let outcome = analyze_lines(&lines, 2025, &DetectionEngine::new(params(10, 5)));
    let order: Vec<_> = outcome.summary.entries.iter().map(|e| e.origin.as_str()).collect();
    assert_eq!(order, vec!["198.51.100.7", "192.0.2.10"]);
}

#[test]
fn out_of_order_lines_are_sorted_before_clustering() {
    let lines = vec![
        failed("10:04:00", "203.0.113.45"),
        failed("10:00:00", "203.0.113.45"),
        failed("10:02:00", "203.0.113.45"),
        failed("10:01:00", "203.0.113.45"),
        failed("10:03:00", "203.0.113.45"),
    ];
    let outcome = analyze_lines(&lines, 2025, &DetectionEngine::new(params(10, 5)));
    assert_eq!(outcome.incidents.len(), 1);
    assert_eq!(outcome.incidents[0].first, at(10, 0, 0));
    assert_eq!(outcome.incidents[0].last, at(10, 4, 0));
}

#[tokio::test]
async fn parallel_reader_matches_sequential_reader() {
    let mut log = String::new();
    for (i, origin) in ["203.0.113.45", "192.0.2.10", "198.51.100.7", "203.0.113.9"]
        .iter()
        .enumerate()
    {
        for m in 0..(4 + i) {
            log.push_str(&failed(&format!("1{i}:0{m}:00"), origin));
            log.push('\n');
        }
    }
    log.push_str("garbage\n");

    let engine = DetectionEngine::new(params(10, 5)).with_max_workers(2);
    let sequential = analyze_reader(Cursor::new(log.clone()), 2025, &engine).unwrap();
    let parallel = analyze_reader_parallel(Cursor::new(log), 2025, &engine)
        .await
        .unwrap();

    assert_eq!(sequential.incidents, parallel.incidents);
    assert_eq!(sequential.summary, parallel.summary);
    assert_eq!(sequential.stats, parallel.stats);
    assert_eq!(parallel.stats.too_short, 1);
}
