//! Human-readable rendering of analysis results.

use super::aggregator::RankedSummary;
use crate::detect::{Incident, OriginTimeline};
use std::fmt::Write;

const BAR_WIDTH: usize = 40;

/// Raw failed attempts per origin, first-seen order.
pub fn format_attempt_counts(timeline: &OriginTimeline) -> String {
    if timeline.is_empty() {
        return "No failed-auth entries found in the log.\n".to_string();
    }
    let mut out = String::from("Failed attempts per IP (counts):\n");
    for (origin, count) in timeline.attempt_counts() {
        let _ = writeln!(out, "  {}: {} failed attempts", origin, count);
    }
    out
}

/// Incident count followed by the first `preview` incidents.
pub fn format_incident_preview(incidents: &[Incident], preview: usize) -> String {
    let mut out = format!("Detected {} brute-force incidents\n", incidents.len());
    for incident in incidents.iter().take(preview) {
        let _ = writeln!(
            out,
            "  {:<18} {:>5} attempts  {} .. {}",
            incident.origin,
            incident.count,
            incident.first.format("%Y-%m-%d %H:%M:%S"),
            incident.last.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    if incidents.len() > preview {
        out.push_str("  ...\n");
    }
    out
}

/// Table of the top `n` origins, labelled with the ranking basis.
pub fn format_top_attackers(summary: &RankedSummary, n: usize) -> String {
    if summary.is_empty() {
        return "No attackers to summarize.\n".to_string();
    }
    let mut out = format!("Top attacker IPs (by {}):\n", summary.basis);
    let _ = writeln!(out, "{:<20} | Failed attempts", "IP");
    let _ = writeln!(out, "{:-<20}-|-{:-<15}", "", "");
    for entry in summary.top(n) {
        let _ = writeln!(out, "{:<20} | {}", entry.origin, entry.total);
    }
    out
}

/// Horizontal bar chart of the top `n` origins, scaled to the largest total.
pub fn render_bar_chart(summary: &RankedSummary, n: usize) -> String {
    let top = summary.top(n);
    let max = top.iter().map(|e| e.total).max().unwrap_or(0);
    if max == 0 {
        return String::new();
    }

    let label_width = top.iter().map(|e| e.origin.len()).max().unwrap_or(0);
    let mut out = String::from("Top attacker IPs\n");
    for entry in top {
        let len = (entry.total * BAR_WIDTH).div_ceil(max);
        let _ = writeln!(
            out,
            "{:>width$} | {} {}",
            entry.origin,
            "#".repeat(len),
            entry.total,
            width = label_width
        );
    }
    out
}
