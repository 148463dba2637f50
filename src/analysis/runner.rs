use crate::analysis::aggregator::{summarize, RankedSummary};
use crate::detect::{DetectionEngine, Incident, OriginTimeline};
use crate::parse::{parse_line, ParseStats};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

/// Everything one pass over a log produces.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub stats: ParseStats,
    #[serde(skip)]
    pub timeline: OriginTimeline,
    pub incidents: Vec<Incident>,
    pub summary: RankedSummary,
}

/// Open a log source; `-` reads stdin.
pub fn open_source(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path)
        .with_context(|| format!("failed to open log file: {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Parse every line of `reader` straight into a timeline.
///
/// Invalid UTF-8 is replaced rather than aborting the read.
pub fn collect_timeline<R: BufRead>(mut reader: R, year: i32) -> Result<(OriginTimeline, ParseStats)> {
    let mut timeline = OriginTimeline::new();
    let mut stats = ParseStats::default();
    let mut buf = Vec::new();
    let mut lineno = 0usize;

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .context("failed to read log line")?;
        if read == 0 {
            break;
        }
        lineno += 1;

        let line = String::from_utf8_lossy(&buf);
        if line.trim().is_empty() {
            continue;
        }
        let result = parse_line(&line, year);
        stats.record(&result);
        match result {
            Ok(event) => {
                timeline.record(&event);
            }
            Err(reject) => debug!(line = lineno, %reject, "skipping line"),
        }
    }

    info!(
        parsed = stats.parsed,
        rejected = stats.rejected(),
        origins = timeline.len(),
        failed_attempts = timeline.total_attempts(),
        "log ingested"
    );
    Ok((timeline, stats))
}

/// Run detection and ranking over an already-built timeline.
pub fn analyze_timeline(
    timeline: OriginTimeline,
    stats: ParseStats,
    engine: &DetectionEngine,
) -> AnalysisOutcome {
    let incidents = engine.run(&timeline);
    finish(timeline, stats, incidents)
}

/// Full pipeline over a reader, detecting sequentially.
pub fn analyze_reader<R: BufRead>(reader: R, year: i32, engine: &DetectionEngine) -> Result<AnalysisOutcome> {
    let (timeline, stats) = collect_timeline(reader, year)?;
    Ok(analyze_timeline(timeline, stats, engine))
}

/// Full pipeline over in-memory lines.
pub fn analyze_lines<I, S>(lines: I, year: i32, engine: &DetectionEngine) -> AnalysisOutcome
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let (events, stats) = crate::parse::parse_lines(lines, year);
    let timeline = OriginTimeline::ingest(&events);
    analyze_timeline(timeline, stats, engine)
}

/// Full pipeline over a reader, reading and detecting on the blocking pool.
pub async fn analyze_reader_parallel<R>(
    reader: R,
    year: i32,
    engine: &DetectionEngine,
) -> Result<AnalysisOutcome>
where
    R: BufRead + Send + 'static,
{
    let (timeline, stats) = tokio::task::spawn_blocking(move || collect_timeline(reader, year))
        .await
        .context("log reader task panicked")??;
    let incidents = engine.run_parallel(&timeline).await?;
    Ok(finish(timeline, stats, incidents))
}

fn finish(timeline: OriginTimeline, stats: ParseStats, incidents: Vec<Incident>) -> AnalysisOutcome {
    let summary = summarize(&incidents, &timeline);
    if summary.is_fallback() {
        info!("no incidents found, ranking origins by raw failed attempts");
    }
    AnalysisOutcome {
        stats,
        timeline,
        incidents,
        summary,
    }
}
