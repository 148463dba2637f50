use crate::analysis::{AnalysisOutcome, AttackerTotal, RankedSummary, RankingBasis};
use crate::detect::{DetectionParams, Incident};
use crate::storage::Pool;
use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;
use uuid::Uuid;

const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Metadata of one stored analysis run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    pub id: Uuid,
    pub source: String,
    pub assumed_year: i32,
    pub window_minutes: i64,
    pub threshold: i64,
    pub lines_parsed: i64,
    pub lines_rejected: i64,
    pub basis: RankingBasis,
    pub created_at: String,
}

/// An incident as read back from the database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredIncident {
    pub run_id: Uuid,
    #[serde(flatten)]
    pub incident: Incident,
}

/// Persists analysis runs with their incidents and ranked summary.
#[derive(Clone)]
pub struct IncidentStore {
    pool: Pool,
}

impl IncidentStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Store a run in one transaction and return its ID.
    pub fn save_run(
        &self,
        outcome: &AnalysisOutcome,
        source: &str,
        detection: &DetectionParams,
        assumed_year: i32,
    ) -> Result<Uuid> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let id = Uuid::new_v4();
        let run_id = id.to_string();

        tx.execute(
            "INSERT INTO analysis_runs (
                id, source, assumed_year, window_minutes, threshold,
                lines_parsed, lines_rejected, basis, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                run_id,
                source,
                assumed_year,
                detection.window().num_minutes(),
                detection.threshold() as i64,
                outcome.stats.parsed as i64,
                outcome.stats.rejected() as i64,
                basis_to_str(outcome.summary.basis),
                Utc::now().to_rfc3339(),
            ],
        )
        .context("Failed to insert analysis run")?;

        {
            let mut insert = tx.prepare(
                "INSERT INTO incidents (run_id, origin, count, first_seen, last_seen)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for incident in &outcome.incidents {
                insert.execute(params![
                    run_id,
                    incident.origin,
                    incident.count as i64,
                    incident.first.format(TS_FORMAT).to_string(),
                    incident.last.format(TS_FORMAT).to_string(),
                ])?;
            }

            let mut insert = tx.prepare(
                "INSERT INTO run_summary (run_id, rank, origin, total) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (rank, entry) in outcome.summary.entries.iter().enumerate() {
                insert.execute(params![run_id, rank as i64, entry.origin, entry.total as i64])?;
            }
        }

        tx.commit().context("Failed to commit analysis run")?;
        tracing::info!(
            run_id = %id,
            %source,
            incidents = outcome.incidents.len(),
            "analysis run stored"
        );
        Ok(id)
    }

    /// Most recent run, if any.
    pub fn latest_run(&self) -> Result<Option<RunRecord>> {
        let conn = self.pool.get()?;
        let run = conn
            .query_row(
                "SELECT id, source, assumed_year, window_minutes, threshold,
                        lines_parsed, lines_rejected, basis, created_at
                 FROM analysis_runs ORDER BY created_at DESC, rowid DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    /// Incidents, newest run first, discovery order within a run.
    pub fn list_recent(&self, limit: usize) -> Result<Vec<StoredIncident>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT i.run_id, i.origin, i.count, i.first_seen, i.last_seen
             FROM incidents i JOIN analysis_runs r ON r.id = i.run_id
             ORDER BY r.created_at DESC, r.rowid DESC, i.id ASC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            Ok(StoredIncident {
                run_id: uuid_col(row, 0)?,
                incident: Incident {
                    origin: row.get(1)?,
                    count: row.get::<_, i64>(2)? as usize,
                    first: ts_col(row, 3)?,
                    last: ts_col(row, 4)?,
                },
            })
        })?;

        let mut incidents = Vec::new();
        for r in rows {
            incidents.push(r?);
        }
        Ok(incidents)
    }

    /// Ranked summary stored with the most recent run.
    pub fn latest_summary(&self) -> Result<Option<RankedSummary>> {
        let Some(run) = self.latest_run()? else {
            return Ok(None);
        };

        let conn = self.pool.get()?;
        let mut stmt =
            conn.prepare("SELECT origin, total FROM run_summary WHERE run_id = ?1 ORDER BY rank")?;
        let rows = stmt.query_map([run.id.to_string()], |row| {
            Ok(AttackerTotal {
                origin: row.get(0)?,
                total: row.get::<_, i64>(1)? as usize,
            })
        })?;

        let mut entries = Vec::new();
        for r in rows {
            entries.push(r?);
        }
        Ok(Some(RankedSummary {
            basis: run.basis,
            entries,
        }))
    }
}

fn basis_to_str(basis: RankingBasis) -> &'static str {
    match basis {
        RankingBasis::IncidentTotals => "incident_totals",
        RankingBasis::RawAttempts => "raw_attempts",
    }
}

fn basis_from_str(s: &str) -> RankingBasis {
    match s {
        "raw_attempts" => RankingBasis::RawAttempts,
        _ => RankingBasis::IncidentTotals,
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: uuid_col(row, 0)?,
        source: row.get(1)?,
        assumed_year: row.get(2)?,
        window_minutes: row.get(3)?,
        threshold: row.get(4)?,
        lines_parsed: row.get(5)?,
        lines_rejected: row.get(6)?,
        basis: basis_from_str(&row.get::<_, String>(7)?),
        created_at: row.get(8)?,
    })
}

fn uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, TS_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::runner::analyze_lines;
    use crate::detect::DetectionEngine;
    use crate::storage::open_pool;

    fn store() -> (tempfile::TempDir, IncidentStore) {
        let dir = tempfile::TempDir::new().unwrap();
        let pool = open_pool(&dir.path().join("test.db")).unwrap();
        (dir, IncidentStore::new(pool))
    }

    fn log_lines(origin: &str, n: u32) -> Vec<String> {
        (0..n)
            .map(|m| {
                format!(
                    "Mar 10 10:{:02}:00 host1 sshd[1]: Failed password for root from {} port 22 ssh2",
                    m, origin
                )
            })
            .collect()
    }

    #[test]
    fn test_save_and_list_round_trip() {
        let (_dir, store) = store();
        let params = DetectionParams::default();
        let engine = DetectionEngine::new(params);
        let mut lines = log_lines("203.0.113.45", 6);
        lines.extend(log_lines("198.51.100.7", 5));
        let outcome = analyze_lines(&lines, 2025, &engine);

        let run_id = store.save_run(&outcome, "auth.log", &params, 2025).unwrap();

        let stored = store.list_recent(10).unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|s| s.run_id == run_id));
        assert_eq!(stored[0].incident, outcome.incidents[0]);
        assert_eq!(stored[1].incident, outcome.incidents[1]);

        let run = store.latest_run().unwrap().unwrap();
        assert_eq!(run.id, run_id);
        assert_eq!(run.source, "auth.log");
        assert_eq!(run.window_minutes, 10);
        assert_eq!(run.threshold, 5);
        assert_eq!(run.lines_parsed, 11);
        assert_eq!(run.basis, RankingBasis::IncidentTotals);

        let summary = store.latest_summary().unwrap().unwrap();
        assert_eq!(summary, outcome.summary);
    }

    #[test]
    fn test_fallback_basis_survives_storage() {
        let (_dir, store) = store();
        let params = DetectionParams::default();
        let outcome = analyze_lines(&log_lines("192.0.2.1", 2), 2025, &DetectionEngine::new(params));
        store.save_run(&outcome, "-", &params, 2025).unwrap();

        let summary = store.latest_summary().unwrap().unwrap();
        assert_eq!(summary.basis, RankingBasis::RawAttempts);
        assert_eq!(summary.entries[0].total, 2);
        assert!(store.list_recent(10).unwrap().is_empty());
    }

    #[test]
    fn test_empty_store() {
        let (_dir, store) = store();
        assert!(store.latest_run().unwrap().is_none());
        assert!(store.latest_summary().unwrap().is_none());
        assert!(store.list_recent(5).unwrap().is_empty());
    }

    #[test]
    fn test_list_recent_respects_limit() {
        let (_dir, store) = store();
        let params = DetectionParams::from_minutes(10, 1).unwrap();
        let engine = DetectionEngine::new(params);
        let lines: Vec<String> = (0..4)
            .flat_map(|n| log_lines(&format!("10.0.0.{n}"), 1))
            .collect();
        let outcome = analyze_lines(&lines, 2025, &engine);
        assert_eq!(outcome.incidents.len(), 4);
        store.save_run(&outcome, "auth.log", &params, 2025).unwrap();

        assert_eq!(store.list_recent(3).unwrap().len(), 3);
    }
}
