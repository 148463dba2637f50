//! JSON export of incidents and ranked summaries.

use crate::analysis::RankedSummary;
use crate::detect::Incident;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

/// Write the incident list as a pretty-printed JSON array.
pub fn write_incidents(path: &Path, incidents: &[Incident]) -> Result<()> {
    write_json(path, incidents)?;
    tracing::info!(path = %path.display(), count = incidents.len(), "incidents exported");
    Ok(())
}

/// Write the ranked summary as pretty-printed JSON.
pub fn write_summary(path: &Path, summary: &RankedSummary) -> Result<()> {
    write_json(path, summary)?;
    tracing::info!(path = %path.display(), basis = ?summary.basis, "summary exported");
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json + "\n")
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
