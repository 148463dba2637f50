use crate::detect::burst;
use crate::detect::timeline::OriginTimeline;
use crate::detect::{DetectionParams, Incident};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Runs the burst detector over every origin of a timeline.
#[derive(Debug, Clone)]
pub struct DetectionEngine {
    params: DetectionParams,
    max_workers: usize,
}

impl DetectionEngine {
    pub fn new(params: DetectionParams) -> Self {
        Self {
            params,
            max_workers: 4,
        }
    }

    /// Cap on concurrent detector tasks for [`run_parallel`](Self::run_parallel). Zero is treated as one.
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn params(&self) -> &DetectionParams {
        &self.params
    }

    /// Detect sequentially, origin by origin in first-seen order.
    pub fn run(&self, timeline: &OriginTimeline) -> Vec<Incident> {
        let mut incidents = Vec::new();
        for (origin, times) in timeline.iter() {
            let found = burst::detect(origin, times, &self.params);
            log_found(origin, &found);
            incidents.extend(found);
        }
        info!(
            origins = timeline.len(),
            incidents = incidents.len(),
            "burst detection complete"
        );
        incidents
    }

    /// Detect on blocking worker tasks, one per origin, at most `max_workers` at a time.
    ///
    /// Output order matches [`run`](Self::run) regardless of completion order.
    pub async fn run_parallel(&self, timeline: &OriginTimeline) -> Result<Vec<Incident>> {
        let permits = Arc::new(Semaphore::new(self.max_workers));
        let mut tasks = JoinSet::new();

        for (rank, (origin, times)) in timeline.iter().enumerate() {
            let permit = permits
                .clone()
                .acquire_owned()
                .await
                .context("detector worker pool closed")?;
            let origin = origin.to_string();
            let times = times.to_vec();
            let params = self.params;

            tasks.spawn_blocking(move || {
                let _permit = permit;
                let found = burst::detect(&origin, &times, &params);
                (rank, found)
            });
        }

        let mut per_origin: Vec<(usize, Vec<Incident>)> = Vec::with_capacity(timeline.len());
        while let Some(joined) = tasks.join_next().await {
            per_origin.push(joined.context("detector task panicked")?);
        }
        per_origin.sort_by_key(|(rank, _)| *rank);

        let mut incidents = Vec::new();
        for (_, found) in per_origin {
            if let Some(first) = found.first() {
                log_found(&first.origin, &found);
            }
            incidents.extend(found);
        }
        info!(
            origins = timeline.len(),
            incidents = incidents.len(),
            workers = self.max_workers,
            "parallel burst detection complete"
        );
        Ok(incidents)
    }
}

fn log_found(origin: &str, found: &[Incident]) {
    for incident in found {
        debug!(
            %origin,
            count = incident.count,
            first = %incident.first,
            last = %incident.last,
            "burst detected"
        );
    }
}
