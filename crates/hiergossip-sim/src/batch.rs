//! Batch execution: one run per seed, executed concurrently.
//!
//! Each run is CPU-bound, so runs go to the blocking pool and are joined in
//! seed order. With `both_schedules` every seed runs once per schedule. The
//! batch report keeps every run plus, per schedule and variant, the
//! per-time mean of the estimate across runs.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SimConfig;
use crate::scenario::{RunReport, Scenario, ScheduleKind, Variant};
use crate::SimError;

/// Result of a batch of runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub config: SimConfig,
    pub runs: Vec<RunReport>,
    /// Per schedule and variant, the estimate averaged over runs at each
    /// time unit.
    pub mean_estimate: BTreeMap<ScheduleKind, BTreeMap<Variant, Vec<f64>>>,
}

impl BatchReport {
    pub fn new(config: SimConfig, runs: Vec<RunReport>) -> Self {
        let mean_estimate = mean_estimates(&runs);
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            config,
            runs,
            mean_estimate,
        }
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), "Batch report written");
        Ok(())
    }

    /// One line per schedule and variant: final mean estimate against the
    /// ideal count.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for (schedule, variants) in &self.mean_estimate {
            let runs = self.runs.iter().filter(|r| r.schedule == *schedule).count();
            for (variant, series) in variants {
                let last = series.last().copied().unwrap_or(0.0);
                let peak = series.iter().copied().fold(0.0, f64::max);
                lines.push(format!(
                    "{variant} ({schedule}): final mean estimate {last:.2} (peak {peak:.2}) of {} devices over {runs} runs",
                    self.config.network.devices,
                ));
            }
        }
        lines
    }
}

/// Average the estimate of each variant across runs of the same schedule,
/// time by time. Runs shorter than the longest one do not contribute past
/// their end.
pub fn mean_estimates(runs: &[RunReport]) -> BTreeMap<ScheduleKind, BTreeMap<Variant, Vec<f64>>> {
    let mut sums: BTreeMap<(ScheduleKind, Variant), Vec<(f64, usize)>> = BTreeMap::new();
    for run in runs {
        for (variant, series) in &run.summaries {
            let acc = sums.entry((run.schedule, *variant)).or_default();
            if acc.len() < series.len() {
                acc.resize(series.len(), (0.0, 0));
            }
            for (slot, summary) in acc.iter_mut().zip(series) {
                slot.0 += summary.estimate as f64;
                slot.1 += 1;
            }
        }
    }
    let mut means: BTreeMap<ScheduleKind, BTreeMap<Variant, Vec<f64>>> = BTreeMap::new();
    for ((schedule, variant), acc) in sums {
        let series = acc
            .into_iter()
            .map(|(sum, n)| if n == 0 { 0.0 } else { sum / n as f64 })
            .collect();
        means.entry(schedule).or_default().insert(variant, series);
    }
    means
}

/// Run `config.batch.runs` seeds starting at `config.network.seed`, under
/// the configured schedule or under both.
pub async fn run_batch(config: SimConfig) -> Result<BatchReport, SimError> {
    config.validate()?;

    let first = config.network.seed;
    let runs = config.batch.runs;
    let schedules = if config.batch.both_schedules {
        vec![ScheduleKind::Sync, ScheduleKind::Async]
    } else {
        vec![ScheduleKind::of(config.schedule.synchronous)]
    };
    tracing::info!(
        runs,
        first_seed = first,
        devices = config.network.devices,
        schedules = schedules.len(),
        "Batch started"
    );

    let mut handles = Vec::new();
    for seed in first..first.saturating_add(runs) {
        for &schedule in &schedules {
            let mut run_config = config.clone();
            run_config.schedule.synchronous = schedule.is_synchronous();
            handles.push(tokio::task::spawn_blocking(move || {
                Scenario::new(&run_config, seed, false)?.run()
            }));
        }
    }

    let mut reports = Vec::with_capacity(handles.len());
    for handle in handles {
        let report = handle
            .await
            .map_err(|e| SimError::Join(e.to_string()))??;
        reports.push(report);
    }

    tracing::info!(runs = reports.len(), "Batch finished");
    Ok(BatchReport::new(config, reports))
}
