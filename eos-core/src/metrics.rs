use std::time::Duration;

use eos_quantities::Euros;
use tracing::info;

use crate::{
    optimizer::Termination,
    persistence::SinkError,
    record::{RunId, RunSummary},
};

/// Per-run figures for dashboards.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct RunMetrics {
    pub run_id: RunId,
    pub duration: Duration,
    pub n_iterations: usize,
    pub n_evaluations: usize,
    pub n_rejected: usize,

    /// Loss of the best schedule.
    pub objective: Euros,

    pub termination: Termination,
}

impl From<&RunSummary> for RunMetrics {
    fn from(summary: &RunSummary) -> Self {
        Self {
            run_id: summary.run_id.clone(),
            duration: summary.elapsed,
            n_iterations: summary.n_iterations,
            n_evaluations: summary.n_evaluations,
            n_rejected: summary.n_rejected,
            objective: summary.loss,
            termination: summary.termination,
        }
    }
}

pub trait MetricsExporter {
    fn export(&self, metrics: &RunMetrics) -> Result<(), SinkError>;
}

/// Emits the metrics as a log event.
#[derive(Copy, Clone, Debug, Default)]
pub struct TracingExporter;

impl MetricsExporter for TracingExporter {
    fn export(&self, metrics: &RunMetrics) -> Result<(), SinkError> {
        info!(
            run_id = %metrics.run_id,
            duration = ?metrics.duration,
            n_iterations = metrics.n_iterations,
            n_evaluations = metrics.n_evaluations,
            n_rejected = metrics.n_rejected,
            objective = %metrics.objective,
            termination = %metrics.termination,
            "run metrics",
        );
        Ok(())
    }
}
