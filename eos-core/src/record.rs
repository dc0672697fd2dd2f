//! Packaging of an optimization run for persistence and reporting.

use std::{
    fmt::{Display, Formatter},
    time::Duration,
};

use eos_quantities::{Euros, Hours, KilowattHourPrice, KilowattHours, Kilowatts};
use serde::{Deserialize, Serialize};
use serde_with::{DurationSecondsWithFrac, serde_as};

use crate::{
    device::{Decision, DeviceId},
    fleet::Fleet,
    flow::Flow,
    interval::Timestamp,
    optimizer::{BestResult, Termination},
    trajectory::EnergySystem,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RunId {
    fn from(run_id: &str) -> Self {
        Self(run_id.to_string())
    }
}

impl From<String> for RunId {
    fn from(run_id: String) -> Self {
        Self(run_id)
    }
}

/// Identity of a run.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunInfo {
    pub run_id: RunId,
    pub fleet_id: String,
    pub started_at: Timestamp,
}

/// Stable key of a stored point: the same run and step always map onto the same key.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecordKey {
    pub run_id: RunId,
    pub step: usize,

    /// [`None`] for the fleet-level points.
    pub device: Option<DeviceId>,
}

#[serde_as]
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub fleet_id: String,
    pub started_at: Timestamp,

    /// Total loss of the best schedule.
    pub loss: Euros,

    pub n_actions: usize,
    pub termination: Termination,
    pub n_iterations: usize,
    pub n_iterations_unused: usize,
    pub n_evaluations: usize,
    pub n_rejected: usize,

    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub elapsed: Duration,

    pub horizon_start: Timestamp,
    pub horizon_end: Timestamp,
    pub step_hours: Hours,
    pub n_steps: usize,
    pub energy: EnergySystem,
}

#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DevicePoint {
    pub key: RecordKey,
    pub timestamp: Timestamp,
    pub device: DeviceId,
    pub decision: Decision,

    /// Level at the end of the step, storage only.
    pub level: Option<KilowattHours>,

    pub flow: Flow<KilowattHours>,
    pub wear_cost: Euros,
}

#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GridPoint {
    pub key: RecordKey,
    pub timestamp: Timestamp,
    pub demand: Kilowatts,
    pub import: KilowattHours,
    pub export: KilowattHours,
    pub import_price: KilowattHourPrice,
    pub export_price: KilowattHourPrice,
    pub grid_cost: Euros,
}

/// Everything a sink needs to store about a run.
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunRecord {
    pub summary: RunSummary,
    pub devices: Vec<DevicePoint>,
    pub grid: Vec<GridPoint>,
}

impl RunRecord {
    #[must_use]
    pub const fn run_id(&self) -> &RunId {
        &self.summary.run_id
    }

    #[must_use]
    pub fn n_points(&self) -> usize {
        self.devices.len() + self.grid.len()
    }
}

/// Build the record of the run.
pub fn assemble(run: &RunInfo, fleet: &Fleet, result: &BestResult) -> RunRecord {
    let trajectory = &result.trajectory;
    let mut devices = Vec::with_capacity(trajectory.len() * fleet.len());
    let mut grid = Vec::with_capacity(trajectory.len());

    for step in &trajectory.steps {
        let timestamp = step.interval.start;
        for (spec, device) in fleet.devices().iter().zip(&step.devices) {
            devices.push(DevicePoint {
                key: RecordKey {
                    run_id: run.run_id.clone(),
                    step: step.index,
                    device: Some(spec.id.clone()),
                },
                timestamp,
                device: spec.id.clone(),
                decision: device.state.decision,
                level: device.state.level,
                flow: device.flow,
                wear_cost: device.cost,
            });
        }
        grid.push(GridPoint {
            key: RecordKey { run_id: run.run_id.clone(), step: step.index, device: None },
            timestamp,
            demand: step.conditions.demand,
            import: step.grid.import,
            export: step.grid.export,
            import_price: step.conditions.import_price,
            export_price: step.conditions.export_price,
            grid_cost: step.grid_cost,
        });
    }

    let horizon_start =
        trajectory.steps.first().map_or(run.started_at, |step| step.interval.start);
    let horizon_end = trajectory.steps.last().map_or(horizon_start, |step| step.interval.end);
    let summary = RunSummary {
        run_id: run.run_id.clone(),
        fleet_id: run.fleet_id.clone(),
        started_at: run.started_at,
        loss: result.score.loss,
        n_actions: result.score.n_actions,
        termination: result.termination,
        n_iterations: result.n_iterations,
        n_iterations_unused: result.budget.n_unused(result.n_iterations),
        n_evaluations: result.n_evaluations,
        n_rejected: result.n_rejected,
        elapsed: result.elapsed,
        horizon_start,
        horizon_end,
        step_hours: trajectory.steps.first().map_or(Hours(0.0), |step| step.interval.hours()),
        n_steps: trajectory.len(),
        energy: trajectory.total_energy_system(fleet),
    };
    RunRecord { summary, devices, grid }
}
