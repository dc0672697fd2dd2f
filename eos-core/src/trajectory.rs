use derive_more::{Add, AddAssign, Sum};
use eos_quantities::{Euros, KilowattHours};
use serde::Serialize;

use crate::{
    device::{DeviceKind, DeviceState},
    fleet::Fleet,
    flow::Flow,
    forecast::Conditions,
    interval::Interval,
};

/// Outcome of one device during one step.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct DeviceStep {
    /// State at the end of the step.
    pub state: DeviceState,

    pub flow: Flow<KilowattHours>,
    pub cost: Euros,
}

#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StepRecord {
    pub index: usize,
    pub interval: Interval,
    pub conditions: Conditions,

    /// In the fleet order.
    pub devices: Vec<DeviceStep>,

    /// Exchange with the grid: import is bought, export is sold.
    pub grid: Flow<KilowattHours>,

    pub grid_cost: Euros,
    pub wear_cost: Euros,
}

/// Simulated run of a schedule.
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Trajectory {
    /// Device states before the first step.
    pub initial: Vec<DeviceState>,

    pub steps: Vec<StepRecord>,
}

impl Trajectory {
    #[must_use]
    pub const fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Device states after the last step, or the initial ones for an empty run.
    #[must_use]
    pub fn final_states(&self) -> Vec<DeviceState> {
        self.steps.last().map_or_else(
            || self.initial.clone(),
            |step| step.devices.iter().map(|device| device.state).collect(),
        )
    }

    /// Levels of the storage device including the initial one, one more than the steps.
    #[must_use]
    pub fn levels(&self, device: usize) -> Vec<Option<KilowattHours>> {
        self.initial
            .get(device)
            .map(|state| state.level)
            .into_iter()
            .chain(
                self.steps
                    .iter()
                    .map(|step| step.devices.get(device).and_then(|device| device.state.level)),
            )
            .collect()
    }

    pub fn grid_cost(&self) -> Euros {
        self.steps.iter().map(|step| step.grid_cost).sum()
    }

    pub fn wear_cost(&self) -> Euros {
        self.steps.iter().map(|step| step.wear_cost).sum()
    }

    /// Total energy stored over all storage devices.
    pub fn stored_energy(states: &[DeviceState]) -> KilowattHours {
        states.iter().filter_map(|state| state.level).sum()
    }

    /// Energy accounting per step.
    pub fn energy_system(&self, fleet: &Fleet) -> Vec<EnergySystem> {
        self.steps.iter().map(|step| EnergySystem::from_step(fleet, step)).collect()
    }

    /// Energy accounting over the whole run.
    pub fn total_energy_system(&self, fleet: &Fleet) -> EnergySystem {
        self.steps.iter().map(|step| EnergySystem::from_step(fleet, step)).sum()
    }
}

/// Where the energy came from and where it went.
#[must_use]
#[derive(Copy, Clone, Debug, Default, PartialEq, Add, AddAssign, Sum, Serialize)]
pub struct EnergySystem {
    /// Generation delivered to the bus.
    pub produced: KilowattHours,

    /// Base demand and loads.
    pub consumed: KilowattHours,

    /// Drawn by storage devices.
    pub charged: KilowattHours,

    /// Delivered by storage devices.
    pub discharged: KilowattHours,

    pub imported: KilowattHours,
    pub exported: KilowattHours,
    pub import_cost: Euros,
    pub export_revenue: Euros,
}

impl EnergySystem {
    pub fn from_step(fleet: &Fleet, step: &StepRecord) -> Self {
        let mut system = Self {
            consumed: step.conditions.demand * step.interval.hours(),
            imported: step.grid.import,
            exported: step.grid.export,
            import_cost: step.grid.import * step.conditions.import_price,
            export_revenue: step.grid.export * step.conditions.export_price,
            ..Self::default()
        };
        for (spec, device) in fleet.devices().iter().zip(&step.devices) {
            match spec.kind {
                DeviceKind::Solar(_) => system.produced += device.flow.export,
                DeviceKind::Load(_) => system.consumed += device.flow.import,
                DeviceKind::Battery(_) | DeviceKind::ElectricCar(_) => {
                    system.charged += device.flow.import;
                    system.discharged += device.flow.export;
                }
            }
        }
        system
    }

    /// Should stay around zero.
    pub fn balance(&self) -> KilowattHours {
        self.produced + self.discharged + self.imported
            - self.consumed
            - self.charged
            - self.exported
    }
}
