use bon::Builder;
use eos_quantities::{Euros, KilowattHours};

use crate::{
    device::DeviceSpec,
    error::{Culprit, InfeasibleSchedule, Violation},
    fleet::Fleet,
    flow::Flow,
    forecast::Forecast,
    schedule::Schedule,
    trajectory::{DeviceStep, StepRecord, Trajectory},
};

/// Deterministic discrete-time fleet simulation.
///
/// Reads the fleet and the forecast, never mutates them.
#[must_use]
#[derive(Copy, Clone, Builder)]
pub struct Simulator<'a> {
    fleet: &'a Fleet,
    forecast: &'a Forecast,
}

impl Simulator<'_> {
    /// Run the schedule step by step, aborting on the first violation.
    pub fn simulate(&self, schedule: &Schedule) -> Result<Trajectory, InfeasibleSchedule> {
        let horizon = self.forecast.horizon();
        if schedule.n_steps() != horizon.n_steps() || schedule.n_devices() != self.fleet.len() {
            return Err(InfeasibleSchedule {
                step: 0,
                culprit: Culprit::Schedule,
                violation: Violation::Shape {
                    expected_steps: horizon.n_steps(),
                    expected_devices: self.fleet.len(),
                    actual_steps: schedule.n_steps(),
                    actual_devices: schedule.n_devices(),
                },
            });
        }

        let initial: Vec<_> =
            self.fleet.devices().iter().map(DeviceSpec::initial_state).collect();
        let mut states = initial.clone();
        let mut steps = Vec::with_capacity(horizon.n_steps());

        for ((index, interval), conditions) in
            horizon.intervals().enumerate().zip(self.forecast.samples())
        {
            let hours = interval.hours();
            let mut devices = Vec::with_capacity(self.fleet.len());
            for ((spec, state), decision) in
                self.fleet.devices().iter().zip(&mut states).zip(schedule.step(index))
            {
                let transition = spec
                    .transition(state, *decision, conditions, interval)
                    .map_err(|violation| InfeasibleSchedule {
                        step: index,
                        culprit: Culprit::Device(spec.id.clone()),
                        violation,
                    })?;
                *state = transition.state;
                devices.push(DeviceStep {
                    state: transition.state,
                    flow: transition.flow,
                    cost: transition.cost,
                });
            }

            let bus: Flow<KilowattHours> = devices.iter().map(|device| device.flow).sum();
            let grid = Flow::from_net(conditions.demand * hours + bus.net());
            self.fleet.grid().check(grid, hours).map_err(|violation| InfeasibleSchedule {
                step: index,
                culprit: Culprit::Grid,
                violation,
            })?;

            steps.push(StepRecord {
                index,
                interval,
                conditions: *conditions,
                grid_cost: grid.import * conditions.import_price
                    - grid.export * conditions.export_price,
                wear_cost: devices.iter().map(|device| device.cost).sum::<Euros>(),
                devices,
                grid,
            });
        }

        Ok(Trajectory { initial, steps })
    }
}
