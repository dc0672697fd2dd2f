//! Device specifications and their state transitions.
//!
//! Devices form a closed set of variants. Each variant states its policy for out-of-range
//! decisions explicitly:
//!
//! - [`Battery`]: rates above the limits and levels outside of the capacity are rejected
//! - [`ElectricCar`]: as the battery, plus no discharging and no charging while away
//! - [`SolarPanel`]: curtailment is clamped to the available generation
//! - [`Load`]: uncontrollable, only idle decisions are accepted

mod battery;
mod car;
mod decision;
mod load;
mod solar;

use std::{
    fmt::{Display, Formatter},
    ops::RangeInclusive,
};

use eos_quantities::{Euros, KilowattHours, Kilowatts, Zero};
use serde::{Deserialize, Serialize};

pub use self::{
    battery::{Applied, Battery, Efficiency},
    car::{ElectricCar, UsageProfile},
    decision::Decision,
    load::Load,
    solar::{SolarPanel, SolarProfile},
};
use crate::{
    error::{FleetError, Violation},
    flow::Flow,
    forecast::Conditions,
    interval::Interval,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DeviceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DeviceKind {
    Solar(SolarPanel),
    Load(Load),
    Battery(Battery),
    ElectricCar(ElectricCar),
}

impl DeviceKind {
    /// Order of the devices within a fleet.
    #[must_use]
    pub const fn priority(&self) -> u8 {
        match self {
            Self::Solar(_) => 0,
            Self::Load(_) => 1,
            Self::Battery(_) => 2,
            Self::ElectricCar(_) => 3,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Solar(_) => "solar",
            Self::Load(_) => "load",
            Self::Battery(_) => "battery",
            Self::ElectricCar(_) => "car",
        }
    }
}

/// Static description of one device.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceSpec {
    pub id: DeviceId,
    pub kind: DeviceKind,
}

/// Mutable per-step state of one device.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct DeviceState {
    /// Stored energy, only for storage devices.
    pub level: Option<KilowattHours>,

    /// Last applied decision.
    pub decision: Decision,
}

#[must_use]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Transition {
    pub state: DeviceState,

    /// Exchange with the fleet bus.
    pub flow: Flow<KilowattHours>,

    /// Device-level cost, for example battery wear.
    pub cost: Euros,
}

impl DeviceSpec {
    pub fn new(id: impl Into<DeviceId>, kind: DeviceKind) -> Self {
        Self { id: id.into(), kind }
    }

    pub fn validate(&self) -> Result<(), FleetError> {
        let result = match &self.kind {
            DeviceKind::Solar(panel) => panel.validate(),
            DeviceKind::Load(load) if !load.power.is_finite() || load.power < Kilowatts::ZERO => {
                Err(format!("invalid power {}", load.power))
            }
            DeviceKind::Load(_) => Ok(()),
            DeviceKind::Battery(battery) => battery.validate(),
            DeviceKind::ElectricCar(car) => car.battery.validate(),
        };
        result.map_err(|reason| FleetError::InvalidDevice { id: self.id.clone(), reason })
    }

    pub const fn storage(&self) -> Option<&Battery> {
        match &self.kind {
            DeviceKind::Battery(battery) => Some(battery),
            DeviceKind::ElectricCar(car) => Some(&car.battery),
            DeviceKind::Solar(_) | DeviceKind::Load(_) => None,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> Option<RangeInclusive<KilowattHours>> {
        self.storage().map(|battery| battery.min_level..=battery.max_level)
    }

    pub fn initial_state(&self) -> DeviceState {
        DeviceState {
            level: self.storage().map(|battery| battery.initial_level),
            decision: Decision::Idle,
        }
    }

    /// Whether the device can act during the interval.
    #[must_use]
    pub fn is_available(&self, interval: Interval) -> bool {
        match &self.kind {
            DeviceKind::ElectricCar(car) => car.is_available(interval.start),
            _ => true,
        }
    }

    /// Apply the decision during the interval.
    ///
    /// Does not mutate anything: the new state is returned. An infeasible transition is reported
    /// as [`Violation`].
    pub fn transition(
        &self,
        state: &DeviceState,
        decision: Decision,
        conditions: &Conditions,
        interval: Interval,
    ) -> Result<Transition, Violation> {
        let hours = interval.hours();
        let applied = match &self.kind {
            DeviceKind::Solar(panel) => Applied {
                level: KilowattHours::ZERO,
                flow: panel.apply(decision, conditions, interval.start, hours)?,
                cost: Euros::ZERO,
            },
            DeviceKind::Load(load) => Applied {
                level: KilowattHours::ZERO,
                flow: load.apply(decision, hours)?,
                cost: Euros::ZERO,
            },
            DeviceKind::Battery(battery) => {
                battery.apply(state.level.unwrap_or(battery.initial_level), decision, hours)?
            }
            DeviceKind::ElectricCar(car) => car.apply(
                state.level.unwrap_or(car.battery.initial_level),
                decision,
                interval.start,
                hours,
            )?,
        };
        Ok(Transition {
            state: DeviceState {
                level: state.level.map(|_| applied.level),
                decision,
            },
            flow: applied.flow,
            cost: applied.cost,
        })
    }

    /// Discrete decisions the search may choose from, with `granularity` levels per direction.
    ///
    /// The first element is always [`Decision::Idle`].
    #[must_use]
    pub fn palette(&self, granularity: usize) -> Vec<Decision> {
        let granularity = granularity.max(1);
        #[expect(clippy::cast_precision_loss)]
        let levels = |limit: Kilowatts| {
            (1..=granularity).map(move |level| limit * (level as f64 / granularity as f64))
        };
        let mut palette = vec![Decision::Idle];
        match &self.kind {
            DeviceKind::Load(_) => {}
            DeviceKind::Solar(panel) => {
                palette.extend(levels(panel.peak).map(Decision::Curtail));
            }
            DeviceKind::Battery(battery) => {
                palette.extend(levels(battery.charging_rate).map(Decision::Charge));
                palette.extend(levels(battery.discharging_rate).map(Decision::Discharge));
            }
            DeviceKind::ElectricCar(car) => {
                palette.extend(levels(car.battery.charging_rate).map(Decision::Charge));
            }
        }
        palette.retain(|decision| *decision == Decision::Idle || !decision.is_idle());
        palette
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use eos_quantities::{Hours, Ratio};

    use super::*;

    fn battery() -> DeviceSpec {
        DeviceSpec::new(
            "battery",
            DeviceKind::Battery(
                Battery::builder()
                    .max_level(KilowattHours(10.0))
                    .initial_level(KilowattHours(5.0))
                    .charging_rate(Kilowatts(2.0))
                    .discharging_rate(Kilowatts(1.0))
                    .build(),
            ),
        )
    }

    fn interval() -> Interval {
        let start = DateTime::parse_from_rfc3339("2026-01-02T00:00:00+01:00").unwrap();
        Interval::new(start, start + chrono::TimeDelta::hours(1))
    }

    #[test]
    fn transition_keeps_the_input_state() {
        let device = battery();
        let state = device.initial_state();
        let decision = Decision::Charge(Kilowatts(2.0));
        let transition =
            device.transition(&state, decision, &Conditions::default(), interval()).unwrap();
        assert_eq!(state.level, Some(KilowattHours(5.0)));
        assert_eq!(transition.state.level, Some(KilowattHours(7.0)));
        assert_eq!(transition.state.decision, Decision::Charge(Kilowatts(2.0)));
        assert_eq!(interval().hours(), Hours(1.0));
    }

    #[test]
    fn palette() {
        let palette = battery().palette(2);
        assert_eq!(
            palette,
            [
                Decision::Idle,
                Decision::Charge(Kilowatts(1.0)),
                Decision::Charge(Kilowatts(2.0)),
                Decision::Discharge(Kilowatts(0.5)),
                Decision::Discharge(Kilowatts(1.0)),
            ],
        );
        let load = DeviceSpec::new("load", DeviceKind::Load(Load { power: Kilowatts(0.1) }));
        assert_eq!(load.palette(4), [Decision::Idle]);
    }

    #[test]
    fn palette_skips_zero_rates() {
        let car = DeviceSpec::new(
            "car",
            DeviceKind::ElectricCar(ElectricCar {
                battery: Battery::builder()
                    .max_level(KilowattHours(40.0))
                    .initial_level(KilowattHours(20.0))
                    .charging_rate(Kilowatts::ZERO)
                    .discharging_rate(Kilowatts::ZERO)
                    .build(),
                usage: None,
            }),
        );
        assert_eq!(car.palette(3), [Decision::Idle]);
    }

    #[test]
    fn invalid_efficiency() {
        let device = DeviceSpec::new(
            "panel",
            DeviceKind::Solar(SolarPanel {
                peak: Kilowatts(4.0),
                efficiency: Ratio(1.5),
                profile: SolarProfile::Full,
            }),
        );
        assert!(matches!(device.validate(), Err(FleetError::InvalidDevice { .. })));
    }
}
