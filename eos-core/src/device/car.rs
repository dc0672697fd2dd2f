use chrono::{Datelike, NaiveTime, Weekday};
use eos_quantities::{Hours, KilowattHours};

use crate::{
    device::{
        Decision,
        battery::{Applied, Battery},
    },
    error::Violation,
    interval::Timestamp,
};

/// When the car is away from its charger.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UsageProfile {
    pub days: Vec<Weekday>,

    /// Inclusive.
    pub leaves: NaiveTime,

    /// Exclusive.
    pub returns: NaiveTime,
}

impl UsageProfile {
    #[must_use]
    pub fn is_away(&self, at: Timestamp) -> bool {
        self.days.contains(&at.weekday()) && (self.leaves..self.returns).contains(&at.time())
    }
}

/// Electric vehicle: a storage which is only charged, and only while plugged in.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct ElectricCar {
    pub battery: Battery,
    pub usage: Option<UsageProfile>,
}

impl ElectricCar {
    #[must_use]
    pub fn is_available(&self, at: Timestamp) -> bool {
        !self.usage.as_ref().is_some_and(|usage| usage.is_away(at))
    }

    /// Discharging is never accepted, charging is rejected while the car is away.
    pub fn apply(
        &self,
        level: KilowattHours,
        decision: Decision,
        at: Timestamp,
        for_: Hours,
    ) -> Result<Applied, Violation> {
        match decision {
            _ if decision.is_idle() => self.battery.apply(level, decision, for_),
            Decision::Discharge(_) | Decision::Curtail(_) => Err(Violation::Unsupported(decision)),
            Decision::Charge(_) if !self.is_available(at) => Err(Violation::Unavailable),
            _ => self.battery.apply(level, decision, for_),
        }
    }
}
