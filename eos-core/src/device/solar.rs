use std::f64::consts::PI;

use chrono::{NaiveTime, Timelike};
use eos_quantities::{Hours, KilowattHours, Kilowatts, Ratio, Zero};

use crate::{
    device::Decision,
    error::Violation,
    flow::Flow,
    forecast::Conditions,
    interval::Timestamp,
};

/// Share of the peak power a panel yields over the day, independent of the weather.
#[derive(Clone, Debug, PartialEq)]
pub enum SolarProfile {
    /// The weather alone decides.
    Full,

    /// Sine-shaped day between `from` and `to` peaking at `max`.
    Curved { from: NaiveTime, to: NaiveTime, max: Ratio },

    /// Measured statistics, one value per hour of the day.
    Hourly(Box<[Ratio; 24]>),
}

impl SolarProfile {
    /// Day from 8:00 to 17:00 peaking at 85% around noon.
    #[must_use]
    pub fn curved() -> Self {
        Self::Curved {
            from: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            to: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
            max: Ratio(0.85),
        }
    }

    pub fn factor(&self, at: NaiveTime) -> Ratio {
        match self {
            Self::Full => Ratio::ONE,
            Self::Curved { from, to, max } => {
                if at < *from || at >= *to {
                    return Ratio::ZERO;
                }
                let total = (*to - *from).as_seconds_f64();
                let elapsed = (at - *from).as_seconds_f64();
                Ratio(((elapsed / total * PI).sin() * max.0).clamp(0.0, 1.0))
            }
            Self::Hourly(hourly) => hourly[at.hour() as usize],
        }
    }
}

#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct SolarPanel {
    pub peak: Kilowatts,

    /// Panel and inverter efficiency.
    pub efficiency: Ratio,

    pub profile: SolarProfile,
}

impl SolarPanel {
    pub fn validate(&self) -> Result<(), String> {
        if !self.peak.is_finite() || self.peak < Kilowatts::ZERO {
            return Err(format!("invalid peak power {}", self.peak));
        }
        if self.efficiency <= Ratio::ZERO || self.efficiency > Ratio::ONE {
            return Err(format!("efficiency {} is outside of (0, 1]", self.efficiency));
        }
        if let SolarProfile::Curved { from, to, max } = &self.profile
            && (from >= to || !(Ratio::ZERO..=Ratio::ONE).contains(max))
        {
            return Err(format!("invalid curve {from}..{to} at {max}"));
        }
        Ok(())
    }

    pub fn available_power(&self, conditions: &Conditions, at: Timestamp) -> Kilowatts {
        self.peak * conditions.sun * self.profile.factor(at.time()) * self.efficiency
    }

    /// Produce the available energy, curtailed by the decision.
    ///
    /// Curtailment is clamped to the available power.
    pub fn apply(
        &self,
        decision: Decision,
        conditions: &Conditions,
        at: Timestamp,
        for_: Hours,
    ) -> Result<Flow<KilowattHours>, Violation> {
        let available = self.available_power(conditions, at);
        let curtailed = match decision {
            _ if decision.is_idle() => Kilowatts::ZERO,
            Decision::Curtail(power) if power >= Kilowatts::ZERO => power.min(available),
            Decision::Curtail(power) => {
                return Err(Violation::RateLimit { requested: power, limit: self.peak });
            }
            Decision::Idle | Decision::Charge(_) | Decision::Discharge(_) => {
                return Err(Violation::Unsupported(decision));
            }
        };
        Ok(Flow { import: KilowattHours::ZERO, export: (available - curtailed) * for_ })
    }
}
