use bon::Builder;
use eos_quantities::{Euros, Hours, KilowattHourPrice, KilowattHours, Kilowatts, Ratio, Zero};

use crate::{device::Decision, error::Violation, flow::Flow};

#[must_use]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Efficiency {
    /// Fraction of the drawn energy that ends up stored.
    pub charging: Ratio,

    /// Fraction of the requested discharge that is delivered, a derating of the power.
    pub discharging: Ratio,
}

impl Efficiency {
    pub const IDEAL: Self = Self { charging: Ratio::ONE, discharging: Ratio::ONE };

    #[must_use]
    pub const fn round_trip(self) -> f64 {
        self.charging.0 * self.discharging.0
    }
}

impl Default for Efficiency {
    fn default() -> Self {
        Self::IDEAL
    }
}

/// Stationary storage.
#[must_use]
#[derive(Clone, Debug, PartialEq, Builder)]
pub struct Battery {
    /// Minimally allowed level.
    #[builder(default)]
    pub min_level: KilowattHours,

    /// Maximally allowed level, normally the usable capacity.
    pub max_level: KilowattHours,

    pub initial_level: KilowattHours,
    pub charging_rate: Kilowatts,
    pub discharging_rate: Kilowatts,

    #[builder(default)]
    pub efficiency: Efficiency,

    /// Degradation cost per kilowatt-hour of throughput.
    #[builder(default)]
    pub wear_cost: KilowattHourPrice,
}

/// Outcome of applying a decision to a storage.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Applied {
    pub level: KilowattHours,
    pub flow: Flow<KilowattHours>,
    pub cost: Euros,
}

impl Battery {
    pub fn validate(&self) -> Result<(), String> {
        let levels = [self.min_level, self.max_level, self.initial_level];
        if levels.iter().any(|level| !level.is_finite()) {
            return Err("levels must be finite".to_string());
        }
        if self.min_level < KilowattHours::ZERO || self.min_level > self.max_level {
            return Err(format!("invalid capacity {}..={}", self.min_level, self.max_level));
        }
        if !(self.min_level..=self.max_level).contains(&self.initial_level) {
            return Err(format!(
                "initial level {} is outside of {}..={}",
                self.initial_level, self.min_level, self.max_level,
            ));
        }
        if self.charging_rate < Kilowatts::ZERO || self.discharging_rate < Kilowatts::ZERO {
            return Err("rate limits must not be negative".to_string());
        }
        for efficiency in [self.efficiency.charging, self.efficiency.discharging] {
            if efficiency <= Ratio::ZERO || efficiency > Ratio::ONE {
                return Err(format!("efficiency {efficiency} is outside of (0, 1]"));
            }
        }
        if self.wear_cost < KilowattHourPrice::ZERO {
            return Err("wear cost must not be negative".to_string());
        }
        Ok(())
    }

    /// Apply the decision for the duration, starting from `level`.
    ///
    /// Charging stores `η_charging` of the drawn energy. Discharging delivers `η_discharging` of
    /// the requested energy and the level drops by the delivered amount: the discharging
    /// efficiency derates the power, no stored energy is lost to it. Rates above the limits and
    /// levels outside of the capacity are rejected, never clamped.
    pub fn apply(
        &self,
        level: KilowattHours,
        decision: Decision,
        for_: Hours,
    ) -> Result<Applied, Violation> {
        if decision.is_idle() {
            return Ok(Applied { level, flow: Flow::ZERO, cost: Euros::ZERO });
        }
        let (delta, flow) = match decision {
            Decision::Charge(power) => {
                Self::check_rate(power, self.charging_rate)?;
                let drawn = power * for_;
                let flow = Flow { import: drawn, export: KilowattHours::ZERO };
                (drawn * self.efficiency.charging, flow)
            }
            Decision::Discharge(power) => {
                Self::check_rate(power, self.discharging_rate)?;
                let delivered = power * for_ * self.efficiency.discharging;
                (-delivered, Flow { import: KilowattHours::ZERO, export: delivered })
            }
            Decision::Idle | Decision::Curtail(_) => return Err(Violation::Unsupported(decision)),
        };
        let level = level + delta;
        if level < self.min_level - KilowattHours::EPSILON
            || level > self.max_level + KilowattHours::EPSILON
        {
            return Err(Violation::Capacity { level, min: self.min_level, max: self.max_level });
        }
        Ok(Applied { level, flow, cost: (flow.import + flow.export) * self.wear_cost })
    }

    /// Level as a fraction of the maximum.
    pub fn state_of_charge(&self, level: KilowattHours) -> Ratio {
        if self.max_level > KilowattHours::ZERO {
            Ratio(level / self.max_level)
        } else {
            Ratio::ZERO
        }
    }

    fn check_rate(power: Kilowatts, limit: Kilowatts) -> Result<(), Violation> {
        if (Kilowatts::ZERO..=limit).contains(&power) {
            Ok(())
        } else {
            Err(Violation::RateLimit { requested: power, limit })
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn battery(efficiency: Efficiency) -> Battery {
        Battery::builder()
            .max_level(KilowattHours(10.0))
            .initial_level(KilowattHours(5.0))
            .charging_rate(Kilowatts(2.0))
            .discharging_rate(Kilowatts(2.0))
            .efficiency(efficiency)
            .build()
    }

    /// Verify normal charging without overflowing.
    #[test]
    fn normal_operation() {
        let applied = battery(Efficiency::IDEAL)
            .apply(KilowattHours(5.0), Decision::Charge(Kilowatts(1.0)), Hours(1.0))
            .unwrap();
        assert_abs_diff_eq!(applied.level.0, 6.0);
        assert_abs_diff_eq!(applied.flow.import.0, 1.0);
        assert_abs_diff_eq!(applied.flow.export.0, 0.0);
    }

    /// Verify that the discharging efficiency reduces both the delivered energy and the level drop.
    #[test]
    fn discharging_efficiency() {
        let efficiency = Efficiency { charging: Ratio::ONE, discharging: Ratio(0.9) };
        let applied = battery(efficiency)
            .apply(KilowattHours(9.0), Decision::Discharge(Kilowatts(2.0)), Hours(1.0))
            .unwrap();
        assert_abs_diff_eq!(applied.level.0, 7.2, epsilon = 1e-9);
        assert_abs_diff_eq!(applied.flow.export.0, 1.8, epsilon = 1e-9);
    }

    #[test]
    fn charging_efficiency() {
        let efficiency = Efficiency { charging: Ratio(0.5), discharging: Ratio::ONE };
        let applied = battery(efficiency)
            .apply(KilowattHours(5.0), Decision::Charge(Kilowatts(2.0)), Hours(0.5))
            .unwrap();
        assert_abs_diff_eq!(applied.level.0, 5.5);
        assert_abs_diff_eq!(applied.flow.import.0, 1.0);
    }

    /// Verify that zero decisions pass through without losses.
    #[test]
    fn zero_decision() {
        let efficiency = Efficiency { charging: Ratio(0.8), discharging: Ratio(0.8) };
        let decisions = [
            Decision::Idle,
            Decision::Charge(Kilowatts::ZERO),
            Decision::Discharge(Kilowatts::ZERO),
            Decision::Curtail(Kilowatts::ZERO),
        ];
        for decision in decisions {
            let applied =
                battery(efficiency).apply(KilowattHours(5.0), decision, Hours(1.0)).unwrap();
            assert_eq!(applied.level, KilowattHours(5.0));
            assert_eq!(applied.flow, Flow::ZERO);
            assert_eq!(applied.cost, Euros::ZERO);
        }
    }

    #[test]
    fn curtail_is_unsupported() {
        let result = battery(Efficiency::IDEAL).apply(
            KilowattHours(5.0),
            Decision::Curtail(Kilowatts(1.0)),
            Hours(1.0),
        );
        assert_eq!(result, Err(Violation::Unsupported(Decision::Curtail(Kilowatts(1.0)))));
    }

    /// Verify rejecting the overflow rather than capping it.
    #[test]
    fn overflow() {
        let result = battery(Efficiency::IDEAL).apply(
            KilowattHours(9.0),
            Decision::Charge(Kilowatts(2.0)),
            Hours(1.0),
        );
        assert!(matches!(result, Err(Violation::Capacity { .. })));
    }

    /// Verify rejecting the underflow.
    #[test]
    fn underflow() {
        let result = battery(Efficiency::IDEAL).apply(
            KilowattHours(1.0),
            Decision::Discharge(Kilowatts(2.0)),
            Hours(1.0),
        );
        assert!(matches!(result, Err(Violation::Capacity { .. })));
    }

    #[test]
    fn rate_limit() {
        let battery = battery(Efficiency::IDEAL);
        let result =
            battery.apply(KilowattHours(5.0), Decision::Charge(Kilowatts(2.5)), Hours(0.25));
        assert_eq!(
            result,
            Err(Violation::RateLimit { requested: Kilowatts(2.5), limit: Kilowatts(2.0) }),
        );
        let result =
            battery.apply(KilowattHours(5.0), Decision::Discharge(Kilowatts(-1.0)), Hours(1.0));
        assert!(matches!(result, Err(Violation::RateLimit { .. })));
    }

    #[test]
    fn wear_cost() {
        let battery = Battery { wear_cost: KilowattHourPrice(0.05), ..battery(Efficiency::IDEAL) };
        let decision = Decision::Discharge(Kilowatts(2.0));
        let applied = battery.apply(KilowattHours(5.0), decision, Hours(1.0)).unwrap();
        assert_abs_diff_eq!(applied.cost.0, 0.1);
    }

    #[test]
    fn invalid_initial_level() {
        let battery = Battery { initial_level: KilowattHours(11.0), ..battery(Efficiency::IDEAL) };
        assert!(battery.validate().is_err());
    }
}
