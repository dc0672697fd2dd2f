use std::{
    cmp::Ordering,
    fmt::{Display, Formatter},
};

use bon::Builder;
use eos_quantities::{Euros, KilowattHourPrice, Ratio, Zero};
use serde::Serialize;

use crate::{
    device::{DeviceKind, DeviceState},
    fleet::Fleet,
    schedule::Schedule,
    trajectory::Trajectory,
};

/// Lexicographic `(loss, n_actions)` where **greater is better**.
///
/// Lower loss wins. On equal loss, fewer non-idle decisions win.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Score {
    pub loss: Euros,
    pub n_actions: usize,
}

impl Score {
    pub const ZERO: Self = Self { loss: Euros::ZERO, n_actions: 0 };
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        other.loss.cmp(&self.loss).then_with(|| other.n_actions.cmp(&self.n_actions))
    }
}

impl Display for Score {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} actions)", self.loss, self.n_actions)
    }
}

/// Penalty for cars left below the target state of charge.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ChargeGoal {
    pub target: Ratio,

    /// Shortfall quantum the price applies to.
    pub step: Ratio,

    /// Price per full step of shortfall.
    pub price: Euros,
}

impl ChargeGoal {
    /// Proportional penalty for ending at the state of charge.
    pub fn penalty(self, state_of_charge: Ratio) -> Euros {
        if state_of_charge >= self.target || self.step <= Ratio::ZERO {
            return Euros::ZERO;
        }
        self.price * ((self.target.0 - state_of_charge.0) / self.step.0)
    }
}

/// Terms of the loss, all in euros.
#[must_use]
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct Loss {
    pub grid: Euros,
    pub wear: Euros,

    /// Negative when the run ends with more stored energy than it started with.
    pub residual: Euros,

    pub car_charge: Euros,
}

impl Loss {
    pub fn total(self) -> Euros {
        self.grid + self.wear + self.residual + self.car_charge
    }
}

/// What the optimizer minimizes.
#[must_use]
#[derive(Copy, Clone, Debug, Default, Builder)]
pub struct Objective {
    car_charge: Option<ChargeGoal>,

    /// Value of the stored energy at the end of the horizon.
    ///
    /// Defaults to the cheapest import price of the horizon.
    residual_value: Option<KilowattHourPrice>,
}

impl Objective {
    pub fn score(&self, fleet: &Fleet, trajectory: &Trajectory, schedule: &Schedule) -> Score {
        Score { loss: self.loss(fleet, trajectory).total(), n_actions: schedule.n_actions() }
    }

    pub fn loss(&self, fleet: &Fleet, trajectory: &Trajectory) -> Loss {
        if trajectory.is_empty() {
            return Loss::default();
        }
        let final_states = trajectory.final_states();
        let residual_value = self.residual_value.unwrap_or_else(|| {
            trajectory
                .steps
                .iter()
                .map(|step| step.conditions.import_price)
                .min()
                .unwrap_or(KilowattHourPrice::ZERO)
        });
        let gained = Trajectory::stored_energy(&final_states)
            - Trajectory::stored_energy(&trajectory.initial);
        Loss {
            grid: trajectory.grid_cost(),
            wear: trajectory.wear_cost(),
            residual: -(gained * residual_value),
            car_charge: self.car_charge.map_or(Euros::ZERO, |goal| {
                Self::car_charge_penalty(goal, fleet, &final_states)
                    - Self::car_charge_penalty(goal, fleet, &trajectory.initial)
            }),
        }
    }

    fn car_charge_penalty(goal: ChargeGoal, fleet: &Fleet, states: &[DeviceState]) -> Euros {
        fleet
            .devices()
            .iter()
            .zip(states)
            .filter_map(|(spec, state)| match (&spec.kind, state.level) {
                (DeviceKind::ElectricCar(car), Some(level)) => {
                    Some(goal.penalty(car.battery.state_of_charge(level)))
                }
                _ => None,
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{DateTime, TimeDelta};
    use eos_quantities::{KilowattHours, Kilowatts};

    use super::*;
    use crate::{
        device::{Battery, Decision, DeviceSpec, ElectricCar},
        fleet::GridConnection,
        forecast::{Conditions, Forecast},
        horizon::Horizon,
        simulator::Simulator,
    };

    fn forecast(n_steps: usize) -> Forecast {
        let horizon = Horizon::builder()
            .start(DateTime::parse_from_rfc3339("2026-01-03T00:00:00+01:00").unwrap())
            .duration(TimeDelta::hours(i64::try_from(n_steps).unwrap()))
            .resolution(TimeDelta::hours(1))
            .build()
            .unwrap();
        let conditions = Conditions {
            demand: Kilowatts(1.0),
            import_price: KilowattHourPrice(0.25),
            export_price: KilowattHourPrice(0.05),
            ..Conditions::default()
        };
        Forecast::try_new(horizon, vec![conditions; n_steps]).unwrap()
    }

    fn car_fleet() -> Fleet {
        let car = ElectricCar {
            battery: Battery::builder()
                .max_level(KilowattHours(50.0))
                .initial_level(KilowattHours(30.0))
                .charging_rate(Kilowatts(10.0))
                .discharging_rate(Kilowatts::ZERO)
                .build(),
            usage: None,
        };
        Fleet::try_new(
            vec![DeviceSpec::new("car", DeviceKind::ElectricCar(car))],
            GridConnection::UNLIMITED,
        )
        .unwrap()
    }

    fn goal() -> ChargeGoal {
        ChargeGoal { target: Ratio(0.9), step: Ratio(0.1), price: Euros(5.0) }
    }

    #[test]
    fn ordering() {
        let cheap = Score { loss: Euros(1.0), n_actions: 10 };
        let expensive = Score { loss: Euros(2.0), n_actions: 0 };
        assert!(cheap > expensive);
    }

    /// Verify that fewer actions win on equal loss.
    #[test]
    fn tie_break() {
        let lazy = Score { loss: Euros(1.0), n_actions: 1 };
        let busy = Score { loss: Euros(1.0), n_actions: 3 };
        assert!(lazy > busy);
        assert_eq!([busy, lazy].into_iter().max(), Some(lazy));
    }

    #[test]
    fn car_charge_penalty() {
        assert_abs_diff_eq!(goal().penalty(Ratio(0.6)).0, 15.0, epsilon = 1e-9);
        assert_abs_diff_eq!(goal().penalty(Ratio(0.85)).0, 2.5, epsilon = 1e-9);
        assert_eq!(goal().penalty(Ratio(0.95)), Euros::ZERO);
    }

    /// Verify that the zero-decision schedule scores the baseline terms only.
    #[test]
    fn zero_decisions() {
        let fleet = car_fleet();
        let forecast = forecast(2);
        let schedule = Schedule::idle(2, 1);
        let trajectory = Simulator::builder()
            .fleet(&fleet)
            .forecast(&forecast)
            .build()
            .simulate(&schedule)
            .unwrap();
        let objective = Objective::builder().car_charge(goal()).build();
        let loss = objective.loss(&fleet, &trajectory);
        assert_eq!(loss.car_charge, Euros::ZERO);
        assert_eq!(loss.residual, Euros::ZERO);
        assert_abs_diff_eq!(loss.grid.0, 0.5);
        let score = objective.score(&fleet, &trajectory, &schedule);
        assert_eq!(score.n_actions, 0);
    }

    /// Verify that charging the car is rewarded by the goal and the residual value.
    #[test]
    fn charging_pays_off() {
        let fleet = car_fleet();
        let forecast = forecast(2);
        let charge = Decision::Charge(Kilowatts(10.0));
        let schedule = Schedule::from_steps(vec![vec![charge], vec![Decision::Idle]]).unwrap();
        let trajectory = Simulator::builder()
            .fleet(&fleet)
            .forecast(&forecast)
            .build()
            .simulate(&schedule)
            .unwrap();
        let objective = Objective::builder().car_charge(goal()).build();
        let loss = objective.loss(&fleet, &trajectory);

        // From 60% to 80%: 15 € penalty down to 5 €.
        assert_abs_diff_eq!(loss.car_charge.0, -10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(loss.residual.0, -2.5, epsilon = 1e-9);
        assert_abs_diff_eq!(loss.grid.0, 11.0 * 0.25 + 0.25, epsilon = 1e-9);
    }

    #[test]
    fn empty_horizon() {
        let fleet = car_fleet();
        let forecast = forecast(0);
        let schedule = Schedule::idle(0, 1);
        let trajectory = Simulator::builder()
            .fleet(&fleet)
            .forecast(&forecast)
            .build()
            .simulate(&schedule)
            .unwrap();
        let objective = Objective::builder().car_charge(goal()).build();
        assert_eq!(objective.score(&fleet, &trajectory, &schedule), Score::ZERO);
    }
}
