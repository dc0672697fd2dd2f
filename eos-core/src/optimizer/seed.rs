//! Initial candidates of the search.

use eos_quantities::{Hours, KilowattHourPrice, Kilowatts, Zero};
use itertools::Itertools;

use crate::{
    device::{Battery, Decision, DeviceKind},
    fleet::Fleet,
    forecast::Forecast,
    schedule::Schedule,
};

/// Zero-decision schedule.
pub fn idle(fleet: &Fleet, forecast: &Forecast) -> Schedule {
    Schedule::idle(forecast.horizon().n_steps(), fleet.len())
}

/// Price-threshold heuristic.
///
/// Storage charges below the median import price and discharges above it, as long as the level
/// permits. Cars charge in the cheapest steps while they are plugged in. Generation is curtailed
/// when exporting would cost money.
pub fn greedy(fleet: &Fleet, forecast: &Forecast) -> Schedule {
    let horizon = forecast.horizon();
    let mut schedule = idle(fleet, forecast);
    let Some(median) = median_import_price(forecast) else {
        return schedule;
    };

    for (device_index, spec) in fleet.devices().iter().enumerate() {
        match &spec.kind {
            DeviceKind::Load(_) => {}
            DeviceKind::Solar(panel) => {
                for (step, conditions) in forecast.iter().enumerate() {
                    if conditions.export_price < KilowattHourPrice::ZERO {
                        schedule.set(step, device_index, Decision::Curtail(panel.peak));
                    }
                }
            }
            DeviceKind::Battery(battery) => {
                let mut level = battery.initial_level;
                for (step, conditions) in forecast.iter().enumerate() {
                    let decision = if conditions.import_price < median {
                        Decision::Charge(battery.charging_rate)
                    } else if conditions.import_price > median {
                        Decision::Discharge(battery.discharging_rate)
                    } else {
                        continue;
                    };
                    if let Ok(applied) = battery.apply(level, decision, horizon.step_hours()) {
                        level = applied.level;
                        schedule.set(step, device_index, decision);
                    }
                }
            }
            DeviceKind::ElectricCar(car) => {
                let cheapest = forecast
                    .iter()
                    .enumerate()
                    .filter(|(step, _)| spec.is_available(horizon.interval(*step)))
                    .sorted_by_key(|(step, conditions)| (conditions.import_price, *step))
                    .map(|(step, _)| step);
                charge_car(&car.battery, cheapest, horizon.step_hours(), |step, decision| {
                    schedule.set(step, device_index, decision);
                });
            }
        }
    }
    schedule
}

/// Charge at the full rate in the given steps until the car is full.
///
/// The level only grows, so the steps do not have to be in chronological order.
fn charge_car(
    battery: &Battery,
    steps: impl Iterator<Item = usize>,
    for_: Hours,
    mut set: impl FnMut(usize, Decision),
) {
    if battery.charging_rate <= Kilowatts::ZERO {
        return;
    }
    let decision = Decision::Charge(battery.charging_rate);
    let mut level = battery.initial_level;
    for step in steps {
        match battery.apply(level, decision, for_) {
            Ok(applied) => {
                level = applied.level;
                set(step, decision);
            }
            Err(_) => break,
        }
    }
}

fn median_import_price(forecast: &Forecast) -> Option<KilowattHourPrice> {
    let prices = forecast.iter().map(|conditions| conditions.import_price).sorted().collect_vec();
    prices.get(prices.len() / 2).copied()
}

/// Seeds in the evaluation order.
pub fn seeds(fleet: &Fleet, forecast: &Forecast) -> Vec<Schedule> {
    vec![idle(fleet, forecast), greedy(fleet, forecast)]
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeDelta};
    use eos_quantities::{KilowattHours, Ratio};

    use super::*;
    use crate::{
        device::{DeviceSpec, ElectricCar, SolarPanel, SolarProfile},
        fleet::GridConnection,
        forecast::Conditions,
        horizon::Horizon,
    };

    fn forecast(prices: &[f64]) -> Forecast {
        let horizon = Horizon::builder()
            .start(DateTime::parse_from_rfc3339("2026-01-03T00:00:00+01:00").unwrap())
            .duration(TimeDelta::hours(i64::try_from(prices.len()).unwrap()))
            .resolution(TimeDelta::hours(1))
            .build()
            .unwrap();
        let samples = prices
            .iter()
            .map(|price| Conditions {
                import_price: KilowattHourPrice(*price),
                export_price: KilowattHourPrice(price - 0.2),
                ..Conditions::default()
            })
            .collect();
        Forecast::try_new(horizon, samples).unwrap()
    }

    fn battery(initial_level: f64) -> Battery {
        Battery::builder()
            .max_level(KilowattHours(4.0))
            .initial_level(KilowattHours(initial_level))
            .charging_rate(Kilowatts(2.0))
            .discharging_rate(Kilowatts(2.0))
            .build()
    }

    #[test]
    fn battery_follows_the_median() {
        let fleet = Fleet::try_new(
            vec![DeviceSpec::new("battery", DeviceKind::Battery(battery(2.0)))],
            GridConnection::UNLIMITED,
        )
        .unwrap();
        let schedule = greedy(&fleet, &forecast(&[0.1, 0.1, 0.3, 0.5, 0.5]));
        let decisions: Vec<_> = (0..5).map(|step| schedule.get(step, 0).unwrap()).collect();

        // The second charge would overflow, the median step is left alone:
        assert_eq!(
            decisions,
            [
                Decision::Charge(Kilowatts(2.0)),
                Decision::Idle,
                Decision::Idle,
                Decision::Discharge(Kilowatts(2.0)),
                Decision::Discharge(Kilowatts(2.0)),
            ],
        );
    }

    /// Verify that the car charges in the cheapest steps until full.
    #[test]
    fn car_charges_when_cheap() {
        let car = ElectricCar { battery: battery(0.0), usage: None };
        let fleet = Fleet::try_new(
            vec![DeviceSpec::new("car", DeviceKind::ElectricCar(car))],
            GridConnection::UNLIMITED,
        )
        .unwrap();
        let schedule = greedy(&fleet, &forecast(&[0.5, 0.2, 0.4, 0.1]));
        assert_eq!(schedule.get(3, 0), Some(Decision::Charge(Kilowatts(2.0))));
        assert_eq!(schedule.get(1, 0), Some(Decision::Charge(Kilowatts(2.0))));
        assert_eq!(schedule.n_actions(), 2);
    }

    #[test]
    fn curtail_on_negative_export_price() {
        let panel = SolarPanel {
            peak: Kilowatts(5.0),
            efficiency: Ratio(0.9),
            profile: SolarProfile::Full,
        };
        let fleet = Fleet::try_new(
            vec![DeviceSpec::new("solar", DeviceKind::Solar(panel))],
            GridConnection::UNLIMITED,
        )
        .unwrap();
        let schedule = greedy(&fleet, &forecast(&[0.1, 0.3]));
        assert_eq!(schedule.get(0, 0), Some(Decision::Curtail(Kilowatts(5.0))));
        assert_eq!(schedule.get(1, 0), Some(Decision::Idle));
    }

    #[test]
    fn empty_horizon() {
        let fleet = Fleet::try_new(
            vec![DeviceSpec::new("battery", DeviceKind::Battery(battery(2.0)))],
            GridConnection::UNLIMITED,
        )
        .unwrap();
        let schedule = greedy(&fleet, &forecast(&[]));
        assert_eq!(schedule.n_steps(), 0);
    }
}
