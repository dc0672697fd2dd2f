//! Exogenous inputs of a run: demand, sun and prices.

use std::collections::BTreeMap;

use bon::Builder;
use chrono::Timelike;
use eos_quantities::{KilowattHourPrice, Kilowatts, Ratio, Zero};
use serde::{Deserialize, Serialize};

use crate::{error::IncompleteForecast, horizon::Horizon, interval::Timestamp};

/// One step of exogenous inputs.
#[must_use]
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    /// Household base load.
    pub demand: Kilowatts,

    /// Available generation potential.
    pub sun: Ratio,

    pub import_price: KilowattHourPrice,
    pub export_price: KilowattHourPrice,
}

/// Exogenous series aligned to a horizon: exactly one sample per step.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct Forecast {
    horizon: Horizon,
    samples: Vec<Conditions>,
}

impl Forecast {
    /// Align the samples to the horizon.
    ///
    /// Extra samples past the horizon end are dropped.
    pub fn try_new(
        horizon: Horizon,
        mut samples: Vec<Conditions>,
    ) -> Result<Self, IncompleteForecast> {
        if samples.len() < horizon.n_steps() {
            return Err(IncompleteForecast::TooShort {
                expected: horizon.n_steps(),
                actual: samples.len(),
            });
        }
        samples.truncate(horizon.n_steps());
        Ok(Self { horizon, samples })
    }

    pub const fn horizon(&self) -> &Horizon {
        &self.horizon
    }

    #[must_use]
    pub fn samples(&self) -> &[Conditions] {
        &self.samples
    }

    pub fn iter(&self) -> impl Iterator<Item = &Conditions> {
        self.samples.iter()
    }

    /// Cheapest import price over the horizon, if any.
    #[must_use]
    pub fn min_import_price(&self) -> Option<KilowattHourPrice> {
        self.samples.iter().map(|conditions| conditions.import_price).min()
    }
}

/// Produces a forecast covering the horizon, or fails before anything is simulated.
pub trait ForecastSource {
    fn fetch(&self, horizon: &Horizon) -> Result<Forecast, IncompleteForecast>;
}

/// Crude sunshine model: dark outside of the window, dimmer at its edges.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FlatWeather {
    /// Sunrise hour.
    pub from: u32,

    /// Sunset hour.
    pub to: u32,
}

impl Default for FlatWeather {
    fn default() -> Self {
        Self { from: 7, to: 18 }
    }
}

impl FlatWeather {
    pub fn sun(self, at: Timestamp) -> Ratio {
        let hour = at.hour();
        if hour <= self.from || hour >= self.to {
            Ratio::ZERO
        } else if hour - self.from < 2 || self.to - hour < 2 {
            Ratio(0.9)
        } else {
            Ratio::ONE
        }
    }
}

/// Constant demand and prices with the [`FlatWeather`] sun.
#[must_use]
#[derive(Copy, Clone, Debug, Builder)]
pub struct FlatForecast {
    #[builder(default = Kilowatts(0.4))]
    demand: Kilowatts,

    #[builder(default = KilowattHourPrice(0.39))]
    import_price: KilowattHourPrice,

    #[builder(default = KilowattHourPrice(0.08))]
    export_price: KilowattHourPrice,

    #[builder(default)]
    weather: FlatWeather,
}

impl FlatForecast {
    pub fn sample(&self, at: Timestamp) -> Conditions {
        Conditions {
            demand: self.demand,
            sun: self.weather.sun(at),
            import_price: self.import_price,
            export_price: self.export_price,
        }
    }
}

impl ForecastSource for FlatForecast {
    fn fetch(&self, horizon: &Horizon) -> Result<Forecast, IncompleteForecast> {
        let samples = horizon.intervals().map(|interval| self.sample(interval.start)).collect();
        Forecast::try_new(*horizon, samples)
    }
}

/// Recorded samples keyed by the step start.
#[must_use]
#[derive(Clone, Debug, Default)]
pub struct RecordedForecast(BTreeMap<Timestamp, Conditions>);

impl RecordedForecast {
    pub fn insert(&mut self, at: Timestamp, conditions: Conditions) {
        self.0.insert(at, conditions);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Timestamp, Conditions)> for RecordedForecast {
    fn from_iter<T: IntoIterator<Item = (Timestamp, Conditions)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl ForecastSource for RecordedForecast {
    fn fetch(&self, horizon: &Horizon) -> Result<Forecast, IncompleteForecast> {
        let samples = horizon
            .intervals()
            .map(|interval| {
                self.0
                    .get(&interval.start)
                    .copied()
                    .ok_or(IncompleteForecast::Missing(interval.start))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Forecast::try_new(*horizon, samples)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{DateTime, TimeDelta};

    use super::*;

    fn horizon(hours: i64) -> Horizon {
        Horizon::builder()
            .start(DateTime::parse_from_rfc3339("2026-01-02T00:00:00+01:00").unwrap())
            .duration(TimeDelta::hours(hours))
            .resolution(TimeDelta::hours(1))
            .build()
            .unwrap()
    }

    /// Verify that a short series fails before anything is simulated.
    #[test]
    fn too_short() {
        let result = Forecast::try_new(horizon(4), vec![Conditions::default(); 3]);
        assert_eq!(result, Err(IncompleteForecast::TooShort { expected: 4, actual: 3 }));
    }

    #[test]
    fn extra_samples_are_dropped() {
        let forecast = Forecast::try_new(horizon(2), vec![Conditions::default(); 5]).unwrap();
        assert_eq!(forecast.samples().len(), 2);
    }

    #[test]
    fn flat_weather() {
        let weather = FlatWeather::default();
        let day = horizon(24);
        let sun: Vec<f64> = day.intervals().map(|interval| weather.sun(interval.start).0).collect();
        assert_abs_diff_eq!(sun[7], 0.0);
        assert_abs_diff_eq!(sun[8], 0.9);
        assert_abs_diff_eq!(sun[9], 1.0);
        assert_abs_diff_eq!(sun[12], 1.0);
        assert_abs_diff_eq!(sun[16], 1.0);
        assert_abs_diff_eq!(sun[17], 0.9);
        assert_abs_diff_eq!(sun[18], 0.0);
    }

    #[test]
    fn flat_forecast() {
        let forecast = FlatForecast::builder().build().fetch(&horizon(24)).unwrap();
        assert_eq!(forecast.samples().len(), 24);
        assert_eq!(forecast.min_import_price(), Some(KilowattHourPrice(0.39)));
        assert_abs_diff_eq!(forecast.samples()[0].demand.0, 0.4);
    }

    #[test]
    fn recorded_gap() {
        let horizon = horizon(3);
        let recorded: RecordedForecast = horizon
            .intervals()
            .take(2)
            .map(|interval| (interval.start, Conditions::default()))
            .collect();
        assert_eq!(
            recorded.fetch(&horizon),
            Err(IncompleteForecast::Missing(horizon.interval(2).start)),
        );
    }

    #[test]
    fn empty_horizon() {
        let forecast = RecordedForecast::default().fetch(&horizon(0)).unwrap();
        assert!(forecast.samples().is_empty());
        assert_eq!(forecast.min_import_price(), None);
    }
}
