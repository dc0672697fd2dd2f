//! Day-ahead stock prices from a CSV file.
//!
//! Each row holds a date (`2025/08/04`) followed by the hourly prices in €/MWh, starting at
//! midnight. There is no header, and rows may have fewer or more than 24 hours on clock changes.

use std::{collections::BTreeMap, fs::File, io::Read, path::Path};

use bon::Builder;
use chrono::{NaiveDate, Timelike};
use eos_core::{FlatForecast, Forecast, ForecastSource, Horizon, IncompleteForecast, Timestamp};
use eos_quantities::{KilowattHourPrice, Zero};

use crate::prelude::*;

const DATE_FORMAT: &str = "%Y/%m/%d";

/// Hourly market prices by date.
#[must_use]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MarketPrices(BTreeMap<NaiveDate, Vec<KilowattHourPrice>>);

impl MarketPrices {
    pub fn read(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("failed to open `{}`", path.display()))?;
        let prices = Self::from_reader(file)
            .with_context(|| format!("failed to read the prices from `{}`", path.display()))?;
        info!(n_days = prices.0.len(), "loaded the market prices");
        Ok(prices)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut reader =
            csv::ReaderBuilder::new().has_headers(false).flexible(true).from_reader(reader);
        let mut prices = BTreeMap::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("malformed row #{}", row + 1))?;
            let mut fields = record.iter().map(str::trim);
            let date = fields.next().context("empty row")?;
            let date = NaiveDate::parse_from_str(date, DATE_FORMAT)
                .with_context(|| format!("invalid date `{date}` in row #{}", row + 1))?;
            let hourly = fields
                .filter(|field| !field.is_empty())
                .map(|field| {
                    field
                        .parse::<f64>()
                        .map(KilowattHourPrice::from_megawatt_hour)
                        .with_context(|| format!("invalid price `{field}` on {date}"))
                })
                .collect::<Result<Vec<_>>>()?;
            ensure!(prices.insert(date, hourly).is_none(), "duplicate date {date}");
        }
        Ok(Self(prices))
    }

    /// Market price of the hour which contains the timestamp, in its own offset.
    #[must_use]
    pub fn at(&self, timestamp: Timestamp) -> Option<KilowattHourPrice> {
        let hourly = self.0.get(&timestamp.date_naive())?;
        hourly.get(usize::try_from(timestamp.hour()).ok()?).copied()
    }
}

/// Demand and sun of the base forecast, prices from the market.
#[must_use]
#[derive(Builder)]
pub struct CsvPrices {
    market: MarketPrices,

    /// Added to the market price on import.
    #[builder(default = KilowattHourPrice::ZERO)]
    import_charge: KilowattHourPrice,

    /// Subtracted from the market price on export.
    #[builder(default = KilowattHourPrice::ZERO)]
    export_charge: KilowattHourPrice,

    base: FlatForecast,
}

impl ForecastSource for CsvPrices {
    fn fetch(&self, horizon: &Horizon) -> Result<Forecast, IncompleteForecast> {
        let samples = horizon
            .intervals()
            .map(|interval| {
                let market = self
                    .market
                    .at(interval.start)
                    .ok_or(IncompleteForecast::Missing(interval.start))?;
                let mut conditions = self.base.sample(interval.start);
                conditions.import_price = market + self.import_charge;
                conditions.export_price = market - self.export_charge;
                Ok(conditions)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Forecast::try_new(*horizon, samples)
    }
}
