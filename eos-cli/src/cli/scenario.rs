use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, Local, TimeDelta, Timelike};
use clap::Parser;
use eos_core::{
    Fleet,
    Forecast,
    ForecastSource,
    Horizon,
    Objective,
    Timestamp,
    catalog::DeviceCatalog,
};

use crate::{
    installation::Installation,
    prelude::*,
    prices::{CsvPrices, MarketPrices},
};

/// What is simulated: the installation, the horizon and the forecast inputs.
#[derive(Parser)]
pub struct ScenarioArgs {
    /// Installation file with the grid connection and the devices.
    #[clap(long, env = "EOS_INSTALLATION", default_value = "installation.toml")]
    installation: PathBuf,

    /// Fleet to load from the installation, defaults to the installation's own.
    #[clap(long, env = "EOS_FLEET_ID")]
    fleet_id: Option<String>,

    /// Day-ahead price CSV: a date followed by the hourly prices in €/MWh on each row.
    ///
    /// Flat prices from the installation are used when omitted.
    #[clap(long, env = "EOS_PRICES")]
    prices: Option<PathBuf>,

    /// Horizon start, defaults to the start of the current hour.
    #[clap(long, env = "EOS_START")]
    start: Option<DateTime<FixedOffset>>,

    /// Horizon duration.
    #[clap(long, env = "EOS_DURATION", default_value = "24h")]
    duration: humantime::Duration,

    /// Step length, must divide the duration.
    #[clap(long, env = "EOS_RESOLUTION", default_value = "15m")]
    resolution: humantime::Duration,
}

#[must_use]
pub struct Scenario {
    pub fleet_id: String,
    pub fleet: Fleet,
    pub forecast: Forecast,
    pub objective: Objective,
}

impl ScenarioArgs {
    #[instrument(skip_all)]
    pub fn load(&self) -> Result<Scenario> {
        let installation = Installation::read(&self.installation)?;
        let fleet_id = self.fleet_id.clone().unwrap_or_else(|| installation.fleet_id.clone());
        let fleet = installation
            .list_devices(&fleet_id)
            .with_context(|| format!("failed to load the fleet `{fleet_id}`"))?;
        let horizon = Horizon::builder()
            .start(self.start()?)
            .duration(TimeDelta::from_std(*self.duration).context("duration is too long")?)
            .resolution(TimeDelta::from_std(*self.resolution).context("resolution is too long")?)
            .build()?;
        let base = installation.flat_forecast()?;
        let forecast = match &self.prices {
            Some(path) => {
                let (import_charge, export_charge) = installation.charges()?;
                CsvPrices::builder()
                    .market(MarketPrices::read(path)?)
                    .import_charge(import_charge)
                    .export_charge(export_charge)
                    .base(base)
                    .build()
                    .fetch(&horizon)
            }
            None => base.fetch(&horizon),
        }
        .context("the forecast does not cover the horizon")?;
        info!(
            n_devices = fleet.len(),
            n_steps = horizon.n_steps(),
            start = %horizon.start(),
            end = %horizon.end(),
            "loaded the scenario",
        );
        Ok(Scenario { fleet_id, fleet, forecast, objective: installation.objective()? })
    }

    fn start(&self) -> Result<Timestamp> {
        if let Some(start) = self.start {
            return Ok(start);
        }
        let now = Local::now();
        let start = now
            .with_minute(0)
            .and_then(|now| now.with_second(0))
            .and_then(|now| now.with_nanosecond(0))
            .context("failed to truncate the current time")?;
        Ok(start.fixed_offset())
    }
}
