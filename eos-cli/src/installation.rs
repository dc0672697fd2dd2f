//! Installation file: the grid connection, the devices behind it and the objective settings.
//!
//! Quantities are written with their units, for example `"11 kW"`, `"85 €/MWh"` or `"80 %"`,
//! and are checked against the expected dimension while the fleet is built.

use std::{fs, path::Path};

use chrono::{NaiveTime, Weekday};
use eos_core::{
    ChargeGoal,
    DeviceKind,
    DeviceSpec,
    FlatForecast,
    Fleet,
    GridConnection,
    Objective,
    catalog::{CatalogError, DeviceCatalog},
    device::{Battery, Efficiency, ElectricCar, Load, SolarPanel, SolarProfile, UsageProfile},
};
use eos_quantities::{
    Dimension,
    DimensionMismatch,
    Euros,
    KilowattHourPrice,
    KilowattHours,
    Kilowatts,
    Measurement,
    Ratio,
    Zero,
};
use serde::Deserialize;

use crate::prelude::*;

#[must_use]
#[derive(Debug, Deserialize)]
pub struct Installation {
    pub fleet_id: String,

    #[serde(default)]
    pub grid: GridConfig,

    #[serde(default)]
    pub objective: ObjectiveConfig,

    #[serde(default)]
    pub solar: Vec<SolarConfig>,

    #[serde(default)]
    pub load: Vec<LoadConfig>,

    #[serde(default)]
    pub battery: Vec<BatteryConfig>,

    #[serde(default)]
    pub car: Vec<CarConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GridConfig {
    pub max_import: Option<Measurement>,
    pub max_export: Option<Measurement>,

    /// Household consumption which is not modelled as a device.
    pub base_load: Option<Measurement>,

    /// Flat import price, used without a price file.
    pub import_price: Option<Measurement>,

    /// Flat export price, used without a price file.
    pub export_price: Option<Measurement>,

    /// Added to the market price.
    pub import_charge: Option<Measurement>,

    /// Subtracted from the market price.
    pub export_charge: Option<Measurement>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ObjectiveConfig {
    pub residual_value: Option<Measurement>,
    pub car_charge: Option<ChargeGoalConfig>,
}

#[derive(Debug, Deserialize)]
pub struct ChargeGoalConfig {
    pub target: Measurement,
    pub step: Measurement,
    pub price: Measurement,
}

#[derive(Debug, Deserialize)]
pub struct SolarConfig {
    pub id: String,

    #[serde(default = "default_count")]
    pub count: usize,

    pub peak: Measurement,
    pub efficiency: Option<Measurement>,

    #[serde(default)]
    pub profile: ProfileConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileConfig {
    Full,

    #[default]
    Curved,

    /// One value per hour of the day.
    Hourly(Vec<Measurement>),
}

#[derive(Debug, Deserialize)]
pub struct LoadConfig {
    pub id: String,

    #[serde(default = "default_count")]
    pub count: usize,

    pub power: Measurement,
}

#[derive(Debug, Deserialize)]
pub struct BatteryConfig {
    pub id: String,

    #[serde(default = "default_count")]
    pub count: usize,

    pub capacity: Measurement,

    /// Energy or a share of the capacity, defaults to empty.
    pub min_level: Option<Measurement>,

    /// Energy or a share of the capacity, defaults to the minimum level.
    pub initial_level: Option<Measurement>,

    pub charging_rate: Measurement,

    /// Defaults to the charging rate.
    pub discharging_rate: Option<Measurement>,

    pub charging_efficiency: Option<Measurement>,
    pub discharging_efficiency: Option<Measurement>,

    /// Throughput cost.
    pub wear_cost: Option<Measurement>,
}

#[derive(Debug, Deserialize)]
pub struct CarConfig {
    #[serde(flatten)]
    pub battery: BatteryConfig,

    pub usage: Option<UsageConfig>,
}

#[derive(Debug, Deserialize)]
pub struct UsageConfig {
    pub days: Vec<Weekday>,
    pub leaves: NaiveTime,
    pub returns: NaiveTime,
}

const fn default_count() -> usize {
    1
}

const DEFAULT_EFFICIENCY: Ratio = Ratio(0.9);

impl Installation {
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read `{}`", path.display()))?;
        let installation: Self = toml::from_str(&text)
            .with_context(|| format!("failed to parse `{}`", path.display()))?;
        info!(fleet_id = %installation.fleet_id, "loaded the installation");
        Ok(installation)
    }

    pub fn fleet(&self) -> Result<Fleet, CatalogError> {
        let mut devices = Vec::new();
        for solar in &self.solar {
            let panel = solar.build()?;
            devices.extend(
                replicate(&solar.id, solar.count)
                    .map(|id| DeviceSpec::new(id, DeviceKind::Solar(panel.clone()))),
            );
        }
        for load in &self.load {
            let kind = DeviceKind::Load(Load { power: convert(load.power, "power")? });
            devices.extend(
                replicate(&load.id, load.count).map(|id| DeviceSpec::new(id, kind.clone())),
            );
        }
        for battery in &self.battery {
            let kind = DeviceKind::Battery(battery.build()?);
            devices.extend(
                replicate(&battery.id, battery.count)
                    .map(|id| DeviceSpec::new(id, kind.clone())),
            );
        }
        for car in &self.car {
            let kind = DeviceKind::ElectricCar(car.build()?);
            devices.extend(
                replicate(&car.battery.id, car.battery.count)
                    .map(|id| DeviceSpec::new(id, kind.clone())),
            );
        }
        let grid = GridConnection {
            max_import: optional(self.grid.max_import, "max_import")?,
            max_export: optional(self.grid.max_export, "max_export")?,
        };
        Ok(Fleet::try_new(devices, grid)?)
    }

    pub fn objective(&self) -> Result<Objective> {
        let residual_value: Option<KilowattHourPrice> =
            optional(self.objective.residual_value, "residual_value")?;
        let car_charge = self
            .objective
            .car_charge
            .as_ref()
            .map(|goal| -> Result<ChargeGoal, CatalogError> {
                Ok(ChargeGoal {
                    target: convert(goal.target, "target")?,
                    step: convert(goal.step, "step")?,
                    price: convert::<Euros>(goal.price, "price")?,
                })
            })
            .transpose()?;
        Ok(Objective::builder()
            .maybe_residual_value(residual_value)
            .maybe_car_charge(car_charge)
            .build())
    }

    /// Constant demand and prices, with the default daylight window.
    pub fn flat_forecast(&self) -> Result<FlatForecast> {
        Ok(FlatForecast::builder()
            .maybe_demand(optional(self.grid.base_load, "base_load")?)
            .maybe_import_price(optional(self.grid.import_price, "import_price")?)
            .maybe_export_price(optional(self.grid.export_price, "export_price")?)
            .build())
    }

    /// Import and export charges applied on top of the market prices.
    pub fn charges(&self) -> Result<(KilowattHourPrice, KilowattHourPrice)> {
        Ok((
            optional(self.grid.import_charge, "import_charge")?.unwrap_or(KilowattHourPrice::ZERO),
            optional(self.grid.export_charge, "export_charge")?.unwrap_or(KilowattHourPrice::ZERO),
        ))
    }
}

impl DeviceCatalog for Installation {
    fn list_devices(&self, fleet_id: &str) -> Result<Fleet, CatalogError> {
        if fleet_id != self.fleet_id {
            return Err(CatalogError::UnknownFleet(fleet_id.to_string()));
        }
        self.fleet()
    }
}

impl SolarConfig {
    fn build(&self) -> Result<SolarPanel, CatalogError> {
        let profile = match &self.profile {
            ProfileConfig::Full => SolarProfile::Full,
            ProfileConfig::Curved => SolarProfile::curved(),
            ProfileConfig::Hourly(hourly) => {
                let hourly = hourly
                    .iter()
                    .map(|factor| convert::<Ratio>(*factor, "hourly profile"))
                    .collect::<Result<Vec<_>, _>>()?;
                let hourly = <[Ratio; 24]>::try_from(hourly).map_err(|hourly| {
                    CatalogError::Definition(format!(
                        "`{}`: hourly profile needs 24 values, got {}",
                        self.id,
                        hourly.len(),
                    ))
                })?;
                SolarProfile::Hourly(Box::new(hourly))
            }
        };
        Ok(SolarPanel {
            peak: convert(self.peak, "peak")?,
            efficiency: optional(self.efficiency, "efficiency")?.unwrap_or(DEFAULT_EFFICIENCY),
            profile,
        })
    }
}

impl BatteryConfig {
    fn build(&self) -> Result<Battery, CatalogError> {
        let max_level: KilowattHours = convert(self.capacity, "capacity")?;
        let min_level = self
            .min_level
            .map(|level| energy_or_share(level, max_level))
            .transpose()?
            .unwrap_or(KilowattHours::ZERO);
        let charging_rate: Kilowatts = convert(self.charging_rate, "charging_rate")?;
        Ok(Battery::builder()
            .min_level(min_level)
            .max_level(max_level)
            .initial_level(
                self.initial_level
                    .map(|level| energy_or_share(level, max_level))
                    .transpose()?
                    .unwrap_or(min_level),
            )
            .charging_rate(charging_rate)
            .discharging_rate(
                optional(self.discharging_rate, "discharging_rate")?.unwrap_or(charging_rate),
            )
            .efficiency(Efficiency {
                charging: optional(self.charging_efficiency, "charging_efficiency")?
                    .unwrap_or(DEFAULT_EFFICIENCY),
                discharging: optional(self.discharging_efficiency, "discharging_efficiency")?
                    .unwrap_or(DEFAULT_EFFICIENCY),
            })
            .wear_cost(optional(self.wear_cost, "wear_cost")?.unwrap_or(KilowattHourPrice::ZERO))
            .build())
    }
}

impl CarConfig {
    fn build(&self) -> Result<ElectricCar, CatalogError> {
        Ok(ElectricCar {
            battery: self.battery.build()?,
            usage: self.usage.as_ref().map(|usage| UsageProfile {
                days: usage.days.clone(),
                leaves: usage.leaves,
                returns: usage.returns,
            }),
        })
    }
}

/// Device ids for `count` copies: the plain id for a single device, numbered ones otherwise.
fn replicate(id: &str, count: usize) -> impl Iterator<Item = String> {
    (1..=count).map(move |n| if count == 1 { id.to_string() } else { format!("{id}-{n:02}") })
}

fn convert<T>(measurement: Measurement, field: &str) -> Result<T, CatalogError>
where
    T: TryFrom<Measurement, Error = DimensionMismatch>,
{
    T::try_from(measurement)
        .map_err(|error| CatalogError::Definition(format!("`{field}` = {measurement}: {error}")))
}

fn optional<T>(measurement: Option<Measurement>, field: &str) -> Result<Option<T>, CatalogError>
where
    T: TryFrom<Measurement, Error = DimensionMismatch>,
{
    measurement.map(|measurement| convert(measurement, field)).transpose()
}

fn energy_or_share(
    measurement: Measurement,
    capacity: KilowattHours,
) -> Result<KilowattHours, CatalogError> {
    if measurement.dimension() == Dimension::Ratio {
        Ok(capacity * convert::<Ratio>(measurement, "level")?)
    } else {
        convert(measurement, "level")
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    const INSTALLATION: &str = r#"
        fleet_id = "home"

        [grid]
        max_import = "11 kW"
        base_load = "300 W"
        import_charge = "8 ct/kWh"
        export_charge = "4 ct/kWh"

        [objective]
        residual_value = "0.25 €/kWh"

        [objective.car_charge]
        target = "80 %"
        step = "10 %"
        price = "5 €"

        [[solar]]
        id = "roof"
        count = 2
        peak = "4000 W"
        efficiency = "95 %"

        [[load]]
        id = "fridge"
        power = "100 W"

        [[battery]]
        id = "battery"
        capacity = "10 kWh"
        initial_level = "50 %"
        charging_rate = "5 kW"
        wear_cost = "2 ct/kWh"

        [[car]]
        id = "car"
        capacity = "60 kWh"
        initial_level = "30 kWh"
        charging_rate = "11 kW"

        [car.usage]
        days = ["Mon", "Tue", "Wed", "Thu", "Fri"]
        leaves = "07:30:00"
        returns = "17:00:00"
    "#;

    fn installation() -> Installation {
        toml::from_str(INSTALLATION).unwrap()
    }

    #[test]
    fn fleet() {
        let fleet = installation().list_devices("home").unwrap();
        let ids: Vec<&str> = fleet.devices().iter().map(|spec| spec.id.as_str()).collect();
        assert_eq!(ids, ["roof-01", "roof-02", "fridge", "battery", "car"]);
        assert_eq!(fleet.grid().max_import, Some(Kilowatts(11.0)));
        assert_eq!(fleet.grid().max_export, None);

        let battery = fleet.devices()[3].storage().unwrap();
        assert_abs_diff_eq!(battery.initial_level.0, 5.0, epsilon = 1e-12);
        assert_eq!(battery.discharging_rate, Kilowatts(5.0));
        assert_eq!(battery.efficiency.charging, DEFAULT_EFFICIENCY);
        assert_abs_diff_eq!(battery.wear_cost.0, 0.02, epsilon = 1e-12);

        let DeviceKind::Solar(panel) = &fleet.devices()[0].kind else {
            panic!("expected a solar panel");
        };
        assert_abs_diff_eq!(panel.peak.0, 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(panel.efficiency.0, 0.95, epsilon = 1e-12);
    }

    #[test]
    fn unknown_fleet() {
        assert!(matches!(
            installation().list_devices("office"),
            Err(CatalogError::UnknownFleet(fleet_id)) if fleet_id == "office",
        ));
    }

    /// Verify that a quantity of the wrong dimension is rejected.
    #[test]
    fn wrong_dimension() {
        let installation: Installation = toml::from_str(
            r#"
            fleet_id = "home"

            [[load]]
            id = "fridge"
            power = "100 kWh"
            "#,
        )
        .unwrap();
        assert!(matches!(installation.fleet(), Err(CatalogError::Definition(_))));
    }

    #[test]
    fn invalid_device() {
        let installation: Installation = toml::from_str(
            r#"
            fleet_id = "home"

            [[battery]]
            id = "battery"
            capacity = "10 kWh"
            initial_level = "12 kWh"
            charging_rate = "5 kW"
            "#,
        )
        .unwrap();
        assert!(matches!(installation.fleet(), Err(CatalogError::Fleet(_))));
    }

    #[test]
    fn solar_default_efficiency() {
        let installation: Installation = toml::from_str(
            r#"
            fleet_id = "home"

            [[solar]]
            id = "roof"
            peak = "4 kW"
            "#,
        )
        .unwrap();
        let fleet = installation.fleet().unwrap();
        let DeviceKind::Solar(panel) = &fleet.devices()[0].kind else {
            panic!("expected a solar panel");
        };
        assert_eq!(panel.efficiency, DEFAULT_EFFICIENCY);
    }

    #[test]
    fn hourly_profile_length() {
        let installation: Installation = toml::from_str(
            r#"
            fleet_id = "home"

            [[solar]]
            id = "roof"
            peak = "4 kW"
            profile = { hourly = ["50 %", "60 %"] }
            "#,
        )
        .unwrap();
        assert!(matches!(installation.fleet(), Err(CatalogError::Definition(_))));
    }

    #[test]
    fn objective_and_charges() {
        let installation = installation();
        assert!(installation.objective().is_ok());
        let (import_charge, export_charge) = installation.charges().unwrap();
        assert_abs_diff_eq!(import_charge.0, 0.08, epsilon = 1e-12);
        assert_abs_diff_eq!(export_charge.0, 0.04, epsilon = 1e-12);
    }

    #[test]
    fn objective_wrong_dimension() {
        let installation: Installation = toml::from_str(
            r#"
            fleet_id = "home"

            [objective]
            residual_value = "5 kW"
            "#,
        )
        .unwrap();
        assert!(installation.objective().is_err());
    }

    #[test]
    fn replicate_ids() {
        assert_eq!(replicate("car", 1).collect::<Vec<_>>(), ["car"]);
        assert_eq!(replicate("car", 3).collect::<Vec<_>>(), ["car-01", "car-02", "car-03"]);
        assert_eq!(replicate("car", 0).count(), 0);
    }
}
