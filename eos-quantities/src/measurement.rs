//! Run-time tagged quantities.
//!
//! Statically typed quantities reject dimension mistakes at compile time. Values that come from
//! configuration files are only known at run time, and are parsed into a [`Measurement`] first.
//! Any operation between measurements of different dimensions fails with [`DimensionMismatch`].

use std::{
    cmp::Ordering,
    fmt::{Display, Formatter},
    ops::{Div, Mul},
    str::FromStr,
};

use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::{
    currency::Euros,
    energy::KilowattHours,
    error::{DimensionMismatch, Error},
    power::Kilowatts,
    price::KilowattHourPrice,
    ratio::Ratio,
    time::Hours,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Dimension {
    Power,
    Energy,
    Time,
    Currency,
    EnergyPrice,
    Ratio,
}

impl Display for Dimension {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Power => write!(f, "power"),
            Self::Energy => write!(f, "energy"),
            Self::Time => write!(f, "time"),
            Self::Currency => write!(f, "currency"),
            Self::EnergyPrice => write!(f, "energy price"),
            Self::Ratio => write!(f, "ratio"),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Unit {
    Watts,
    Kilowatts,
    WattHours,
    KilowattHours,
    MegawattHours,
    Minutes,
    Hours,
    Euros,
    Cents,
    EurosPerKilowattHour,
    EurosPerMegawattHour,
    CentsPerKilowattHour,
    Percent,
}

impl Unit {
    pub const ALL: [Self; 13] = [
        Self::Watts,
        Self::Kilowatts,
        Self::WattHours,
        Self::KilowattHours,
        Self::MegawattHours,
        Self::Minutes,
        Self::Hours,
        Self::Euros,
        Self::Cents,
        Self::EurosPerKilowattHour,
        Self::EurosPerMegawattHour,
        Self::CentsPerKilowattHour,
        Self::Percent,
    ];

    #[must_use]
    pub const fn dimension(self) -> Dimension {
        match self {
            Self::Watts | Self::Kilowatts => Dimension::Power,
            Self::WattHours | Self::KilowattHours | Self::MegawattHours => Dimension::Energy,
            Self::Minutes | Self::Hours => Dimension::Time,
            Self::Euros | Self::Cents => Dimension::Currency,
            Self::EurosPerKilowattHour
            | Self::EurosPerMegawattHour
            | Self::CentsPerKilowattHour => Dimension::EnergyPrice,
            Self::Percent => Dimension::Ratio,
        }
    }

    /// Factor converting a value in this unit into the base unit of its dimension.
    ///
    /// Base units: kW, kWh, h, €, €/kWh and a plain proportion.
    #[must_use]
    pub const fn scale(self) -> f64 {
        match self {
            Self::Watts | Self::WattHours | Self::EurosPerMegawattHour => 0.001,
            Self::Kilowatts | Self::KilowattHours | Self::Hours | Self::Euros => 1.0,
            Self::EurosPerKilowattHour => 1.0,
            Self::MegawattHours => 1000.0,
            Self::Minutes => 1.0 / 60.0,
            Self::Cents | Self::CentsPerKilowattHour | Self::Percent => 0.01,
        }
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Watts => "W",
            Self::Kilowatts => "kW",
            Self::WattHours => "Wh",
            Self::KilowattHours => "kWh",
            Self::MegawattHours => "MWh",
            Self::Minutes => "min",
            Self::Hours => "h",
            Self::Euros => "€",
            Self::Cents => "ct",
            Self::EurosPerKilowattHour => "€/kWh",
            Self::EurosPerMegawattHour => "€/MWh",
            Self::CentsPerKilowattHour => "ct/kWh",
            Self::Percent => "%",
        }
    }
}

impl Display for Unit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let normalized = s.replace("EUR", "€");
        Self::ALL
            .into_iter()
            .find(|unit| unit.symbol() == normalized)
            .ok_or_else(|| Error::UnknownUnit(s.to_string()))
    }
}

/// Numeric value tagged with its unit.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, SerializeDisplay, DeserializeFromStr)]
pub struct Measurement {
    pub value: f64,
    pub unit: Unit,
}

impl Measurement {
    pub const fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    #[must_use]
    pub const fn dimension(self) -> Dimension {
        self.unit.dimension()
    }

    /// Value expressed in the base unit of the dimension.
    #[must_use]
    pub fn base_value(self) -> f64 {
        self.value * self.unit.scale()
    }

    /// Express the measurement in another unit of the same dimension.
    pub fn convert(self, unit: Unit) -> Result<Self, DimensionMismatch> {
        self.expect_dimension(unit.dimension())?;
        if unit == self.unit {
            return Ok(self);
        }
        Ok(Self::new(self.base_value() / unit.scale(), unit))
    }

    /// Add another measurement, keeping the unit of `self`.
    pub fn checked_add(self, rhs: Self) -> Result<Self, DimensionMismatch> {
        let rhs = rhs.convert(self.unit)?;
        Ok(Self::new(self.value + rhs.value, self.unit))
    }

    /// Subtract another measurement, keeping the unit of `self`.
    pub fn checked_sub(self, rhs: Self) -> Result<Self, DimensionMismatch> {
        let rhs = rhs.convert(self.unit)?;
        Ok(Self::new(self.value - rhs.value, self.unit))
    }

    /// Compare with another measurement of the same dimension.
    pub fn try_cmp(self, rhs: Self) -> Result<Ordering, DimensionMismatch> {
        self.expect_dimension(rhs.dimension())?;
        Ok(self.base_value().total_cmp(&rhs.base_value()))
    }

    fn expect_dimension(self, expected: Dimension) -> Result<(), DimensionMismatch> {
        let actual = self.dimension();
        if actual == expected {
            Ok(())
        } else {
            Err(DimensionMismatch { expected, actual })
        }
    }
}

impl Mul<f64> for Measurement {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self::new(self.value * rhs, self.unit)
    }
}

impl Div<f64> for Measurement {
    type Output = Self;

    fn div(self, rhs: f64) -> Self::Output {
        Self::new(self.value / rhs, self.unit)
    }
}

impl Display for Measurement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

impl FromStr for Measurement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (value, unit) = s
            .find(|c: char| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | '_')))
            .map(|index| s.split_at(index))
            .ok_or_else(|| Error::InvalidMeasurement(s.to_string()))?;
        let value = value
            .replace('_', "")
            .parse::<f64>()
            .map_err(|_| Error::InvalidMeasurement(s.to_string()))?;
        Ok(Self::new(value, unit.parse()?))
    }
}

macro_rules! implement_measurement {
    ($quantity:ty, $unit:expr) => {
        impl From<$quantity> for Measurement {
            fn from(quantity: $quantity) -> Self {
                Self::new(quantity.0, $unit)
            }
        }

        impl TryFrom<Measurement> for $quantity {
            type Error = DimensionMismatch;

            fn try_from(measurement: Measurement) -> Result<Self, Self::Error> {
                Ok(Self(measurement.convert($unit)?.value))
            }
        }
    };
}

implement_measurement!(Kilowatts, Unit::Kilowatts);
implement_measurement!(KilowattHours, Unit::KilowattHours);
implement_measurement!(Hours, Unit::Hours);
implement_measurement!(Euros, Unit::Euros);
implement_measurement!(KilowattHourPrice, Unit::EurosPerKilowattHour);

impl From<Ratio> for Measurement {
    fn from(ratio: Ratio) -> Self {
        Self::new(ratio.to_percent(), Unit::Percent)
    }
}

impl TryFrom<Measurement> for Ratio {
    type Error = DimensionMismatch;

    fn try_from(measurement: Measurement) -> Result<Self, Self::Error> {
        measurement.expect_dimension(Dimension::Ratio)?;
        Ok(Self(measurement.base_value()))
    }
}
