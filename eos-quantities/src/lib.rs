//! Dimensioned quantities for energy system modelling.
//!
//! Typed newtypes ([`Kilowatts`], [`KilowattHours`], [`Hours`], [`Euros`],
//! [`KilowattHourPrice`], [`Ratio`]) only expose physically meaningful arithmetic.
//! [`Measurement`] carries its unit at run time and is used at configuration boundaries.

#[macro_use]
mod macros;

pub mod currency;
pub mod energy;
pub mod error;
pub mod measurement;
pub mod power;
pub mod price;
pub mod ratio;
pub mod time;
mod zero;

pub use self::{
    currency::Euros,
    energy::KilowattHours,
    error::{DimensionMismatch, Error},
    measurement::{Dimension, Measurement, Unit},
    power::Kilowatts,
    price::KilowattHourPrice,
    ratio::Ratio,
    time::Hours,
    zero::Zero,
};
