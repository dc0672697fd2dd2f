use crate::{
    currency::Euros,
    power::Kilowatts,
    price::KilowattHourPrice,
    time::Hours,
};

quantity!(KilowattHours, via: f64, suffix: "kWh", precision: 3);

implement_mul!(KilowattHours, KilowattHourPrice, Euros);
implement_div!(KilowattHours, Hours, Kilowatts);
implement_div!(KilowattHours, Kilowatts, Hours);

impl KilowattHours {
    /// Tolerance used for the capacity checks.
    pub const EPSILON: Self = Self(1e-9);
}
