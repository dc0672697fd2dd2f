use crate::{energy::KilowattHours, time::Hours};

quantity!(Kilowatts, via: f64, suffix: "kW", precision: 3);

implement_mul!(Kilowatts, Hours, KilowattHours);

impl Kilowatts {
    #[must_use]
    pub fn from_watts(watts: f64) -> Self {
        Self(watts / 1000.0)
    }
}
