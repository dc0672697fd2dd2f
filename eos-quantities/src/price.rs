quantity!(
    /// Euro per kilowatt-hour.
    KilowattHourPrice, via: f64, suffix: "€/kWh", precision: 3
);

impl KilowattHourPrice {
    /// Convert a wholesale price given in euro per megawatt-hour.
    #[must_use]
    pub fn from_megawatt_hour(euros: f64) -> Self {
        Self(euros / 1000.0)
    }
}
