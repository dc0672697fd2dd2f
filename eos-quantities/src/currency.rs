quantity!(Euros, via: f64, suffix: "€", precision: 2);

impl Euros {
    pub const ONE_CENT: Self = Self(0.01);
}
