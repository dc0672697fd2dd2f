use std::fmt::{Debug, Display, Formatter};

quantity!(
    @base
    /// Dimensionless proportion, normally `0..=1`.
    Ratio
);

impl Ratio {
    pub const ONE: Self = Self(1.0);

    /// Build a proportion, rejecting values outside of `0..=1`.
    pub fn try_new(value: f64) -> Result<Self, crate::Error> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(crate::Error::OutOfRange { value, range: "0..=1" })
        }
    }

    pub const fn from_percent(percent: f64) -> Self {
        Self(percent / 100.0)
    }

    #[must_use]
    pub const fn to_percent(self) -> f64 {
        self.0 * 100.0
    }
}

impl Display for Ratio {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let precision = f.precision().unwrap_or(1);
        write!(f, "{:.*}%", precision, self.to_percent())
    }
}

impl Debug for Ratio {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}%", self.to_percent())
    }
}
