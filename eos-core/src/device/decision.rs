use std::fmt::{Display, Formatter};

use eos_quantities::{Kilowatts, Zero};
use serde::{Deserialize, Serialize};

/// Per-device, per-step control action.
#[must_use]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "action", content = "power", rename_all = "snake_case")]
pub enum Decision {
    /// Do not act. Storage keeps its level, generation produces everything available.
    #[default]
    Idle,

    /// Draw the power from the bus into the storage.
    Charge(Kilowatts),

    /// Deliver the power from the storage into the bus.
    Discharge(Kilowatts),

    /// Reduce generation by up to the power.
    Curtail(Kilowatts),
}

impl Decision {
    pub const fn power(self) -> Kilowatts {
        match self {
            Self::Idle => Kilowatts::ZERO,
            Self::Charge(power) | Self::Discharge(power) | Self::Curtail(power) => power,
        }
    }

    /// Zero decisions are pass-through and do not count as actions.
    #[must_use]
    pub fn is_idle(self) -> bool {
        self.power() == Kilowatts::ZERO
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Charge(_) => "Charge",
            Self::Discharge(_) => "Discharge",
            Self::Curtail(_) => "Curtail",
        }
    }
}

impl Display for Decision {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            _ => write!(f, "{} {}", self.label(), self.power()),
        }
    }
}
