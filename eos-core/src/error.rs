use std::fmt::{Display, Formatter};

use chrono::TimeDelta;
use eos_quantities::{KilowattHours, Kilowatts};
use thiserror::Error;

use crate::{
    device::{Decision, DeviceId},
    interval::Timestamp,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum HorizonError {
    #[error("resolution must be positive, got {0}")]
    NonPositiveResolution(TimeDelta),

    #[error("duration must not be negative, got {0}")]
    NegativeDuration(TimeDelta),

    #[error("duration {duration} is not a multiple of the resolution {resolution}")]
    NotIntegral { duration: TimeDelta, resolution: TimeDelta },

    #[error("duration {duration} has too many steps of {resolution}")]
    TooLong { duration: TimeDelta, resolution: TimeDelta },
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FleetError {
    #[error("invalid device `{id}`: {reason}")]
    InvalidDevice { id: DeviceId, reason: String },

    #[error("duplicate device `{0}`")]
    DuplicateDevice(DeviceId),
}

/// The exogenous series does not cover the horizon.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum IncompleteForecast {
    #[error("forecast covers {actual} of {expected} steps")]
    TooShort { expected: usize, actual: usize },

    #[error("no forecast for {0}")]
    Missing(Timestamp),
}

/// Why a single transition or a step aggregate is infeasible.
#[derive(Copy, Clone, Debug, PartialEq, Error)]
pub enum Violation {
    #[error("requested {requested} is outside of the rate limit {limit}")]
    RateLimit { requested: Kilowatts, limit: Kilowatts },

    #[error("level {level} is outside of {min}..={max}")]
    Capacity { level: KilowattHours, min: KilowattHours, max: KilowattHours },

    #[error("`{0}` is not supported by the device")]
    Unsupported(Decision),

    #[error("the device is unavailable")]
    Unavailable,

    #[error("grid import of {requested} exceeds the connection limit of {limit}")]
    GridImport { requested: Kilowatts, limit: Kilowatts },

    #[error("grid export of {requested} exceeds the connection limit of {limit}")]
    GridExport { requested: Kilowatts, limit: Kilowatts },

    #[error(
        "schedule has {actual_steps}×{actual_devices} decisions, \
         expected {expected_steps}×{expected_devices}"
    )]
    Shape {
        expected_steps: usize,
        expected_devices: usize,
        actual_steps: usize,
        actual_devices: usize,
    },
}

/// What caused an infeasible step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Culprit {
    Device(DeviceId),

    /// Fleet-level coupling, evaluated on the step aggregate.
    Grid,

    /// The schedule itself does not match the fleet and horizon.
    Schedule,
}

impl Display for Culprit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Device(id) => write!(f, "device `{id}`"),
            Self::Grid => write!(f, "grid connection"),
            Self::Schedule => write!(f, "schedule"),
        }
    }
}

/// A candidate violates device or fleet constraints.
#[derive(Clone, Debug, PartialEq, Error)]
#[error("infeasible at step #{step} on {culprit}: {violation}")]
pub struct InfeasibleSchedule {
    pub step: usize,
    pub culprit: Culprit,

    #[source]
    pub violation: Violation,
}

#[derive(Clone, Debug, PartialEq, Error)]
#[error("no feasible schedule found in {n_evaluations} evaluations")]
pub struct NoFeasibleSchedule {
    pub n_evaluations: usize,

    /// The most recent rejection.
    #[source]
    pub last_rejection: Option<InfeasibleSchedule>,
}
