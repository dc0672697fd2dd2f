use eos_quantities::{Hours, KilowattHours, Kilowatts, Zero};

use crate::{device::Decision, error::Violation, flow::Flow};

/// Constant, uncontrollable consumption.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Load {
    pub power: Kilowatts,
}

impl Load {
    /// Only [`Decision::Idle`] is accepted.
    pub fn apply(self, decision: Decision, for_: Hours) -> Result<Flow<KilowattHours>, Violation> {
        if decision.is_idle() {
            Ok(Flow { import: self.power * for_, export: KilowattHours::ZERO })
        } else {
            Err(Violation::Unsupported(decision))
        }
    }
}
