use std::{
    iter::Sum,
    ops::{Add, Sub},
};

use derive_more::{Add, AddAssign, Sub};
use eos_quantities::{KilowattHours, Zero};
use serde::Serialize;

/// Generic bidirectional energy flow.
#[must_use]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Add, Sub, AddAssign, Serialize)]
pub struct Flow<T> {
    /// Drawn from the bus: grid import, battery charging or consumption.
    pub import: T,

    /// Injected into the bus: grid export, battery discharging or production.
    pub export: T,
}

impl<T: Zero> Zero for Flow<T> {
    const ZERO: Self = Self { import: T::ZERO, export: T::ZERO };
}

impl<T: Copy> Flow<T> {
    /// Get the reversed flow where the import becomes export and vice versa.
    pub const fn reversed(&self) -> Self {
        Self { import: self.export, export: self.import }
    }
}

impl<T: Copy + Sub<Output = T>> Flow<T> {
    pub fn net(self) -> T {
        self.import - self.export
    }
}

impl<T: Zero + Add<Output = T>> Sum for Flow<T> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |sum, flow| Self {
            import: sum.import + flow.import,
            export: sum.export + flow.export,
        })
    }
}

impl Flow<KilowattHours> {
    /// Split a net import into the non-negative import and export parts.
    pub fn from_net(net_import: KilowattHours) -> Self {
        Self {
            import: net_import.max(KilowattHours::ZERO),
            export: (-net_import).max(KilowattHours::ZERO),
        }
    }
}
