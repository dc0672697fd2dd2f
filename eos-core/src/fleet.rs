use std::collections::HashSet;

use eos_quantities::{Hours, KilowattHours, Kilowatts};

use crate::{
    device::DeviceSpec,
    error::{FleetError, Violation},
    flow::Flow,
};

/// Limits of the connection between the fleet bus and the grid.
#[must_use]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct GridConnection {
    pub max_import: Option<Kilowatts>,
    pub max_export: Option<Kilowatts>,
}

impl GridConnection {
    pub const UNLIMITED: Self = Self { max_import: None, max_export: None };

    /// Check the step aggregate against the limits.
    pub fn check(self, flow: Flow<KilowattHours>, for_: Hours) -> Result<(), Violation> {
        if let Some(limit) = self.max_import {
            let requested = flow.import / for_;
            if requested > limit + Kilowatts(KilowattHours::EPSILON.0) {
                return Err(Violation::GridImport { requested, limit });
            }
        }
        if let Some(limit) = self.max_export {
            let requested = flow.export / for_;
            if requested > limit + Kilowatts(KilowattHours::EPSILON.0) {
                return Err(Violation::GridExport { requested, limit });
            }
        }
        Ok(())
    }
}

/// Validated set of devices behind one grid connection.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct Fleet {
    devices: Vec<DeviceSpec>,
    grid: GridConnection,
}

impl Fleet {
    /// Validate every device, reject duplicated ids, and order the devices by type and id.
    pub fn try_new(
        mut devices: Vec<DeviceSpec>,
        grid: GridConnection,
    ) -> Result<Self, FleetError> {
        let mut ids = HashSet::with_capacity(devices.len());
        for device in &devices {
            device.validate()?;
            if !ids.insert(&device.id) {
                return Err(FleetError::DuplicateDevice(device.id.clone()));
            }
        }
        devices.sort_by(|lhs, rhs| {
            lhs.kind.priority().cmp(&rhs.kind.priority()).then_with(|| lhs.id.cmp(&rhs.id))
        });
        Ok(Self { devices, grid })
    }

    #[must_use]
    pub fn devices(&self) -> &[DeviceSpec] {
        &self.devices
    }

    pub const fn grid(&self) -> GridConnection {
        self.grid
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Index of the device with the id.
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.devices.iter().position(|device| device.id.as_str() == id)
    }
}
