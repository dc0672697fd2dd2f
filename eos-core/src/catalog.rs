use std::collections::BTreeMap;

use thiserror::Error;

use crate::{error::FleetError, fleet::Fleet};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown fleet `{0}`")]
    UnknownFleet(String),

    #[error("invalid fleet")]
    Fleet(#[from] FleetError),

    #[error("invalid device definition: {0}")]
    Definition(String),
}

/// Source of validated device specifications.
pub trait DeviceCatalog {
    fn list_devices(&self, fleet_id: &str) -> Result<Fleet, CatalogError>;
}

#[derive(Default)]
pub struct MemoryCatalog(BTreeMap<String, Fleet>);

impl MemoryCatalog {
    pub fn insert(&mut self, fleet_id: impl Into<String>, fleet: Fleet) {
        self.0.insert(fleet_id.into(), fleet);
    }
}

impl DeviceCatalog for MemoryCatalog {
    fn list_devices(&self, fleet_id: &str) -> Result<Fleet, CatalogError> {
        self.0
            .get(fleet_id)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownFleet(fleet_id.to_string()))
    }
}
