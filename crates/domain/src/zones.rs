//! Lookup of geographic zones owned by the geo service.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::ZoneId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A zone as reported by the geo service. Only the id is relied upon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ZoneError {
    #[error("Zone {0} does not exist")]
    NotFound(ZoneId),

    /// The geo service answered with an unexpected status or could not be reached.
    #[error("Geo service unavailable: {0}")]
    Unavailable(String),
}

/// Trait for verifying zone ids against the geo service.
#[async_trait]
pub trait ZoneDirectory: Send + Sync {
    /// Returns the zone, `NotFound` if the geo service does not know it.
    async fn verify_zone(&self, zone_id: ZoneId) -> Result<Zone, ZoneError>;
}

#[derive(Debug, Default)]
struct InMemoryZoneState {
    zones: HashMap<ZoneId, Zone>,
    unavailable: bool,
}

/// In-memory zone directory for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryZoneDirectory {
    state: Arc<RwLock<InMemoryZoneState>>,
}

impl InMemoryZoneDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory that knows zones `1..=count`.
    pub fn with_zones(count: i64) -> Self {
        let directory = Self::new();
        for id in 1..=count {
            directory.add_zone(ZoneId::new(id), format!("Zona {id}"));
        }
        directory
    }

    pub fn add_zone(&self, id: ZoneId, name: impl Into<String>) {
        if let Ok(mut state) = self.state.write() {
            state.zones.insert(
                id,
                Zone {
                    id,
                    name: Some(name.into()),
                },
            );
        }
    }

    /// Makes every lookup fail as if the geo service were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut state) = self.state.write() {
            state.unavailable = unavailable;
        }
    }
}

#[async_trait]
impl ZoneDirectory for InMemoryZoneDirectory {
    async fn verify_zone(&self, zone_id: ZoneId) -> Result<Zone, ZoneError> {
        let state = self
            .state
            .read()
            .map_err(|_| ZoneError::Unavailable("zone directory lock poisoned".to_string()))?;

        if state.unavailable {
            return Err(ZoneError::Unavailable("connection refused".to_string()));
        }

        state
            .zones
            .get(&zone_id)
            .cloned()
            .ok_or(ZoneError::NotFound(zone_id))
    }
}
