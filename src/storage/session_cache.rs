//! Session-scoped cache of query selections and fetched results.
//!
//! Best-effort restore only: the backend is the source of truth. Entries have
//! no TTL and live until cleared or until the session ends (logout).

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::store::{KeyValueStore, StoreError};

/// Last forecast spot/day selection.
pub const FORECAST_SELECTION_KEY: &str = "forecast_selection";
/// Last forecast result set.
pub const FORECAST_RESULTS_KEY: &str = "forecast_results";

/// Home-feed recommendations for a user.
pub fn recommendations_key(user_id: &str) -> String {
    format!("recommendations_for_{}", user_id)
}

/// Name of the default preset the home feed was built from.
pub fn preset_name_key(user_id: &str) -> String {
    format!("default_preset_name_for_{}", user_id)
}

#[derive(Clone)]
pub struct SessionCache {
    store: Arc<dyn KeyValueStore>,
}

impl SessionCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Store `value` under `key`, replacing whatever was there.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.store.set(key, &json)
    }

    /// Load the last value saved under `key`.
    ///
    /// Returns `None` when absent. An entry that no longer deserializes as `T`
    /// is dropped and also reported as absent.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Session cache read failed for '{}': {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Discarding corrupt session cache entry '{}': {}", key, e);
                if let Err(e) = self.store.remove(key) {
                    tracing::warn!("Failed to remove corrupt entry '{}': {}", key, e);
                }
                None
            }
        }
    }

    pub fn clear(&self, key: &str) -> Result<(), StoreError> {
        self.store.remove(key)
    }

    /// Drop every cached entry (session end).
    pub fn clear_all(&self) -> Result<(), StoreError> {
        self.store.clear()
    }
}
