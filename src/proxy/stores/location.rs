// Latest-known-location cache, fed by browser geolocation reports and read
// by the stream rewriter when it substitutes get_current_place responses.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("invalid location payload: {0}")]
    Invalid(String),
}

/// A single geolocation report. `accuracy` is a radius in meters; browsers
/// omit it sometimes, in which case it defaults to zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub accuracy: f64,
}

/// Per-source cache of the most recent successfully stored location.
/// Records are whole-record atomic (a reader never sees the lat of one
/// report and the lng of another) and live for the process lifetime.
#[derive(Debug, Default)]
pub struct LocationStore {
    records: DashMap<String, LocationRecord>,
}

impl LocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a raw location report for `key`, overwriting any
    /// previous record. `lat`/`lng` must be present and numeric.
    pub fn put_json(&self, key: &str, payload: &Value) -> Result<LocationRecord, LocationError> {
        let record: LocationRecord = serde_json::from_value(payload.clone())
            .map_err(|e| LocationError::Invalid(e.to_string()))?;
        self.records.insert(key.to_string(), record);
        Ok(record)
    }

    /// The last stored record for `key`, or `None` if this source has never
    /// reported — never a stale default.
    pub fn get(&self, key: &str) -> Option<LocationRecord> {
        self.records.get(key).map(|r| *r)
    }
}
