//! Location-keyed, time-expiring measurement cache.
//!
//! Entries are never deleted explicitly; they are invalidated by age at
//! read time, and by being overwritten on the next successful fetch. A
//! read inside the validity window returns exactly what was stored, so
//! repeated reads are idempotent.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::locations::LocationId;

/// Validity window applied when no explicit TTL is configured.
pub const DEFAULT_TTL_SECS: u64 = 300;

/// A raw measurement as captured by a monitoring location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    /// Pollutant concentration in µg/m³, as reported upstream.
    pub value: f64,
    /// When the measurement was captured.
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct CachedMeasurement {
    measurement: Measurement,
    stored_at: DateTime<Utc>,
}

/// Time-expiring store of the latest measurement per location.
///
/// An entry is valid while `now - stored_at < ttl`, strictly: an entry
/// aged exactly the TTL is already expired. Storing for a location that
/// already has an entry replaces it and restarts the window.
#[derive(Debug)]
pub struct MeasurementCache {
    entries: Mutex<HashMap<LocationId, CachedMeasurement>>,
    ttl: TimeDelta,
}

impl MeasurementCache {
    /// Cache with the default five-minute TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl_secs(DEFAULT_TTL_SECS)
    }

    /// Cache with an explicit TTL in seconds.
    #[must_use]
    pub fn with_ttl_secs(secs: u64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: TimeDelta::seconds(secs as i64),
        }
    }

    /// Stored measurement for `location`, if present and unexpired.
    ///
    /// Does not trigger a fetch on miss; that is the data service's job.
    #[must_use]
    pub fn get(&self, location: LocationId) -> Option<Measurement> {
        self.get_at(location, Utc::now())
    }

    /// Clock-injected variant of [`get`](Self::get).
    #[must_use]
    pub fn get_at(&self, location: LocationId, now: DateTime<Utc>) -> Option<Measurement> {
        let entries = self.entries.lock();
        let entry = entries.get(&location)?;
        if now.signed_duration_since(entry.stored_at) < self.ttl {
            Some(entry.measurement)
        } else {
            None
        }
    }

    /// Store a measurement for `location`, replacing any previous entry.
    pub fn put(&self, location: LocationId, measurement: Measurement) {
        self.put_at(location, measurement, Utc::now());
    }

    /// Clock-injected variant of [`put`](Self::put).
    pub fn put_at(&self, location: LocationId, measurement: Measurement, now: DateTime<Utc>) {
        let _ = self
            .entries
            .lock()
            .insert(location, CachedMeasurement { measurement, stored_at: now });
    }

    /// Number of stored entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True when nothing has been stored yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for MeasurementCache {
    fn default() -> Self {
        Self::new()
    }
}
