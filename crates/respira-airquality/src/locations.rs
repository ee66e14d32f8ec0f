//! Registry of known monitoring locations.
//!
//! All registry entries belong to a single metropolitan deployment. Ids
//! outside the registry are still fetchable; they just render a fallback
//! display name.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier a monitoring location is addressed by upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(pub u32);

impl LocationId {
    /// Raw numeric id, as the upstream API expects it.
    #[must_use]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for LocationId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// A monitoring location known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Upstream identifier.
    pub id: LocationId,
    /// Display name.
    pub name: &'static str,
}

/// City every registry location reports from.
pub const CITY: &str = "Bengaluru";

/// Country every registry location reports from.
pub const COUNTRY: &str = "India";

/// Location queried when the caller does not pick one.
pub const DEFAULT_LOCATION: LocationId = LocationId(5574);

/// The known monitoring locations.
pub const LOCATIONS: [Location; 6] = [
    Location { id: LocationId(5574), name: "City Railway Station" },
    Location { id: LocationId(6984), name: "Hebbal" },
    Location { id: LocationId(5644), name: "Basaveshwara Nagar" },
    Location { id: LocationId(6983), name: "Jayanagar" },
    Location { id: LocationId(5548), name: "JP Nagar" },
    Location { id: LocationId(6975), name: "Silk Board" },
];

/// Look up a registry entry by id.
#[must_use]
pub fn get_location(id: LocationId) -> Option<&'static Location> {
    LOCATIONS.iter().find(|location| location.id == id)
}

/// Display name for a location, with a fallback for ids outside the registry.
#[must_use]
pub fn location_name(id: LocationId) -> &'static str {
    get_location(id).map_or("Unknown", |location| location.name)
}
