//! # Positions
//!
//! [`Coordinates`] is what a client submits; [`GeoPosition`] is what the
//! store holds for a user after an upsert.
//!
//! Coordinates are WGS 84 degrees (SRID 4326), longitude first. No range
//! check is applied here: values outside `[-180, 180]` / `[-90, 90]` are
//! passed through to the store as submitted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::identity::UserId;

/// A longitude/latitude pair in degrees.
///
/// Missing or `null` fields in a JSON payload decode as `0.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Coordinates {
    /// Degrees east of the prime meridian.
    #[serde(deserialize_with = "null_as_zero")]
    pub longitude: f64,
    /// Degrees north of the equator.
    #[serde(deserialize_with = "null_as_zero")]
    pub latitude: f64,
}

fn null_as_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

impl Coordinates {
    /// Build a coordinate pair.
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

/// The latest known position of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    /// Owner of the position.
    pub user: UserId,
    /// Last submitted coordinates.
    pub coordinates: Coordinates,
    /// Server-assigned time of the last write.
    pub updated_at: DateTime<Utc>,
}
