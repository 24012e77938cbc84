//! Geohash adapter for geo indexes

use geohash::Coord;

use stored_core::{Result, StoredError};

/// Full geohash length
pub const MAX_PRECISION: usize = 12;

/// Geohash of `(lat, lng)` truncated to `precision` characters
///
/// A precision of [`MAX_PRECISION`] or more yields the full hash.
pub fn encode(lat: f64, lng: f64, precision: usize) -> Result<String> {
    let mut hash = geohash::encode(Coord { x: lng, y: lat }, MAX_PRECISION).map_err(|e| {
        StoredError::invalid_input(format!("invalid coordinates ({}, {}): {}", lat, lng, e))
    })?;
    if precision < hash.len() {
        hash.truncate(precision);
    }
    Ok(hash)
}
