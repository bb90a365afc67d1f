// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Station model plus the read models derived from it.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Largest capacity a single station may declare.
pub const MAX_STATION_CAPACITY: u32 = 100;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A geographic point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Great-circle distance in kilometres (haversine).
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

/// A fixed docking location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: u64,
    pub name: String,
    pub address: String,
    pub coordinates: Coordinates,
    /// Advisory maximum number of docked transports
    pub capacity: u32,
    pub is_active: bool,
}

impl Station {
    /// Check capacity is within (0, 100].
    pub fn validate_capacity(capacity: u32) -> Result<()> {
        if capacity == 0 || capacity > MAX_STATION_CAPACITY {
            return Err(AppError::InvalidCapacity(capacity));
        }
        Ok(())
    }
}

/// Fields required to register a station.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStation {
    pub name: String,
    pub address: String,
    pub coordinates: Coordinates,
    pub capacity: u32,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StationPatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub capacity: Option<u32>,
}

/// Listing filter. Serialized into the cache key, so field order matters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StationFilter {
    pub active_only: bool,
    /// Case-insensitive substring of the station name
    pub name_contains: Option<String>,
    pub min_capacity: Option<u32>,
}

impl StationFilter {
    pub fn matches(&self, station: &Station) -> bool {
        if self.active_only && !station.is_active {
            return false;
        }
        if let Some(needle) = &self.name_contains {
            if !station
                .name
                .to_lowercase()
                .contains(&needle.to_lowercase())
            {
                return false;
            }
        }
        if let Some(min) = self.min_capacity {
            if station.capacity < min {
                return false;
            }
        }
        true
    }
}

/// Page request for list endpoints (1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 50,
        }
    }
}

impl PageRequest {
    pub fn offset(&self) -> usize {
        (self.page.max(1) as usize - 1) * self.per_page as usize
    }
}

/// A station near a query point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyStation {
    pub station: Station,
    pub distance_km: f64,
}

/// Live occupancy of one station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationAvailability {
    pub station_id: u64,
    pub capacity: u32,
    /// Transports docked and rentable right now
    pub available: u32,
    /// All transports docked, whatever their status
    pub docked: u32,
    /// Rentable transports per kind ("bicycle", "electric_scooter")
    pub available_by_kind: BTreeMap<String, u32>,
    /// `capacity - docked`, floored at zero
    pub free_docks: u32,
}

/// Network-wide aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StationStats {
    pub total_stations: u32,
    pub active_stations: u32,
    pub total_capacity: u32,
    pub available_transports: u32,
    pub transports_in_use: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_bounds() {
        assert!(Station::validate_capacity(0).is_err());
        assert!(Station::validate_capacity(1).is_ok());
        assert!(Station::validate_capacity(100).is_ok());
        assert!(matches!(
            Station::validate_capacity(101),
            Err(AppError::InvalidCapacity(101))
        ));
    }

    #[test]
    fn test_distance_km_known_pair() {
        // Plaza de Bolívar to Parque de la 93, Bogotá: roughly 9.3 km
        let a = Coordinates {
            latitude: 4.5981,
            longitude: -74.0760,
        };
        let b = Coordinates {
            latitude: 4.6767,
            longitude: -74.0483,
        };
        let d = a.distance_km(&b);
        assert!((d - 9.27).abs() < 0.3, "unexpected distance {}", d);
    }

    #[test]
    fn test_page_offset() {
        let page = PageRequest {
            page: 3,
            per_page: 20,
        };
        assert_eq!(page.offset(), 40);
        assert_eq!(PageRequest { page: 0, per_page: 20 }.offset(), 0);
    }
}
