// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Transport model and its lifecycle state machine.
//!
//! ```text
//!   available ──start_rental──▶ in_use ──end_rental(station)──▶ available
//!   available ◀──────────────▶ maintenance
//!   available, maintenance ───▶ out_of_service ───▶ maintenance
//! ```
//!
//! The station reference is `None` exactly while the transport is `in_use`.
//! Status and station are only changed through the methods below.

use crate::error::{AppError, Result};
use crate::models::Money;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Electric scooters need strictly more charge than this to be rented.
pub const MIN_RENTABLE_BATTERY: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportStatus {
    Available,
    InUse,
    Maintenance,
    OutOfService,
}

impl TransportStatus {
    /// Transitions reachable through [`Transport::transition_to`].
    ///
    /// `InUse -> Available` is deliberately absent: a rental can only end
    /// through [`Transport::end_rental`], which also docks the transport.
    pub fn can_transition_to(&self, target: TransportStatus) -> bool {
        use TransportStatus::*;
        matches!(
            (self, target),
            (Available, InUse)
                | (Available, Maintenance)
                | (Maintenance, Available)
                | (Available, OutOfService)
                | (Maintenance, OutOfService)
                | (OutOfService, Maintenance)
        )
    }
}

impl fmt::Display for TransportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportStatus::Available => "available",
            TransportStatus::InUse => "in_use",
            TransportStatus::Maintenance => "maintenance",
            TransportStatus::OutOfService => "out_of_service",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrakeType {
    Rim,
    Disc,
    Coaster,
}

/// Kind-specific attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportKind {
    Bicycle {
        gear_count: u8,
        brake_type: BrakeType,
    },
    ElectricScooter {
        /// Percent, 0..=100
        battery_level: u8,
        max_speed_kmh: u16,
        range_km: u16,
    },
}

impl TransportKind {
    /// Short label used in availability breakdowns.
    pub fn label(&self) -> &'static str {
        match self {
            TransportKind::Bicycle { .. } => "bicycle",
            TransportKind::ElectricScooter { .. } => "electric_scooter",
        }
    }
}

/// A rentable vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transport {
    pub id: u64,
    pub kind: TransportKind,
    pub status: TransportStatus,
    /// Docking station; `None` while in transit
    pub current_station_id: Option<u64>,
    pub hourly_rate: Money,
}

impl Transport {
    /// Whether a rider could check this transport out right now.
    pub fn can_be_rented(&self) -> bool {
        let base = self.status == TransportStatus::Available && self.current_station_id.is_some();
        match self.kind {
            TransportKind::Bicycle { .. } => base,
            TransportKind::ElectricScooter { battery_level, .. } => {
                base && battery_level > MIN_RENTABLE_BATTERY
            }
        }
    }

    pub fn battery_level(&self) -> Option<u8> {
        match self.kind {
            TransportKind::ElectricScooter { battery_level, .. } => Some(battery_level),
            TransportKind::Bicycle { .. } => None,
        }
    }

    /// [`Transport::can_be_rented`] as an error naming what is missing.
    pub fn ensure_rentable(&self) -> Result<()> {
        if self.can_be_rented() {
            return Ok(());
        }
        match self.battery_level() {
            Some(battery_level) if self.status == TransportStatus::Available => {
                Err(AppError::BatteryTooLow {
                    transport_id: self.id,
                    battery_level,
                })
            }
            _ => Err(AppError::TransportNotAvailable {
                transport_id: self.id,
                status: self.status,
            }),
        }
    }

    /// Generic guarded transition for the non-rental edges.
    ///
    /// Entering `in_use` must go through [`Transport::start_rental`].
    pub fn transition_to(&mut self, target: TransportStatus) -> Result<()> {
        if target == TransportStatus::InUse || !self.status.can_transition_to(target) {
            return Err(AppError::IllegalTransportTransition {
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        Ok(())
    }

    /// `available -> in_use`; the transport leaves its station.
    pub fn start_rental(&mut self) -> Result<()> {
        if !self.status.can_transition_to(TransportStatus::InUse) {
            return Err(AppError::IllegalTransportTransition {
                from: self.status,
                to: TransportStatus::InUse,
            });
        }
        self.status = TransportStatus::InUse;
        self.current_station_id = None;
        Ok(())
    }

    /// `in_use -> available`, docked at `station_id`.
    pub fn end_rental(&mut self, station_id: u64) -> Result<()> {
        if self.status != TransportStatus::InUse {
            return Err(AppError::IllegalTransportTransition {
                from: self.status,
                to: TransportStatus::Available,
            });
        }
        self.status = TransportStatus::Available;
        self.current_station_id = Some(station_id);
        Ok(())
    }

    pub fn send_to_maintenance(&mut self) -> Result<()> {
        self.transition_to(TransportStatus::Maintenance)
    }

    pub fn return_from_maintenance(&mut self) -> Result<()> {
        if self.status == TransportStatus::Maintenance && self.current_station_id.is_none() {
            return Err(AppError::BadRequest(format!(
                "Transport {} has no station to return to",
                self.id
            )));
        }
        self.transition_to(TransportStatus::Available)
    }

    pub fn retire(&mut self) -> Result<()> {
        self.transition_to(TransportStatus::OutOfService)
    }

    pub fn restore_for_repair(&mut self) -> Result<()> {
        self.transition_to(TransportStatus::Maintenance)
    }

    /// Re-dock an idle transport at another station (fleet rebalancing).
    pub fn relocate(&mut self, station_id: u64) -> Result<()> {
        if self.status == TransportStatus::InUse {
            return Err(AppError::IllegalTransportTransition {
                from: self.status,
                to: TransportStatus::Available,
            });
        }
        self.current_station_id = Some(station_id);
        Ok(())
    }

    pub fn update_battery_level(&mut self, level: i32) -> Result<()> {
        let TransportKind::ElectricScooter { battery_level, .. } = &mut self.kind else {
            return Err(AppError::BadRequest(format!(
                "Transport {} has no battery",
                self.id
            )));
        };
        if !(0..=100).contains(&level) {
            return Err(AppError::InvalidBatteryLevel(level));
        }
        *battery_level = level as u8;
        Ok(())
    }
}

/// Fields required to provision a transport. New transports start `available`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransport {
    pub kind: TransportKind,
    pub station_id: u64,
    pub hourly_rate: Money,
}

/// Partial update of pricing fields. Status, station and battery have their
/// own guarded writes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransportPatch {
    pub hourly_rate: Option<Money>,
}

/// Listing filter. Serialized into the cache key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportFilter {
    pub status: Option<TransportStatus>,
    pub station_id: Option<u64>,
    /// "bicycle" or "electric_scooter"
    pub kind: Option<String>,
}

impl TransportFilter {
    pub fn matches(&self, transport: &Transport) -> bool {
        self.status.map_or(true, |s| transport.status == s)
            && self
                .station_id
                .map_or(true, |id| transport.current_station_id == Some(id))
            && self
                .kind
                .as_deref()
                .map_or(true, |k| transport.kind.label() == k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scooter(battery_level: u8) -> Transport {
        Transport {
            id: 7,
            kind: TransportKind::ElectricScooter {
                battery_level,
                max_speed_kmh: 25,
                range_km: 30,
            },
            status: TransportStatus::Available,
            current_station_id: Some(1),
            hourly_rate: Money::from_units(4000),
        }
    }

    fn bicycle() -> Transport {
        Transport {
            id: 3,
            kind: TransportKind::Bicycle {
                gear_count: 7,
                brake_type: BrakeType::Disc,
            },
            status: TransportStatus::Available,
            current_station_id: Some(1),
            hourly_rate: Money::from_units(3000),
        }
    }

    #[test]
    fn test_scooter_at_ten_percent_is_not_rentable() {
        assert!(!scooter(10).can_be_rented());
        assert!(scooter(11).can_be_rented());
    }

    #[test]
    fn test_ensure_rentable_names_the_reason() {
        assert!(matches!(
            scooter(10).ensure_rentable(),
            Err(AppError::BatteryTooLow {
                transport_id: 7,
                battery_level: 10
            })
        ));

        let mut t = scooter(5);
        t.send_to_maintenance().unwrap();
        assert!(matches!(
            t.ensure_rentable(),
            Err(AppError::TransportNotAvailable {
                status: TransportStatus::Maintenance,
                ..
            })
        ));
        assert!(bicycle().ensure_rentable().is_ok());
    }

    #[test]
    fn test_rental_round_trip_moves_station() {
        let mut t = bicycle();
        t.start_rental().unwrap();
        assert_eq!(t.status, TransportStatus::InUse);
        assert_eq!(t.current_station_id, None);

        t.end_rental(9).unwrap();
        assert_eq!(t.status, TransportStatus::Available);
        assert_eq!(t.current_station_id, Some(9));
    }

    #[test]
    fn test_in_use_cannot_enter_maintenance_or_retire() {
        let mut t = bicycle();
        t.start_rental().unwrap();
        assert!(matches!(
            t.send_to_maintenance(),
            Err(AppError::IllegalTransportTransition { .. })
        ));
        assert!(matches!(
            t.retire(),
            Err(AppError::IllegalTransportTransition { .. })
        ));
        assert_eq!(t.status, TransportStatus::InUse);
    }

    #[test]
    fn test_in_use_cannot_become_available_without_end_rental() {
        let mut t = bicycle();
        t.start_rental().unwrap();
        assert!(t.transition_to(TransportStatus::Available).is_err());
    }

    #[test]
    fn test_transition_to_in_use_is_rejected() {
        let mut t = bicycle();
        assert!(t.transition_to(TransportStatus::InUse).is_err());
        assert_eq!(t.status, TransportStatus::Available);
    }

    #[test]
    fn test_end_rental_requires_in_use() {
        let mut t = bicycle();
        assert!(t.end_rental(2).is_err());
    }

    #[test]
    fn test_maintenance_cycle() {
        let mut t = bicycle();
        t.send_to_maintenance().unwrap();
        t.retire().unwrap();
        assert_eq!(t.status, TransportStatus::OutOfService);
        assert!(t.return_from_maintenance().is_err());
        t.restore_for_repair().unwrap();
        t.return_from_maintenance().unwrap();
        assert_eq!(t.status, TransportStatus::Available);
        assert_eq!(t.current_station_id, Some(1));
    }

    #[test]
    fn test_battery_level_bounds() {
        let mut t = scooter(50);
        assert!(matches!(
            t.update_battery_level(101),
            Err(AppError::InvalidBatteryLevel(101))
        ));
        assert!(matches!(
            t.update_battery_level(-1),
            Err(AppError::InvalidBatteryLevel(-1))
        ));
        t.update_battery_level(100).unwrap();
        assert_eq!(t.battery_level(), Some(100));

        assert!(bicycle().update_battery_level(50).is_err());
    }

    #[test]
    fn test_filter_matches_kind_label() {
        let filter = TransportFilter {
            kind: Some("electric_scooter".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&scooter(80)));
        assert!(!filter.matches(&bicycle()));
    }
}
