// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fleet administration: provisioning, maintenance and rebalancing.
//!
//! Status changes are checked against the transport state machine locally
//! and then written with a compare-and-set, so an admin action racing a
//! rental fails instead of clobbering it.

use crate::db::{StationStore, TransportStore};
use crate::error::{AppError, Result};
use crate::models::{
    Money, NewStation, NewTransport, Station, StationPatch, Transport, TransportKind,
    TransportPatch,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct FleetService {
    stations: Arc<dyn StationStore>,
    transports: Arc<dyn TransportStore>,
}

impl FleetService {
    pub fn new(stations: Arc<dyn StationStore>, transports: Arc<dyn TransportStore>) -> Self {
        Self {
            stations,
            transports,
        }
    }

    async fn load_transport(&self, id: u64) -> Result<Transport> {
        self.transports
            .find_by_id(id)
            .await?
            .ok_or(AppError::TransportNotFound(id))
    }

    async fn ensure_station(&self, id: u64) -> Result<Station> {
        self.stations
            .find_by_id(id)
            .await?
            .ok_or(AppError::StationNotFound(id))
    }

    /// Run a state-machine step on a copy, then persist the new status.
    async fn transition<F>(&self, id: u64, step: F) -> Result<Transport>
    where
        F: FnOnce(&mut Transport) -> Result<()>,
    {
        let current = self.load_transport(id).await?;
        let mut next = current.clone();
        step(&mut next)?;

        let updated = self
            .transports
            .update_status(id, current.status, next.status)
            .await?
            .ok_or(AppError::TransportNotFound(id))?;

        tracing::info!(
            transport_id = id,
            from = %current.status,
            to = %updated.status,
            "Transport status changed"
        );
        Ok(updated)
    }

    // ─── Transports ──────────────────────────────────────────────────

    pub async fn register_transport(&self, new: NewTransport) -> Result<Transport> {
        if new.hourly_rate.is_negative() {
            return Err(AppError::InvalidAmount(format!(
                "hourly rate {} is negative",
                new.hourly_rate
            )));
        }
        if let TransportKind::ElectricScooter { battery_level, .. } = new.kind {
            if battery_level > 100 {
                return Err(AppError::InvalidBatteryLevel(i32::from(battery_level)));
            }
        }
        self.ensure_station(new.station_id).await?;

        let transport = self.transports.create(new).await?;
        tracing::info!(
            transport_id = transport.id,
            kind = transport.kind.label(),
            station_id = ?transport.current_station_id,
            "Transport registered"
        );
        Ok(transport)
    }

    pub async fn update_hourly_rate(&self, id: u64, hourly_rate: Money) -> Result<Transport> {
        if hourly_rate.is_negative() {
            return Err(AppError::InvalidAmount(format!(
                "hourly rate {} is negative",
                hourly_rate
            )));
        }
        self.transports
            .update(
                id,
                TransportPatch {
                    hourly_rate: Some(hourly_rate),
                },
            )
            .await?
            .ok_or(AppError::TransportNotFound(id))
    }

    pub async fn send_to_maintenance(&self, id: u64) -> Result<Transport> {
        self.transition(id, Transport::send_to_maintenance).await
    }

    pub async fn return_from_maintenance(&self, id: u64) -> Result<Transport> {
        self.transition(id, Transport::return_from_maintenance).await
    }

    pub async fn retire(&self, id: u64) -> Result<Transport> {
        self.transition(id, Transport::retire).await
    }

    pub async fn restore_for_repair(&self, id: u64) -> Result<Transport> {
        self.transition(id, Transport::restore_for_repair).await
    }

    pub async fn update_battery_level(&self, id: u64, level: i32) -> Result<Transport> {
        let mut transport = self.load_transport(id).await?;
        transport.update_battery_level(level)?;
        let level = transport.battery_level().unwrap_or_default();

        self.transports
            .update_battery_level(id, level)
            .await?
            .ok_or(AppError::TransportNotFound(id))
    }

    /// Move an idle transport to another station.
    pub async fn relocate(&self, id: u64, station_id: u64) -> Result<Transport> {
        self.ensure_station(station_id).await?;
        let transport = self
            .transports
            .update_station(id, station_id)
            .await?
            .ok_or(AppError::TransportNotFound(id))?;
        tracing::info!(transport_id = id, station_id, "Transport relocated");
        Ok(transport)
    }

    pub async fn remove_transport(&self, id: u64) -> Result<()> {
        if !self.transports.delete(id).await? {
            return Err(AppError::TransportNotFound(id));
        }
        tracing::info!(transport_id = id, "Transport removed");
        Ok(())
    }

    // ─── Stations ────────────────────────────────────────────────────

    pub async fn register_station(&self, new: NewStation) -> Result<Station> {
        let station = self.stations.create(new).await?;
        tracing::info!(station_id = station.id, name = %station.name, "Station registered");
        Ok(station)
    }

    pub async fn update_station(&self, id: u64, patch: StationPatch) -> Result<Station> {
        self.stations
            .update(id, patch)
            .await?
            .ok_or(AppError::StationNotFound(id))
    }

    pub async fn set_station_active(&self, id: u64, active: bool) -> Result<Station> {
        let station = self
            .stations
            .set_active(id, active)
            .await?
            .ok_or(AppError::StationNotFound(id))?;
        tracing::info!(station_id = id, active, "Station activation changed");
        Ok(station)
    }

    pub async fn remove_station(&self, id: u64) -> Result<()> {
        if !self.stations.delete(id).await? {
            return Err(AppError::StationNotFound(id));
        }
        tracing::info!(station_id = id, "Station removed");
        Ok(())
    }
}
