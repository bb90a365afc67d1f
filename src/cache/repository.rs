// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cache-aside decorators for the station and transport stores.
//!
//! Reads go cache first, then the store, populating the cache on a miss.
//! `None` results are not cached. Writes go to the store and, only once the
//! store has accepted them, delete the entity key plus the availability and
//! stats keys the write can affect. List and nearby pages are left to expire.

use crate::cache::{key, Cache, CacheTtls};
use crate::db::{RentalLedger, StationStore, TransportStore};
use crate::error::Result;
use crate::models::{
    Coordinates, Loan, LoanStatus, NearbyStation, NewLoan, NewStation, NewTransport, PageRequest,
    Station, StationAvailability, StationFilter, StationPatch, StationStats, Transport,
    TransportFilter, TransportPatch, TransportStatus,
};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Shared cache-aside mechanics.
#[derive(Clone)]
struct CacheAside {
    cache: Arc<dyn Cache>,
    ttls: CacheTtls,
}

impl CacheAside {
    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(value) => {
                    tracing::debug!(key, "Cache hit");
                    Some(value)
                }
                Err(e) => {
                    tracing::warn!(key, error = %e, "Discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => {
                tracing::debug!(key, "Cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache read failed, using store");
                None
            }
        }
    }

    async fn populate<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };
        if let Err(e) = self.cache.set(key, bytes, ttl).await {
            tracing::warn!(key, error = %e, "Cache write failed");
        }
    }

    /// Read-through for values that always exist.
    async fn fetch<T, F, Fut>(&self, key: String, ttl: Duration, load: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.lookup(&key).await {
            return Ok(value);
        }
        let value = load().await?;
        self.populate(&key, &value, ttl).await;
        Ok(value)
    }

    /// Read-through for lookups that may find nothing.
    async fn fetch_optional<T, F, Fut>(
        &self,
        key: String,
        ttl: Duration,
        load: F,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        if let Some(value) = self.lookup(&key).await {
            return Ok(Some(value));
        }
        let value = load().await?;
        if let Some(found) = &value {
            self.populate(&key, found, ttl).await;
        }
        Ok(value)
    }

    async fn invalidate(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.cache.del(key).await {
                tracing::warn!(key = %key, error = %e, "Cache invalidation failed");
            }
        }
    }

    /// Keys touched by a change to `transport_id` docked at any of `stations`.
    async fn invalidate_transport(&self, transport_id: u64, stations: &[Option<u64>]) {
        let mut keys = vec![key::transport(transport_id), key::station_stats()];
        for station_id in stations.iter().flatten() {
            keys.push(key::station_availability(*station_id));
            keys.push(key::transports_available_at(*station_id));
        }
        keys.sort();
        keys.dedup();
        self.invalidate(&keys).await;
    }

    async fn invalidate_station(&self, station_id: u64) {
        self.invalidate(&[
            key::station(station_id),
            key::station_availability(station_id),
            key::station_stats(),
        ])
        .await;
    }
}

/// [`StationStore`] with a read-through cache.
#[derive(Clone)]
pub struct CachedStationRepository {
    inner: Arc<dyn StationStore>,
    cache: CacheAside,
}

impl CachedStationRepository {
    pub fn new(inner: Arc<dyn StationStore>, cache: Arc<dyn Cache>, ttls: CacheTtls) -> Self {
        Self {
            inner,
            cache: CacheAside { cache, ttls },
        }
    }
}

#[async_trait]
impl StationStore for CachedStationRepository {
    async fn find_by_id(&self, id: u64) -> Result<Option<Station>> {
        let ttl = self.cache.ttls.entity;
        self.cache
            .fetch_optional(key::station(id), ttl, || self.inner.find_by_id(id))
            .await
    }

    async fn find_all(&self, filter: &StationFilter, page: PageRequest) -> Result<Vec<Station>> {
        let ttl = self.cache.ttls.list;
        self.cache
            .fetch(key::station_list(filter, page), ttl, || {
                self.inner.find_all(filter, page)
            })
            .await
    }

    async fn find_nearby(
        &self,
        origin: Coordinates,
        radius_km: f64,
    ) -> Result<Vec<NearbyStation>> {
        let ttl = self.cache.ttls.list;
        self.cache
            .fetch(key::station_nearby(origin, radius_km), ttl, || {
                self.inner.find_nearby(origin, radius_km)
            })
            .await
    }

    async fn get_availability(&self, station_id: u64) -> Result<Option<StationAvailability>> {
        let ttl = self.cache.ttls.availability;
        self.cache
            .fetch_optional(key::station_availability(station_id), ttl, || {
                self.inner.get_availability(station_id)
            })
            .await
    }

    async fn get_stats(&self) -> Result<StationStats> {
        let ttl = self.cache.ttls.list;
        self.cache
            .fetch(key::station_stats(), ttl, || self.inner.get_stats())
            .await
    }

    async fn create(&self, station: NewStation) -> Result<Station> {
        let created = self.inner.create(station).await?;
        self.cache.invalidate_station(created.id).await;
        Ok(created)
    }

    async fn update(&self, id: u64, patch: StationPatch) -> Result<Option<Station>> {
        let updated = self.inner.update(id, patch).await?;
        self.cache.invalidate_station(id).await;
        Ok(updated)
    }

    async fn set_active(&self, id: u64, active: bool) -> Result<Option<Station>> {
        let updated = self.inner.set_active(id, active).await?;
        self.cache.invalidate_station(id).await;
        Ok(updated)
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        let deleted = self.inner.delete(id).await?;
        self.cache.invalidate_station(id).await;
        Ok(deleted)
    }
}

/// [`TransportStore`] with a read-through cache.
#[derive(Clone)]
pub struct CachedTransportRepository {
    inner: Arc<dyn TransportStore>,
    cache: CacheAside,
}

impl CachedTransportRepository {
    pub fn new(inner: Arc<dyn TransportStore>, cache: Arc<dyn Cache>, ttls: CacheTtls) -> Self {
        Self {
            inner,
            cache: CacheAside { cache, ttls },
        }
    }

    /// Current dock of a transport straight from the store.
    async fn stored_station(&self, id: u64) -> Result<Option<u64>> {
        Ok(self
            .inner
            .find_by_id(id)
            .await?
            .and_then(|t| t.current_station_id))
    }
}

#[async_trait]
impl TransportStore for CachedTransportRepository {
    async fn find_by_id(&self, id: u64) -> Result<Option<Transport>> {
        let ttl = self.cache.ttls.entity;
        self.cache
            .fetch_optional(key::transport(id), ttl, || self.inner.find_by_id(id))
            .await
    }

    async fn find_all(&self, filter: &TransportFilter) -> Result<Vec<Transport>> {
        let ttl = self.cache.ttls.list;
        self.cache
            .fetch(key::transport_list(filter), ttl, || {
                self.inner.find_all(filter)
            })
            .await
    }

    async fn find_available_at(&self, station_id: u64) -> Result<Vec<Transport>> {
        let ttl = self.cache.ttls.availability;
        self.cache
            .fetch(key::transports_available_at(station_id), ttl, || {
                self.inner.find_available_at(station_id)
            })
            .await
    }

    async fn create(&self, transport: NewTransport) -> Result<Transport> {
        let created = self.inner.create(transport).await?;
        self.cache
            .invalidate_transport(created.id, &[created.current_station_id])
            .await;
        Ok(created)
    }

    async fn update(&self, id: u64, patch: TransportPatch) -> Result<Option<Transport>> {
        let updated = self.inner.update(id, patch).await?;
        let station = updated.as_ref().and_then(|t| t.current_station_id);
        self.cache.invalidate_transport(id, &[station]).await;
        Ok(updated)
    }

    async fn update_status(
        &self,
        id: u64,
        expected: TransportStatus,
        status: TransportStatus,
    ) -> Result<Option<Transport>> {
        let updated = self.inner.update_status(id, expected, status).await?;
        let station = updated.as_ref().and_then(|t| t.current_station_id);
        self.cache.invalidate_transport(id, &[station]).await;
        Ok(updated)
    }

    async fn update_station(&self, id: u64, station_id: u64) -> Result<Option<Transport>> {
        let previous = self.stored_station(id).await?;
        let updated = self.inner.update_station(id, station_id).await?;
        self.cache
            .invalidate_transport(id, &[previous, Some(station_id)])
            .await;
        Ok(updated)
    }

    async fn update_battery_level(&self, id: u64, level: u8) -> Result<Option<Transport>> {
        let updated = self.inner.update_battery_level(id, level).await?;
        let station = updated.as_ref().and_then(|t| t.current_station_id);
        self.cache.invalidate_transport(id, &[station]).await;
        Ok(updated)
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        let previous = self.stored_station(id).await?;
        let deleted = self.inner.delete(id).await?;
        self.cache.invalidate_transport(id, &[previous]).await;
        Ok(deleted)
    }
}

/// [`RentalLedger`] that invalidates the transport and station keys a
/// committed rental write has made stale.
#[derive(Clone)]
pub struct CachedRentalLedger {
    inner: Arc<dyn RentalLedger>,
    cache: CacheAside,
}

impl CachedRentalLedger {
    pub fn new(inner: Arc<dyn RentalLedger>, cache: Arc<dyn Cache>, ttls: CacheTtls) -> Self {
        Self {
            inner,
            cache: CacheAside { cache, ttls },
        }
    }
}

#[async_trait]
impl RentalLedger for CachedRentalLedger {
    async fn open_loan(&self, new: NewLoan) -> Result<Loan> {
        let origin = new.origin_station_id;
        let loan = self.inner.open_loan(new).await?;
        self.cache
            .invalidate_transport(loan.transport_id, &[Some(origin)])
            .await;
        Ok(loan)
    }

    async fn close_loan(
        &self,
        loan: &Loan,
        expected: LoanStatus,
        dock_station_id: u64,
    ) -> Result<Loan> {
        let closed = self.inner.close_loan(loan, expected, dock_station_id).await?;
        self.cache
            .invalidate_transport(closed.transport_id, &[Some(dock_station_id)])
            .await;
        Ok(closed)
    }
}
