// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistence layer.
//!
//! The rental core talks to storage only through the traits below, so the
//! in-memory implementation can be swapped for a database-backed one and
//! decorated by the cache-aside wrappers in [`crate::cache`].
//!
//! Writes that must not interleave with a rental take the value they expect
//! to overwrite and fail with a conflict if the stored row has moved on.

pub mod memory;

pub use memory::{FixtureError, MemoryDb};

use crate::error::Result;
use crate::models::{
    Coordinates, Loan, LoanStatus, NearbyStation, NewLoan, NewStation, NewTransport, PageRequest,
    Station, StationAvailability, StationFilter, StationPatch, StationStats, Transport,
    TransportFilter, TransportPatch, TransportStatus, User,
};
use async_trait::async_trait;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: u64) -> Result<Option<User>>;

    /// Whether the user holds an active or extended loan.
    async fn has_active_loan(&self, user_id: u64) -> Result<bool>;
}

#[async_trait]
pub trait StationStore: Send + Sync {
    async fn find_by_id(&self, id: u64) -> Result<Option<Station>>;

    async fn find_all(&self, filter: &StationFilter, page: PageRequest) -> Result<Vec<Station>>;

    /// Active stations within `radius_km` of `origin`, nearest first.
    async fn find_nearby(&self, origin: Coordinates, radius_km: f64)
        -> Result<Vec<NearbyStation>>;

    async fn get_availability(&self, station_id: u64) -> Result<Option<StationAvailability>>;

    async fn get_stats(&self) -> Result<StationStats>;

    async fn create(&self, station: NewStation) -> Result<Station>;

    async fn update(&self, id: u64, patch: StationPatch) -> Result<Option<Station>>;

    async fn set_active(&self, id: u64, active: bool) -> Result<Option<Station>>;

    /// Returns `false` if there was nothing to delete.
    async fn delete(&self, id: u64) -> Result<bool>;
}

#[async_trait]
pub trait TransportStore: Send + Sync {
    async fn find_by_id(&self, id: u64) -> Result<Option<Transport>>;

    async fn find_all(&self, filter: &TransportFilter) -> Result<Vec<Transport>>;

    /// Transports docked at `station_id` that can be rented right now.
    async fn find_available_at(&self, station_id: u64) -> Result<Vec<Transport>>;

    async fn create(&self, transport: NewTransport) -> Result<Transport>;

    async fn update(&self, id: u64, patch: TransportPatch) -> Result<Option<Transport>>;

    /// Compare-and-set on status. Fails with a conflict if the stored status
    /// is not `expected`.
    async fn update_status(
        &self,
        id: u64,
        expected: TransportStatus,
        status: TransportStatus,
    ) -> Result<Option<Transport>>;

    /// Re-dock an idle transport. Fails with a conflict while it is in use.
    async fn update_station(&self, id: u64, station_id: u64) -> Result<Option<Transport>>;

    async fn update_battery_level(&self, id: u64, level: u8) -> Result<Option<Transport>>;

    /// Fails with a conflict while the transport is in use.
    async fn delete(&self, id: u64) -> Result<bool>;
}

#[async_trait]
pub trait LoanStore: Send + Sync {
    /// Persist a new loan outside of a rental unit of work.
    async fn save(&self, loan: NewLoan) -> Result<Loan>;

    async fn find_by_id(&self, id: u64) -> Result<Option<Loan>>;

    /// Overwrite a loan whose stored status is still `expected`.
    async fn update(&self, loan: &Loan, expected: LoanStatus) -> Result<Loan>;

    async fn has_active_loans(&self, user_id: u64) -> Result<bool>;

    /// All loans of a user, newest first.
    async fn find_by_user(&self, user_id: u64) -> Result<Vec<Loan>>;
}

/// Unit of work for the writes that span a loan and its transport.
///
/// Each method re-validates the stored state and applies both writes or
/// neither. Only the transport's status and station are touched; every
/// other field of the stored row is left as it is.
#[async_trait]
pub trait RentalLedger: Send + Sync {
    /// Insert an `active` loan and move `new.transport_id` to `in_use`.
    ///
    /// Fails if the user already has an open loan, or if the stored transport
    /// is no longer rentable at `new.origin_station_id`.
    async fn open_loan(&self, new: NewLoan) -> Result<Loan>;

    /// Store a closed `loan` (completed or cancelled) and dock its transport
    /// at `dock_station_id`.
    ///
    /// Fails if the stored loan status is not `expected` or the stored
    /// transport is not `in_use`.
    async fn close_loan(&self, loan: &Loan, expected: LoanStatus, dock_station_id: u64)
        -> Result<Loan>;
}
