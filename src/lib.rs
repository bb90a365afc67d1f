// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Fleet Rentals: station-based bicycle and scooter rental core
//!
//! This crate provides the loan lifecycle (create, extend, complete,
//! cancel), the fare engine, and cache-aside station/transport reads behind
//! a small JSON API.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use cache::{CachedRentalLedger, CachedStationRepository, CachedTransportRepository, MemoryCache};
use config::Config;
use db::MemoryDb;
use services::{Collaborators, FleetService, LoanService, NotificationSink, PaymentGateway};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub cache: Arc<MemoryCache>,
    pub stations: Arc<CachedStationRepository>,
    pub transports: Arc<CachedTransportRepository>,
    pub loans: LoanService,
    pub fleet: FleetService,
}

impl AppState {
    /// Wire the cached repositories and services around `db`.
    pub fn new(
        config: Config,
        db: MemoryDb,
        payments: Arc<dyn PaymentGateway>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        let cache = Arc::new(MemoryCache::new());
        let db = Arc::new(db);
        let ttls = config.cache_ttls;

        let stations = Arc::new(CachedStationRepository::new(
            db.clone(),
            cache.clone(),
            ttls,
        ));
        let transports = Arc::new(CachedTransportRepository::new(
            db.clone(),
            cache.clone(),
            ttls,
        ));
        let ledger = Arc::new(CachedRentalLedger::new(db.clone(), cache.clone(), ttls));

        let loans = LoanService::new(
            Collaborators {
                users: db.clone(),
                stations: stations.clone(),
                transports: transports.clone(),
                loans: db,
                ledger,
                payments,
                notifications,
            },
            config.currency.clone(),
        );
        let fleet = FleetService::new(stations.clone(), transports.clone());

        Self {
            config,
            cache,
            stations,
            transports,
            loans,
            fleet,
        }
    }
}
