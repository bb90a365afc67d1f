// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-through caching in front of the station and transport stores.
//!
//! [`Cache`] is a plain byte-oriented key-value store with per-entry TTL.
//! The repositories in [`repository`] layer the cache-aside protocol on top
//! of it: read from the cache, fall back to the store and populate on a
//! miss, and delete affected keys after every successful write.

pub mod key;
pub mod memory;
pub mod repository;

pub use memory::{CacheStats, MemoryCache};
pub use repository::{CachedRentalLedger, CachedStationRepository, CachedTransportRepository};

use async_trait::async_trait;
use std::time::Duration;

/// Cache errors. These never reach callers of the repositories; a failing
/// cache only costs a trip to the store.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Key-value cache with per-entry expiry.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    async fn del(&self, key: &str) -> Result<(), CacheError>;
}

/// Time-to-live per class of cached read.
///
/// Expected ordering is `entity > list > availability`, since availability
/// moves with every rental.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub entity: Duration,
    pub list: Duration,
    pub availability: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            entity: Duration::from_secs(300),
            list: Duration::from_secs(60),
            availability: Duration::from_secs(15),
        }
    }
}
