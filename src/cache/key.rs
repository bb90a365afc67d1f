// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cache key builders.
//!
//! Keys have the shape `resource:operation[:params]`. Filter objects are
//! folded into a short SHA-256 digest of their JSON form so equal filters
//! always map to the same key.

use crate::models::{Coordinates, PageRequest, StationFilter, TransportFilter};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Hex characters of the digest kept in a key.
const PARAMS_HASH_LEN: usize = 16;

fn hash_params<T: Serialize>(params: &T) -> String {
    let json = serde_json::to_vec(params).unwrap_or_default();
    let digest = hex::encode(Sha256::digest(&json));
    digest[..PARAMS_HASH_LEN].to_string()
}

pub fn station(id: u64) -> String {
    format!("station:find_by_id:{}", id)
}

pub fn station_list(filter: &StationFilter, page: PageRequest) -> String {
    format!(
        "station:find_all:{}:{}:{}",
        hash_params(filter),
        page.page,
        page.per_page
    )
}

pub fn station_nearby(origin: Coordinates, radius_km: f64) -> String {
    format!(
        "station:find_nearby:{:.6}:{:.6}:{:.3}",
        origin.latitude, origin.longitude, radius_km
    )
}

pub fn station_availability(station_id: u64) -> String {
    format!("station:availability:{}", station_id)
}

pub fn station_stats() -> String {
    "station:stats".to_string()
}

pub fn transport(id: u64) -> String {
    format!("transport:find_by_id:{}", id)
}

pub fn transport_list(filter: &TransportFilter) -> String {
    format!("transport:find_all:{}", hash_params(filter))
}

pub fn transports_available_at(station_id: u64) -> String {
    format!("transport:available_at:{}", station_id)
}
