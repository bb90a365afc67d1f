// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Station routes. Reads are served through the cache.

use crate::db::{StationStore, TransportStore};
use crate::error::{AppError, Result};
use crate::models::{
    Coordinates, NearbyStation, NewStation, PageRequest, Station, StationAvailability,
    StationFilter, StationPatch, StationStats, Transport,
};
use crate::routes::validated;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

const DEFAULT_NEARBY_RADIUS_KM: f64 = 1.0;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/stations", get(list_stations).post(create_station))
        .route("/api/stations/nearby", get(nearby_stations))
        .route("/api/stations/stats", get(station_stats))
        .route(
            "/api/stations/{id}",
            get(get_station).patch(update_station).delete(delete_station),
        )
        .route("/api/stations/{id}/activate", post(activate_station))
        .route("/api/stations/{id}/deactivate", post(deactivate_station))
        .route("/api/stations/{id}/availability", get(station_availability))
        .route("/api/stations/{id}/transports", get(available_transports))
}

// ─── Queries & Bodies ────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct StationListQuery {
    #[serde(default)]
    pub active_only: bool,
    pub name: Option<String>,
    pub min_capacity: Option<u32>,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NearbyQuery {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lon: f64,
    #[validate(range(min = 0.0, max = 50.0))]
    pub radius_km: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateStationRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub address: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[validate(range(min = 1, max = 100))]
    pub capacity: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStationRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub address: Option<String>,
    pub coordinates: Option<Coordinates>,
    #[validate(range(min = 1, max = 100))]
    pub capacity: Option<u32>,
}

// ─── Handlers ────────────────────────────────────────────────

async fn list_stations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StationListQuery>,
) -> Result<Json<Vec<Station>>> {
    let query = validated(query)?;
    let defaults = PageRequest::default();
    let filter = StationFilter {
        active_only: query.active_only,
        name_contains: query.name,
        min_capacity: query.min_capacity,
    };
    let page = PageRequest {
        page: query.page.unwrap_or(defaults.page),
        per_page: query.per_page.unwrap_or(defaults.per_page),
    };
    Ok(Json(state.stations.find_all(&filter, page).await?))
}

async fn nearby_stations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Vec<NearbyStation>>> {
    let query = validated(query)?;
    let origin = Coordinates {
        latitude: query.lat,
        longitude: query.lon,
    };
    let radius = query.radius_km.unwrap_or(DEFAULT_NEARBY_RADIUS_KM);
    Ok(Json(state.stations.find_nearby(origin, radius).await?))
}

async fn station_stats(State(state): State<Arc<AppState>>) -> Result<Json<StationStats>> {
    Ok(Json(state.stations.get_stats().await?))
}

async fn get_station(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Station>> {
    let station = state
        .stations
        .find_by_id(id)
        .await?
        .ok_or(AppError::StationNotFound(id))?;
    Ok(Json(station))
}

async fn create_station(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateStationRequest>,
) -> Result<(StatusCode, Json<Station>)> {
    let body = validated(body)?;
    let station = state
        .fleet
        .register_station(NewStation {
            name: body.name,
            address: body.address,
            coordinates: Coordinates {
                latitude: body.latitude,
                longitude: body.longitude,
            },
            capacity: body.capacity,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(station)))
}

async fn update_station(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(body): Json<UpdateStationRequest>,
) -> Result<Json<Station>> {
    let body = validated(body)?;
    let station = state
        .fleet
        .update_station(
            id,
            StationPatch {
                name: body.name,
                address: body.address,
                coordinates: body.coordinates,
                capacity: body.capacity,
            },
        )
        .await?;
    Ok(Json(station))
}

async fn delete_station(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<StatusCode> {
    state.fleet.remove_station(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn activate_station(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Station>> {
    Ok(Json(state.fleet.set_station_active(id, true).await?))
}

async fn deactivate_station(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Station>> {
    Ok(Json(state.fleet.set_station_active(id, false).await?))
}

async fn station_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<StationAvailability>> {
    let availability = state
        .stations
        .get_availability(id)
        .await?
        .ok_or(AppError::StationNotFound(id))?;
    Ok(Json(availability))
}

async fn available_transports(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Vec<Transport>>> {
    if state.stations.find_by_id(id).await?.is_none() {
        return Err(AppError::StationNotFound(id));
    }
    Ok(Json(state.transports.find_available_at(id).await?))
}
