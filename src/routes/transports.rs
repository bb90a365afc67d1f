// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Transport routes: cached reads plus fleet administration.

use crate::db::TransportStore;
use crate::error::{AppError, Result};
use crate::models::{Money, NewTransport, Transport, TransportFilter, TransportKind, TransportStatus};
use crate::routes::validated;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/transports", get(list_transports).post(create_transport))
        .route(
            "/api/transports/{id}",
            get(get_transport).delete(delete_transport),
        )
        .route("/api/transports/{id}/rate", put(update_rate))
        .route("/api/transports/{id}/battery", put(update_battery))
        .route("/api/transports/{id}/station", put(relocate_transport))
        .route("/api/transports/{id}/maintenance", post(send_to_maintenance))
        .route("/api/transports/{id}/return", post(return_from_maintenance))
        .route("/api/transports/{id}/retire", post(retire_transport))
        .route("/api/transports/{id}/repair", post(restore_for_repair))
}

// ─── Queries & Bodies ────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TransportListQuery {
    pub status: Option<TransportStatus>,
    pub station_id: Option<u64>,
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTransportRequest {
    pub kind: TransportKind,
    #[validate(range(min = 1))]
    pub station_id: u64,
    pub hourly_rate: Money,
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub hourly_rate: Money,
}

#[derive(Debug, Deserialize)]
pub struct BatteryRequest {
    /// Range is checked by the transport itself
    pub level: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RelocateRequest {
    #[validate(range(min = 1))]
    pub station_id: u64,
}

// ─── Handlers ────────────────────────────────────────────────

async fn list_transports(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TransportListQuery>,
) -> Result<Json<Vec<Transport>>> {
    let filter = TransportFilter {
        status: query.status,
        station_id: query.station_id,
        kind: query.kind,
    };
    Ok(Json(state.transports.find_all(&filter).await?))
}

async fn get_transport(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Transport>> {
    let transport = state
        .transports
        .find_by_id(id)
        .await?
        .ok_or(AppError::TransportNotFound(id))?;
    Ok(Json(transport))
}

async fn create_transport(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateTransportRequest>,
) -> Result<(StatusCode, Json<Transport>)> {
    let body = validated(body)?;
    let transport = state
        .fleet
        .register_transport(NewTransport {
            kind: body.kind,
            station_id: body.station_id,
            hourly_rate: body.hourly_rate,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(transport)))
}

async fn delete_transport(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<StatusCode> {
    state.fleet.remove_transport(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_rate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(body): Json<RateRequest>,
) -> Result<Json<Transport>> {
    Ok(Json(state.fleet.update_hourly_rate(id, body.hourly_rate).await?))
}

async fn update_battery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(body): Json<BatteryRequest>,
) -> Result<Json<Transport>> {
    Ok(Json(state.fleet.update_battery_level(id, body.level).await?))
}

async fn relocate_transport(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(body): Json<RelocateRequest>,
) -> Result<Json<Transport>> {
    let body = validated(body)?;
    Ok(Json(state.fleet.relocate(id, body.station_id).await?))
}

async fn send_to_maintenance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Transport>> {
    Ok(Json(state.fleet.send_to_maintenance(id).await?))
}

async fn return_from_maintenance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Transport>> {
    Ok(Json(state.fleet.return_from_maintenance(id).await?))
}

async fn retire_transport(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Transport>> {
    Ok(Json(state.fleet.retire(id).await?))
}

async fn restore_for_repair(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Transport>> {
    Ok(Json(state.fleet.restore_for_repair(id).await?))
}
