// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stateless fare quotes.

use crate::error::Result;
use crate::models::Money;
use crate::routes::validated;
use crate::services::{calculate_fare, FareBreakdown};
use crate::AppState;
use axum::{routing::post, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/fares/quote", post(quote_fare))
}

#[derive(Debug, Deserialize, Validate)]
pub struct FareQuoteRequest {
    pub hourly_rate: Money,
    /// At most a week
    #[validate(range(min = 1, max = 10080))]
    pub duration_minutes: i64,
}

/// Price an arbitrary rental without touching any loan.
async fn quote_fare(Json(body): Json<FareQuoteRequest>) -> Result<Json<FareBreakdown>> {
    let body = validated(body)?;
    Ok(Json(calculate_fare(body.hourly_rate, body.duration_minutes)?))
}
