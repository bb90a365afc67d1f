// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Loan lifecycle routes.

use crate::error::Result;
use crate::models::{Loan, LoanStatus, Money, NewLoan, PaymentMethod};
use crate::routes::validated;
use crate::services::{CancelledLoan, CompleteLoan, LoanQuote, PaymentReference};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/loans", post(create_loan))
        .route("/api/loans/{id}", get(get_loan))
        .route("/api/loans/{id}/complete", post(complete_loan))
        .route("/api/loans/{id}/cancel", post(cancel_loan))
        .route("/api/loans/{id}/extend", post(extend_loan))
        .route("/api/loans/{id}/quote", get(quote_loan))
        .route("/api/loans/{id}/remind", post(remind_loan))
        .route("/api/users/{id}/loans", get(user_loans))
}

// ─── Responses ───────────────────────────────────────────────

/// Loan as returned by the API, with RFC 3339 timestamps.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanResponse {
    pub id: u64,
    pub user_id: u64,
    pub transport_id: u64,
    pub origin_station_id: u64,
    pub destination_station_id: Option<u64>,
    pub start_date: String,
    pub end_date: Option<String>,
    pub estimated_duration: Option<i64>,
    pub total_cost: Option<Money>,
    pub status: LoanStatus,
    pub payment_method: Option<PaymentMethod>,
    pub payment_reference: Option<String>,
    pub duration_minutes: i64,
    pub overtime: bool,
}

impl From<Loan> for LoanResponse {
    fn from(loan: Loan) -> Self {
        Self {
            duration_minutes: loan.duration_in_minutes(),
            overtime: loan.is_overtime(),
            id: loan.id,
            user_id: loan.user_id,
            transport_id: loan.transport_id,
            origin_station_id: loan.origin_station_id,
            destination_station_id: loan.destination_station_id,
            start_date: format_utc_rfc3339(loan.start_date),
            end_date: loan.end_date.map(format_utc_rfc3339),
            estimated_duration: loan.estimated_duration,
            total_cost: loan.total_cost,
            status: loan.status,
            payment_method: loan.payment_method,
            payment_reference: loan.payment_reference,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancelLoanResponse {
    pub loan: LoanResponse,
    pub cancellation_fee: Money,
}

impl From<CancelledLoan> for CancelLoanResponse {
    fn from(cancelled: CancelledLoan) -> Self {
        Self {
            loan: cancelled.loan.into(),
            cancellation_fee: cancelled.cancellation_fee,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReminderResponse {
    pub reminded: bool,
}

// ─── Requests ────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct CreateLoanRequest {
    #[validate(range(min = 1))]
    pub user_id: u64,
    #[validate(range(min = 1))]
    pub transport_id: u64,
    #[validate(range(min = 1))]
    pub origin_station_id: u64,
    #[validate(range(min = 1, max = 1440))]
    pub estimated_duration: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CompleteLoanRequest {
    #[validate(range(min = 1))]
    pub destination_station_id: u64,
    pub total_cost: Money,
    pub payment_method: PaymentMethod,
    pub payment_reference: Option<PaymentReference>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ExtendLoanRequest {
    #[validate(range(min = 1, max = 1440))]
    pub additional_minutes: i64,
    /// Omit to charge the standard extension tariff
    pub additional_cost: Option<Money>,
}

// ─── Handlers ────────────────────────────────────────────────

async fn create_loan(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateLoanRequest>,
) -> Result<(StatusCode, Json<LoanResponse>)> {
    let body = validated(body)?;
    let loan = state
        .loans
        .create_loan(NewLoan {
            user_id: body.user_id,
            transport_id: body.transport_id,
            origin_station_id: body.origin_station_id,
            estimated_duration: body.estimated_duration,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(loan.into())))
}

async fn get_loan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<LoanResponse>> {
    Ok(Json(state.loans.get_loan(id).await?.into()))
}

async fn complete_loan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(body): Json<CompleteLoanRequest>,
) -> Result<Json<LoanResponse>> {
    let body = validated(body)?;
    let loan = state
        .loans
        .complete_loan(
            id,
            CompleteLoan {
                destination_station_id: body.destination_station_id,
                total_cost: body.total_cost,
                payment_method: body.payment_method,
                payment_reference: body.payment_reference,
            },
        )
        .await?;
    Ok(Json(loan.into()))
}

async fn cancel_loan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<CancelLoanResponse>> {
    Ok(Json(state.loans.cancel_loan(id).await?.into()))
}

async fn extend_loan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(body): Json<ExtendLoanRequest>,
) -> Result<Json<LoanResponse>> {
    let body = validated(body)?;
    let loan = match body.additional_cost {
        Some(cost) => {
            state
                .loans
                .extend_loan(id, body.additional_minutes, cost)
                .await?
        }
        None => {
            state
                .loans
                .extend_loan_priced(id, body.additional_minutes)
                .await?
        }
    };
    Ok(Json(loan.into()))
}

async fn quote_loan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<LoanQuote>> {
    Ok(Json(state.loans.quote_loan(id).await?))
}

async fn remind_loan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<ReminderResponse>> {
    let reminded = state.loans.remind_if_overtime(id).await?;
    Ok(Json(ReminderResponse { reminded }))
}

async fn user_loans(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<u64>,
) -> Result<Json<Vec<LoanResponse>>> {
    let loans = state.loans.loans_for_user(user_id).await?;
    Ok(Json(loans.into_iter().map(LoanResponse::from).collect()))
}
