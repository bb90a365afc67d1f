// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.
//!
//! Every failure the rental core can produce is a variant of [`AppError`].
//! Variants are grouped into the coarse [`ErrorKind`] taxonomy, which is what
//! callers (and the HTTP adapter) branch on.

use crate::models::{LoanStatus, TransportStatus};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Coarse classification of an [`AppError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or out-of-range input.
    Validation,
    /// A referenced entity does not exist.
    NotFound,
    /// A business invariant would be violated.
    Conflict,
    /// The payment was declined or could not be attempted.
    PaymentFailure,
    /// Store or other infrastructure failure.
    Infrastructure,
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ─── Validation ──────────────────────────────────────────────
    #[error("Invalid duration: {0} minutes (must be positive)")]
    InvalidDuration(i64),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid destination station: {0}")]
    InvalidDestination(u64),

    #[error("Invalid battery level: {0} (must be between 0 and 100)")]
    InvalidBatteryLevel(i32),

    #[error("Invalid station capacity: {0} (must be between 1 and 100)")]
    InvalidCapacity(u32),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    // ─── Not Found ───────────────────────────────────────────────
    #[error("User {0} not found")]
    UserNotFound(u64),

    #[error("Transport {0} not found")]
    TransportNotFound(u64),

    #[error("Station {0} not found")]
    StationNotFound(u64),

    #[error("Loan {0} not found")]
    LoanNotFound(u64),

    // ─── Conflict ────────────────────────────────────────────────
    #[error("User {0} is not active")]
    UserInactive(u64),

    #[error("User {0} already has an active loan")]
    UserHasActiveLoan(u64),

    #[error("Transport {transport_id} is not available (status: {status})")]
    TransportNotAvailable {
        transport_id: u64,
        status: TransportStatus,
    },

    #[error("Transport {transport_id} battery too low to rent ({battery_level}%)")]
    BatteryTooLow {
        transport_id: u64,
        battery_level: u8,
    },

    #[error("Transport {transport_id} is not at station {station_id}")]
    TransportNotAtStation { transport_id: u64, station_id: u64 },

    #[error("Transport cannot move from {from} to {to}")]
    IllegalTransportTransition {
        from: TransportStatus,
        to: TransportStatus,
    },

    #[error("Loan cannot move from {from} to {to}")]
    IllegalLoanTransition { from: LoanStatus, to: LoanStatus },

    #[error("Loan {loan_id} cannot be completed (status: {status})")]
    LoanNotCompletable { loan_id: u64, status: LoanStatus },

    #[error("Loan {loan_id} cannot be cancelled (status: {status})")]
    LoanNotCancellable { loan_id: u64, status: LoanStatus },

    #[error("Loan {loan_id} cannot be extended (status: {status})")]
    LoanNotExtendable { loan_id: u64, status: LoanStatus },

    // ─── Payment ─────────────────────────────────────────────────
    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    // ─── Infrastructure ──────────────────────────────────────────
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Classify this error into the taxonomy used by callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidDuration(_)
            | AppError::InvalidAmount(_)
            | AppError::InvalidDestination(_)
            | AppError::InvalidBatteryLevel(_)
            | AppError::InvalidCapacity(_)
            | AppError::BadRequest(_) => ErrorKind::Validation,

            AppError::UserNotFound(_)
            | AppError::TransportNotFound(_)
            | AppError::StationNotFound(_)
            | AppError::LoanNotFound(_) => ErrorKind::NotFound,

            AppError::UserInactive(_)
            | AppError::UserHasActiveLoan(_)
            | AppError::TransportNotAvailable { .. }
            | AppError::BatteryTooLow { .. }
            | AppError::TransportNotAtStation { .. }
            | AppError::IllegalTransportTransition { .. }
            | AppError::IllegalLoanTransition { .. }
            | AppError::LoanNotCompletable { .. }
            | AppError::LoanNotCancellable { .. }
            | AppError::LoanNotExtendable { .. } => ErrorKind::Conflict,

            AppError::PaymentFailed(_) => ErrorKind::PaymentFailure,

            AppError::Database(_) | AppError::Internal(_) => ErrorKind::Infrastructure,
        }
    }

    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidDuration(_) => "invalid_duration",
            AppError::InvalidAmount(_) => "invalid_amount",
            AppError::InvalidDestination(_) => "invalid_destination",
            AppError::InvalidBatteryLevel(_) => "invalid_battery_level",
            AppError::InvalidCapacity(_) => "invalid_capacity",
            AppError::BadRequest(_) => "bad_request",
            AppError::UserNotFound(_) => "user_not_found",
            AppError::TransportNotFound(_) => "transport_not_found",
            AppError::StationNotFound(_) => "station_not_found",
            AppError::LoanNotFound(_) => "loan_not_found",
            AppError::UserInactive(_) => "user_inactive",
            AppError::UserHasActiveLoan(_) => "user_has_active_loan",
            AppError::TransportNotAvailable { .. } => "transport_not_available",
            AppError::BatteryTooLow { .. } => "battery_too_low",
            AppError::TransportNotAtStation { .. } => "transport_not_at_station",
            AppError::IllegalTransportTransition { .. } => "illegal_transport_transition",
            AppError::IllegalLoanTransition { .. } => "illegal_loan_transition",
            AppError::LoanNotCompletable { .. } => "loan_not_completable",
            AppError::LoanNotCancellable { .. } => "loan_not_cancellable",
            AppError::LoanNotExtendable { .. } => "loan_not_extendable",
            AppError::PaymentFailed(_) => "payment_failed",
            AppError::Database(_) => "database_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::PaymentFailure => StatusCode::PAYMENT_REQUIRED,
            ErrorKind::Infrastructure => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Infrastructure details stay in the logs.
        let details = if self.kind() == ErrorKind::Infrastructure {
            tracing::error!(error = %self, "Infrastructure error");
            None
        } else {
            Some(self.to_string())
        };

        let body = ErrorResponse {
            error: self.code().to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for services and handlers
pub type Result<T> = std::result::Result<T, AppError>;
