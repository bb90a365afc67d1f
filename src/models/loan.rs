// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Loan (rental session) model and its lifecycle state machine.
//!
//! ```text
//!   active ──extend──▶ extended
//!   active, extended ──complete──▶ completed
//!   active, extended ──cancel───▶ cancelled
//! ```
//!
//! `completed` and `cancelled` are terminal. No loan re-enters `active`.

use crate::error::{AppError, Result};
use crate::models::Money;
use crate::time_utils::whole_minutes_between;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Active,
    Extended,
    Completed,
    Cancelled,
}

impl LoanStatus {
    /// Active or extended: the rider still has the transport.
    pub fn is_open(&self) -> bool {
        matches!(self, LoanStatus::Active | LoanStatus::Extended)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_open()
    }

    pub fn can_transition_to(&self, target: LoanStatus) -> bool {
        use LoanStatus::*;
        matches!(
            (self, target),
            (Active, Extended)
                | (Active, Completed)
                | (Extended, Completed)
                | (Active, Cancelled)
                | (Extended, Cancelled)
        )
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoanStatus::Active => "active",
            LoanStatus::Extended => "extended",
            LoanStatus::Completed => "completed",
            LoanStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    CreditCard,
    DebitCard,
    DigitalWallet,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::DigitalWallet => "digital_wallet",
        }
    }
}

/// Request to open a loan, before the store assigns an ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLoan {
    pub user_id: u64,
    pub transport_id: u64,
    pub origin_station_id: u64,
    /// Minutes the rider expects to keep the transport
    pub estimated_duration: Option<i64>,
}

/// One rental session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: u64,
    pub user_id: u64,
    pub transport_id: u64,
    pub origin_station_id: u64,
    /// Set together with `end_date` when the loan closes
    pub destination_station_id: Option<u64>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    /// Minutes; grows with each extension
    pub estimated_duration: Option<i64>,
    pub total_cost: Option<Money>,
    pub status: LoanStatus,
    pub payment_method: Option<PaymentMethod>,
    /// Gateway transaction or pre-authorization reference
    pub payment_reference: Option<String>,
}

impl Loan {
    /// Build a freshly opened loan.
    pub fn open(id: u64, new: NewLoan, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: new.user_id,
            transport_id: new.transport_id,
            origin_station_id: new.origin_station_id,
            destination_station_id: None,
            start_date: now,
            end_date: None,
            estimated_duration: new.estimated_duration,
            total_cost: None,
            status: LoanStatus::Active,
            payment_method: None,
            payment_reference: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    fn guard(&self, target: LoanStatus) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(AppError::IllegalLoanTransition {
                from: self.status,
                to: target,
            });
        }
        Ok(())
    }

    /// Add time (and its price) to an active loan.
    pub fn extend(&mut self, minutes: i64, cost: Money) -> Result<()> {
        self.guard(LoanStatus::Extended)?;
        if minutes <= 0 {
            return Err(AppError::InvalidDuration(minutes));
        }
        if cost.is_negative() {
            return Err(AppError::InvalidAmount(format!(
                "extension cost {} is negative",
                cost
            )));
        }

        let total_cost = self
            .total_cost
            .unwrap_or(Money::ZERO)
            .checked_add(cost)
            .ok_or_else(|| {
                AppError::InvalidAmount(format!("extension cost {} is out of range", cost))
            })?;

        self.estimated_duration =
            Some(self.estimated_duration.unwrap_or(0).saturating_add(minutes));
        self.total_cost = Some(total_cost);
        self.status = LoanStatus::Extended;
        Ok(())
    }

    /// Close the loan at `destination_station_id`, charging `cost`.
    pub fn complete(
        &mut self,
        destination_station_id: u64,
        cost: Money,
        payment_method: PaymentMethod,
    ) -> Result<()> {
        self.complete_at(destination_station_id, cost, payment_method, Utc::now())
    }

    pub fn complete_at(
        &mut self,
        destination_station_id: u64,
        cost: Money,
        payment_method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.guard(LoanStatus::Completed)?;
        if destination_station_id == 0 {
            return Err(AppError::InvalidDestination(destination_station_id));
        }
        if cost.is_negative() {
            return Err(AppError::InvalidAmount(format!(
                "total cost {} is negative",
                cost
            )));
        }

        self.destination_station_id = Some(destination_station_id);
        self.total_cost = Some(cost);
        self.payment_method = Some(payment_method);
        self.end_date = Some(now);
        self.status = LoanStatus::Completed;
        Ok(())
    }

    /// Abort the loan. The transport goes back to the origin station, so
    /// that is recorded as the destination. Costs are left untouched.
    pub fn cancel(&mut self) -> Result<()> {
        self.cancel_at(Utc::now())
    }

    pub fn cancel_at(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.guard(LoanStatus::Cancelled)?;
        self.destination_station_id = Some(self.origin_station_id);
        self.end_date = Some(now);
        self.status = LoanStatus::Cancelled;
        Ok(())
    }

    /// Whole minutes the loan has run (or ran, once closed).
    pub fn duration_in_minutes(&self) -> i64 {
        self.duration_in_minutes_at(Utc::now())
    }

    pub fn duration_in_minutes_at(&self, now: DateTime<Utc>) -> i64 {
        let end = match self.end_date {
            Some(end) => end,
            None => now,
        };
        whole_minutes_between(self.start_date, end)
    }

    /// True when the elapsed time exceeds the estimate.
    pub fn is_overtime(&self) -> bool {
        self.is_overtime_at(Utc::now())
    }

    pub fn is_overtime_at(&self, now: DateTime<Utc>) -> bool {
        self.estimated_duration
            .is_some_and(|estimate| self.duration_in_minutes_at(now) > estimate)
    }

    /// Minutes beyond the estimate, zero if none.
    pub fn overdue_minutes_at(&self, now: DateTime<Utc>) -> i64 {
        match self.estimated_duration {
            Some(estimate) => (self.duration_in_minutes_at(now) - estimate).max(0),
            None => 0,
        }
    }
}
