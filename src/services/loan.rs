// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Loan orchestrator.
//!
//! Runs the checks and cross-entity writes that open, extend, complete and
//! cancel a rental. Every write that touches both a loan and its transport
//! goes through the [`RentalLedger`], which re-validates and commits both
//! rows together. Per-entity locks serialize requests inside this process so
//! that most conflicts are caught before the ledger is reached.

use crate::db::{LoanStore, RentalLedger, StationStore, TransportStore, UserStore};
use crate::error::{AppError, Result};
use crate::models::{Loan, LoanStatus, Money, NewLoan, PaymentMethod, Transport, TransportStatus};
use crate::services::fare::{self, FareBreakdown};
use crate::services::notifications::{NotificationSink, Notifier};
use crate::services::payment::{self, PaymentGateway, PaymentReference};
use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-entity async mutexes, keyed by ID.
///
/// An entry only lives while some request holds or waits on it, so the map
/// stays as small as the set of entities currently being worked on.
#[derive(Clone, Default)]
pub struct EntityLocks {
    locks: Arc<DashMap<u64, Arc<Mutex<()>>>>,
}

impl EntityLocks {
    pub async fn lock(&self, id: u64) -> EntityGuard {
        let mutex = self
            .locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        EntityGuard {
            locks: self.clone(),
            id,
            guard: Some(mutex.lock_owned().await),
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Held lock on one entity. Dropping it releases the lock and forgets the
/// entry if nobody else is queued on it.
pub struct EntityGuard {
    locks: EntityLocks,
    id: u64,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for EntityGuard {
    fn drop(&mut self) {
        self.guard.take();
        // Waiters hold a clone of the Arc, so a count of 1 means only the map.
        self.locks
            .locks
            .remove_if(&self.id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

/// Everything the orchestrator talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub users: Arc<dyn UserStore>,
    pub stations: Arc<dyn StationStore>,
    pub transports: Arc<dyn TransportStore>,
    pub loans: Arc<dyn LoanStore>,
    pub ledger: Arc<dyn RentalLedger>,
    pub payments: Arc<dyn PaymentGateway>,
    pub notifications: Arc<dyn NotificationSink>,
}

/// Input for [`LoanService::complete_loan`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteLoan {
    pub destination_station_id: u64,
    pub total_cost: Money,
    pub payment_method: PaymentMethod,
    pub payment_reference: Option<PaymentReference>,
}

/// A cancelled loan plus the fee quoted to the rider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancelledLoan {
    pub loan: Loan,
    /// Informational; never charged
    pub cancellation_fee: Money,
}

/// What an open loan would cost if it ended now.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanQuote {
    pub loan_id: u64,
    pub elapsed_minutes: i64,
    pub overdue_minutes: i64,
    pub fare: FareBreakdown,
    pub late_fee: Money,
    pub total_due: Money,
}

#[derive(Clone)]
pub struct LoanService {
    users: Arc<dyn UserStore>,
    stations: Arc<dyn StationStore>,
    transports: Arc<dyn TransportStore>,
    loans: Arc<dyn LoanStore>,
    ledger: Arc<dyn RentalLedger>,
    payments: Arc<dyn PaymentGateway>,
    notifier: Notifier,
    currency: String,
    user_locks: EntityLocks,
    transport_locks: EntityLocks,
    loan_locks: EntityLocks,
}

impl LoanService {
    pub fn new(collab: Collaborators, currency: impl Into<String>) -> Self {
        Self {
            users: collab.users,
            stations: collab.stations,
            transports: collab.transports,
            loans: collab.loans,
            ledger: collab.ledger,
            payments: collab.payments,
            notifier: Notifier::new(collab.notifications),
            currency: currency.into(),
            user_locks: EntityLocks::default(),
            transport_locks: EntityLocks::default(),
            loan_locks: EntityLocks::default(),
        }
    }

    async fn load_loan(&self, loan_id: u64) -> Result<Loan> {
        self.loans
            .find_by_id(loan_id)
            .await?
            .ok_or(AppError::LoanNotFound(loan_id))
    }

    async fn load_transport(&self, transport_id: u64) -> Result<Transport> {
        self.transports
            .find_by_id(transport_id)
            .await?
            .ok_or(AppError::TransportNotFound(transport_id))
    }

    pub async fn get_loan(&self, loan_id: u64) -> Result<Loan> {
        self.load_loan(loan_id).await
    }

    /// Number of per-entity locks currently held or waited on.
    pub fn tracked_locks(&self) -> usize {
        self.user_locks.len() + self.transport_locks.len() + self.loan_locks.len()
    }

    /// Loans of one user, newest first.
    pub async fn loans_for_user(&self, user_id: u64) -> Result<Vec<Loan>> {
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AppError::UserNotFound(user_id));
        }
        self.loans.find_by_user(user_id).await
    }

    // ─── Create ──────────────────────────────────────────────────────

    /// Open a loan and take the transport off its station.
    pub async fn create_loan(&self, new: NewLoan) -> Result<Loan> {
        if let Some(estimate) = new.estimated_duration {
            if estimate <= 0 {
                return Err(AppError::InvalidDuration(estimate));
            }
        }

        // User before transport, always.
        let _user_guard = self.user_locks.lock(new.user_id).await;
        let _transport_guard = self.transport_locks.lock(new.transport_id).await;

        // ─────────────────────────────────────────────────────────────
        // STEP 1: Rider
        // ─────────────────────────────────────────────────────────────
        let user = self
            .users
            .find_by_id(new.user_id)
            .await?
            .ok_or(AppError::UserNotFound(new.user_id))?;
        if !user.is_active() {
            return Err(AppError::UserInactive(user.id));
        }
        if self.loans.has_active_loans(user.id).await? {
            return Err(AppError::UserHasActiveLoan(user.id));
        }

        // ─────────────────────────────────────────────────────────────
        // STEP 2: Transport and origin
        // ─────────────────────────────────────────────────────────────
        let transport = self.load_transport(new.transport_id).await?;
        if transport.status != TransportStatus::Available {
            return Err(AppError::TransportNotAvailable {
                transport_id: transport.id,
                status: transport.status,
            });
        }

        let station = self
            .stations
            .find_by_id(new.origin_station_id)
            .await?
            .ok_or(AppError::StationNotFound(new.origin_station_id))?;
        if transport.current_station_id != Some(station.id) {
            return Err(AppError::TransportNotAtStation {
                transport_id: transport.id,
                station_id: station.id,
            });
        }

        transport.ensure_rentable()?;

        // ─────────────────────────────────────────────────────────────
        // STEP 3: Commit loan + transport together
        // ─────────────────────────────────────────────────────────────
        // The transport above may be a cached copy; the ledger re-checks
        // the stored row and moves it to `in_use`.
        let loan = self.ledger.open_loan(new).await?;

        tracing::info!(
            loan_id = loan.id,
            user_id = loan.user_id,
            transport_id = loan.transport_id,
            station_id = loan.origin_station_id,
            "Loan created"
        );
        Ok(loan)
    }

    // ─── Complete ────────────────────────────────────────────────────

    /// Settle payment, close the loan and dock the transport at the
    /// destination.
    pub async fn complete_loan(&self, loan_id: u64, request: CompleteLoan) -> Result<Loan> {
        let _guard = self.loan_locks.lock(loan_id).await;

        let loan = self.load_loan(loan_id).await?;
        if !loan.is_open() {
            return Err(AppError::LoanNotCompletable {
                loan_id,
                status: loan.status,
            });
        }

        let destination = self
            .stations
            .find_by_id(request.destination_station_id)
            .await?
            .ok_or(AppError::StationNotFound(request.destination_station_id))?;

        // Run the loan transition on a copy first so nothing is charged for
        // a completion the state machine rejects. The transport side is
        // checked by the ledger against the stored row.
        let mut closed = loan.clone();
        closed.complete(destination.id, request.total_cost, request.payment_method)?;

        let receipt = payment::settle(
            self.payments.as_ref(),
            request.total_cost,
            &self.currency,
            request.payment_method,
            request.payment_reference.as_ref(),
        )
        .await?;
        closed.payment_reference = receipt.reference.clone();

        let closed = match self
            .ledger
            .close_loan(&closed, loan.status, destination.id)
            .await
        {
            Ok(closed) => closed,
            Err(e) => {
                if receipt.charged {
                    tracing::error!(
                        loan_id,
                        reference = receipt.reference.as_deref().unwrap_or("-"),
                        error = %e,
                        "Payment captured but loan completion was not recorded"
                    );
                }
                return Err(e);
            }
        };

        tracing::info!(
            loan_id,
            user_id = closed.user_id,
            transport_id = closed.transport_id,
            station_id = destination.id,
            total_cost = %request.total_cost,
            "Loan completed"
        );

        match self.users.find_by_id(closed.user_id).await {
            Ok(Some(user)) => {
                self.notifier.loan_completed(user, closed.clone(), receipt);
            }
            Ok(None) => tracing::warn!(loan_id, "Rider missing, skipping notifications"),
            Err(e) => tracing::warn!(loan_id, error = %e, "Rider lookup failed, skipping notifications"),
        }

        Ok(closed)
    }

    // ─── Cancel ──────────────────────────────────────────────────────

    /// Abort an open loan; the transport goes back to its origin.
    pub async fn cancel_loan(&self, loan_id: u64) -> Result<CancelledLoan> {
        let _guard = self.loan_locks.lock(loan_id).await;

        let loan = self.load_loan(loan_id).await?;
        if !loan.is_open() {
            return Err(AppError::LoanNotCancellable {
                loan_id,
                status: loan.status,
            });
        }

        let mut closed = loan.clone();
        closed.cancel()?;

        let closed = self
            .ledger
            .close_loan(&closed, loan.status, loan.origin_station_id)
            .await?;
        let cancellation_fee = fare::cancellation_fee(closed.duration_in_minutes());

        tracing::info!(
            loan_id,
            user_id = closed.user_id,
            transport_id = closed.transport_id,
            station_id = closed.origin_station_id,
            fee = %cancellation_fee,
            "Loan cancelled"
        );

        match self.users.find_by_id(closed.user_id).await {
            Ok(Some(user)) => {
                self.notifier
                    .loan_cancelled(user, closed.clone(), cancellation_fee);
            }
            Ok(None) => tracing::warn!(loan_id, "Rider missing, skipping notifications"),
            Err(e) => tracing::warn!(loan_id, error = %e, "Rider lookup failed, skipping notifications"),
        }

        Ok(CancelledLoan {
            loan: closed,
            cancellation_fee,
        })
    }

    // ─── Extend ──────────────────────────────────────────────────────

    /// Add `additional_minutes` to an active loan at the given price.
    pub async fn extend_loan(
        &self,
        loan_id: u64,
        additional_minutes: i64,
        additional_cost: Money,
    ) -> Result<Loan> {
        let _guard = self.loan_locks.lock(loan_id).await;
        let loan = self.load_extendable(loan_id).await?;
        self.apply_extension(loan, additional_minutes, additional_cost)
            .await
    }

    /// Extend using the standard extension tariff for the transport.
    pub async fn extend_loan_priced(&self, loan_id: u64, additional_minutes: i64) -> Result<Loan> {
        let _guard = self.loan_locks.lock(loan_id).await;
        let loan = self.load_extendable(loan_id).await?;
        let transport = self.load_transport(loan.transport_id).await?;
        let cost = fare::extension_fare(transport.hourly_rate, additional_minutes)?;
        self.apply_extension(loan, additional_minutes, cost).await
    }

    async fn load_extendable(&self, loan_id: u64) -> Result<Loan> {
        let loan = self.load_loan(loan_id).await?;
        if loan.status != LoanStatus::Active {
            return Err(AppError::LoanNotExtendable {
                loan_id,
                status: loan.status,
            });
        }
        Ok(loan)
    }

    /// Caller holds the loan lock.
    async fn apply_extension(
        &self,
        mut loan: Loan,
        additional_minutes: i64,
        additional_cost: Money,
    ) -> Result<Loan> {
        loan.extend(additional_minutes, additional_cost)?;
        let loan = self.loans.update(&loan, LoanStatus::Active).await?;

        tracing::info!(
            loan_id = loan.id,
            minutes = additional_minutes,
            cost = %additional_cost,
            "Loan extended"
        );
        Ok(loan)
    }

    // ─── Pricing and reminders ───────────────────────────────────────

    /// Price an open loan as if it ended now.
    ///
    /// At least one minute is always billed. Extension charges already on
    /// the loan are not included.
    pub async fn quote_loan(&self, loan_id: u64) -> Result<LoanQuote> {
        let loan = self.load_loan(loan_id).await?;
        if !loan.is_open() {
            return Err(AppError::LoanNotCompletable {
                loan_id,
                status: loan.status,
            });
        }
        let transport = self.load_transport(loan.transport_id).await?;

        let now = Utc::now();
        let elapsed_minutes = loan.duration_in_minutes_at(now);
        let overdue_minutes = loan.overdue_minutes_at(now);
        let fare = fare::calculate_fare(transport.hourly_rate, elapsed_minutes.max(1))?;
        let late_fee = fare::late_fee(transport.hourly_rate, overdue_minutes)?;
        let total_due = fare
            .total_cost
            .checked_add(late_fee)
            .ok_or_else(|| {
                AppError::InvalidAmount(format!("amount due on loan {} overflows", loan_id))
            })?;

        Ok(LoanQuote {
            loan_id,
            elapsed_minutes,
            overdue_minutes,
            fare,
            late_fee,
            total_due,
        })
    }

    /// Send an overtime reminder if the loan has run past its estimate.
    /// Returns whether a reminder was dispatched.
    pub async fn remind_if_overtime(&self, loan_id: u64) -> Result<bool> {
        let loan = self.load_loan(loan_id).await?;
        if !loan.is_open() || !loan.is_overtime() {
            return Ok(false);
        }
        let user = self
            .users
            .find_by_id(loan.user_id)
            .await?
            .ok_or(AppError::UserNotFound(loan.user_id))?;

        tracing::info!(loan_id, user_id = user.id, "Loan overtime, reminding rider");
        self.notifier.loan_reminder(user, loan);
        Ok(true)
    }
}
