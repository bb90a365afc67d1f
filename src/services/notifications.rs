// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Rider notifications, delivered in the background.

use crate::models::{Loan, Money, User};
use crate::services::payment::PaymentReceipt;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Outbound delivery channel (email, push, ...).
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send_loan_ended_email(&self, user: &User, loan: &Loan) -> anyhow::Result<()>;

    async fn send_payment_confirmation(
        &self,
        user: &User,
        loan: &Loan,
        receipt: &PaymentReceipt,
    ) -> anyhow::Result<()>;

    async fn send_loan_reminder(&self, user: &User, loan: &Loan) -> anyhow::Result<()>;

    /// `fee` is informational; it is not charged.
    async fn send_loan_cancelled(&self, user: &User, loan: &Loan, fee: Money)
        -> anyhow::Result<()>;
}

/// Sink that writes every notification to the log.
#[derive(Debug, Default, Clone)]
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn send_loan_ended_email(&self, user: &User, loan: &Loan) -> anyhow::Result<()> {
        tracing::info!(
            user_id = user.id,
            loan_id = loan.id,
            email = %user.email,
            "Loan ended notification"
        );
        Ok(())
    }

    async fn send_payment_confirmation(
        &self,
        user: &User,
        loan: &Loan,
        receipt: &PaymentReceipt,
    ) -> anyhow::Result<()> {
        tracing::info!(
            user_id = user.id,
            loan_id = loan.id,
            method = receipt.method.as_str(),
            reference = receipt.reference.as_deref().unwrap_or("-"),
            "Payment confirmation"
        );
        Ok(())
    }

    async fn send_loan_reminder(&self, user: &User, loan: &Loan) -> anyhow::Result<()> {
        tracing::info!(user_id = user.id, loan_id = loan.id, "Overtime reminder");
        Ok(())
    }

    async fn send_loan_cancelled(
        &self,
        user: &User,
        loan: &Loan,
        fee: Money,
    ) -> anyhow::Result<()> {
        tracing::info!(
            user_id = user.id,
            loan_id = loan.id,
            fee = %fee,
            "Loan cancelled notification"
        );
        Ok(())
    }
}

/// Fire-and-forget dispatcher over a [`NotificationSink`].
///
/// Every method spawns the delivery and returns immediately. Failures are
/// logged and dropped. The returned handle is only for tests that need to
/// wait for delivery.
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    pub fn loan_completed(
        &self,
        user: User,
        loan: Loan,
        receipt: PaymentReceipt,
    ) -> JoinHandle<()> {
        let sink = self.sink.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.send_loan_ended_email(&user, &loan).await {
                tracing::warn!(loan_id = loan.id, error = %e, "Failed to send loan ended email");
            }
            if let Err(e) = sink.send_payment_confirmation(&user, &loan, &receipt).await {
                tracing::warn!(loan_id = loan.id, error = %e, "Failed to send payment confirmation");
            }
        })
    }

    pub fn loan_cancelled(&self, user: User, loan: Loan, fee: Money) -> JoinHandle<()> {
        let sink = self.sink.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.send_loan_cancelled(&user, &loan, fee).await {
                tracing::warn!(loan_id = loan.id, error = %e, "Failed to send cancellation notice");
            }
        })
    }

    pub fn loan_reminder(&self, user: User, loan: Loan) -> JoinHandle<()> {
        let sink = self.sink.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.send_loan_reminder(&user, &loan).await {
                tracing::warn!(loan_id = loan.id, error = %e, "Failed to send loan reminder");
            }
        })
    }
}
