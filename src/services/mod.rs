// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod fare;
pub mod fleet;
pub mod loan;
pub mod notifications;
pub mod payment;

pub use fare::{calculate_fare, FareBreakdown, FareLine};
pub use fleet::FleetService;
pub use loan::{CancelledLoan, Collaborators, CompleteLoan, LoanQuote, LoanService};
pub use notifications::{LogNotificationSink, NotificationSink, Notifier};
pub use payment::{
    PaymentGateway, PaymentReceipt, PaymentReference, PaymentResult, SandboxPaymentGateway,
};
