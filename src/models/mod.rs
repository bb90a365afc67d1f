// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the rental network.

pub mod loan;
pub mod money;
pub mod station;
pub mod transport;
pub mod user;

pub use loan::{Loan, LoanStatus, NewLoan, PaymentMethod};
pub use money::Money;
pub use station::{
    Coordinates, NearbyStation, NewStation, PageRequest, Station, StationAvailability,
    StationFilter, StationPatch, StationStats,
};
pub use transport::{
    BrakeType, NewTransport, Transport, TransportFilter, TransportKind, TransportPatch,
    TransportStatus,
};
pub use user::{User, UserRole, UserStatus};
