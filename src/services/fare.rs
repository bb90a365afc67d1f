// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fare engine.
//!
//! Pure functions from (hourly rate, minutes) to money. All intermediate
//! arithmetic is exact; only the returned figures are rounded half-up to
//! two decimal places.

use crate::error::{AppError, Result};
use crate::models::Money;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Rentals strictly longer than this get the long-rental discount.
pub const LONG_RENTAL_THRESHOLD_MINUTES: i64 = 120;
pub const LONG_RENTAL_DISCOUNT: Decimal = dec!(0.10);
pub const TAX_RATE: Decimal = dec!(0.19);
pub const LATE_FEE_MULTIPLIER: Decimal = dec!(1.5);
pub const EXTENSION_MULTIPLIER: Decimal = dec!(1.2);

pub const CANCELLATION_BASE_RATE: i64 = 3000;
pub const CANCELLATION_PER_MINUTE: i64 = 50;
pub const CANCELLATION_FEE_SHARE: Decimal = dec!(0.40);

const MINUTES_PER_HOUR: Decimal = dec!(60);

/// One labelled line of a fare.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareLine {
    pub label: String,
    pub amount: Money,
}

/// Result of pricing a rental.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareBreakdown {
    pub hourly_rate: Money,
    pub duration_minutes: i64,
    pub base_fare: Money,
    pub discount: Money,
    pub taxes: Money,
    pub total_cost: Money,
    /// Human-readable lines, in charge order
    pub breakdown: Vec<FareLine>,
}

fn overflow(hourly_rate: Money, minutes: i64) -> AppError {
    AppError::InvalidAmount(format!(
        "fare for {} min at {}/h is out of range",
        minutes, hourly_rate
    ))
}

/// Unrounded `rate × minutes / 60`.
fn base_fare(hourly_rate: Money, minutes: i64) -> Result<Money> {
    hourly_rate
        .amount()
        .checked_mul(Decimal::from(minutes))
        .and_then(|v| v.checked_div(MINUTES_PER_HOUR))
        .map(Money::new)
        .ok_or_else(|| overflow(hourly_rate, minutes))
}

/// Base fare times a tariff multiplier, rounded.
fn scaled_fare(hourly_rate: Money, minutes: i64, multiplier: Decimal) -> Result<Money> {
    base_fare(hourly_rate, minutes)?
        .checked_mul(multiplier)
        .map(Money::round2)
        .ok_or_else(|| overflow(hourly_rate, minutes))
}

/// Price a rental of `duration_minutes` at `hourly_rate`.
pub fn calculate_fare(hourly_rate: Money, duration_minutes: i64) -> Result<FareBreakdown> {
    if duration_minutes <= 0 {
        return Err(AppError::InvalidDuration(duration_minutes));
    }
    if hourly_rate.is_negative() {
        return Err(AppError::InvalidAmount(format!(
            "hourly rate {} is negative",
            hourly_rate
        )));
    }

    let base = base_fare(hourly_rate, duration_minutes)?;
    // Discount and tax are fractions of the base, so only the final sum can
    // still overflow.
    let discount = if duration_minutes > LONG_RENTAL_THRESHOLD_MINUTES {
        base * LONG_RENTAL_DISCOUNT
    } else {
        Money::ZERO
    };
    let taxable = base - discount;
    let taxes = taxable * TAX_RATE;
    let total_cost = taxable
        .checked_add(taxes)
        .ok_or_else(|| overflow(hourly_rate, duration_minutes))?
        .round2();

    let mut breakdown = vec![FareLine {
        label: format!("{} min at {}/h", duration_minutes, hourly_rate),
        amount: base.round2(),
    }];
    if discount != Money::ZERO {
        breakdown.push(FareLine {
            label: "Long rental discount (10%)".to_string(),
            amount: (Money::ZERO - discount).round2(),
        });
    }
    breakdown.push(FareLine {
        label: "Tax (19%)".to_string(),
        amount: taxes.round2(),
    });

    Ok(FareBreakdown {
        hourly_rate,
        duration_minutes,
        base_fare: base.round2(),
        discount: discount.round2(),
        taxes: taxes.round2(),
        total_cost,
        breakdown,
    })
}

/// Surcharge for minutes past the estimate: 1.5× the base fare.
pub fn late_fee(hourly_rate: Money, overdue_minutes: i64) -> Result<Money> {
    if overdue_minutes < 0 {
        return Err(AppError::InvalidDuration(overdue_minutes));
    }
    scaled_fare(hourly_rate, overdue_minutes, LATE_FEE_MULTIPLIER)
}

/// Price of buying extra minutes on an open loan: 1.2× the base fare.
pub fn extension_fare(hourly_rate: Money, extra_minutes: i64) -> Result<Money> {
    if extra_minutes <= 0 {
        return Err(AppError::InvalidDuration(extra_minutes));
    }
    scaled_fare(hourly_rate, extra_minutes, EXTENSION_MULTIPLIER)
}

/// Informational fee quoted when a loan is cancelled.
///
/// 40% of `3000 + 50 × elapsed` once at least a minute has passed,
/// otherwise 40% of the flat 3000.
pub fn cancellation_fee(elapsed_minutes: i64) -> Money {
    let mut basis = Money::from_units(CANCELLATION_BASE_RATE);
    if elapsed_minutes >= 1 {
        basis = basis + Money::from_units(elapsed_minutes * CANCELLATION_PER_MINUTE);
    }
    (basis * CANCELLATION_FEE_SHARE).round2()
}
