// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Payment gateway seam and settlement rules.

use crate::error::{AppError, Result};
use crate::models::{Money, PaymentMethod};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Outcome reported by a gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentResult {
    pub success: bool,
    pub transaction_id: Option<String>,
    pub message: Option<String>,
}

/// External card / wallet processor.
///
/// A transport-level failure is an `Err`; a declined charge is an `Ok` with
/// `success == false`.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn process_payment(
        &self,
        amount: Money,
        currency: &str,
        method_ref: &str,
    ) -> anyhow::Result<PaymentResult>;
}

/// What the rider handed over to pay with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentReference {
    /// Charge already captured upstream (e.g. at the kiosk).
    PreAuthorized { transaction_id: String },
    /// Tokenised card or wallet to charge now.
    Token { token: String },
}

/// How a completed loan was settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentReceipt {
    pub method: PaymentMethod,
    /// Gateway transaction ID, or the pre-authorization reference
    pub reference: Option<String>,
    /// Whether the gateway was called for this completion
    pub charged: bool,
}

/// Settle `amount` for a completion.
///
/// Cash and pre-authorized references settle without a gateway call. A
/// token is charged synchronously: a decline is a payment failure, while a
/// gateway that cannot be reached is an infrastructure error.
pub async fn settle(
    gateway: &dyn PaymentGateway,
    amount: Money,
    currency: &str,
    method: PaymentMethod,
    reference: Option<&PaymentReference>,
) -> Result<PaymentReceipt> {
    match (method, reference) {
        (PaymentMethod::Cash, _) => Ok(PaymentReceipt {
            method,
            reference: None,
            charged: false,
        }),
        (_, Some(PaymentReference::PreAuthorized { transaction_id })) => Ok(PaymentReceipt {
            method,
            reference: Some(transaction_id.clone()),
            charged: false,
        }),
        (_, Some(PaymentReference::Token { token })) => {
            let result = gateway
                .process_payment(amount, currency, token)
                .await
                .map_err(|e| AppError::Internal(e.context("payment gateway unavailable")))?;

            if !result.success {
                return Err(AppError::PaymentFailed(
                    result
                        .message
                        .unwrap_or_else(|| "payment declined".to_string()),
                ));
            }

            Ok(PaymentReceipt {
                method,
                reference: result.transaction_id,
                charged: true,
            })
        }
        (_, None) => Err(AppError::PaymentFailed(format!(
            "payment reference required for {}",
            method.as_str()
        ))),
    }
}

/// Gateway that approves every charge with a sequential transaction ID.
/// Used by the binary in place of a real processor.
#[derive(Debug, Default)]
pub struct SandboxPaymentGateway {
    next_id: AtomicU64,
}

impl SandboxPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentGateway for SandboxPaymentGateway {
    async fn process_payment(
        &self,
        amount: Money,
        currency: &str,
        _method_ref: &str,
    ) -> anyhow::Result<PaymentResult> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(amount = %amount, currency, "Sandbox payment approved");
        Ok(PaymentResult {
            success: true,
            transaction_id: Some(format!("sandbox-{:08}", id)),
            message: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Declining;

    #[async_trait]
    impl PaymentGateway for Declining {
        async fn process_payment(
            &self,
            _amount: Money,
            _currency: &str,
            _method_ref: &str,
        ) -> anyhow::Result<PaymentResult> {
            Ok(PaymentResult {
                success: false,
                transaction_id: None,
                message: Some("insufficient funds".to_string()),
            })
        }
    }

    #[tokio::test]
    async fn test_cash_settles_without_gateway() {
        let receipt = settle(
            &Declining,
            Money::from_units(5355),
            "COP",
            PaymentMethod::Cash,
            None,
        )
        .await
        .unwrap();
        assert!(!receipt.charged);
    }

    #[tokio::test]
    async fn test_pre_authorized_reference_is_settled() {
        let reference = PaymentReference::PreAuthorized {
            transaction_id: "pre-42".to_string(),
        };
        let receipt = settle(
            &Declining,
            Money::from_units(5355),
            "COP",
            PaymentMethod::CreditCard,
            Some(&reference),
        )
        .await
        .unwrap();
        assert_eq!(receipt.reference.as_deref(), Some("pre-42"));
        assert!(!receipt.charged);
    }

    #[tokio::test]
    async fn test_declined_token_is_payment_failure() {
        let reference = PaymentReference::Token {
            token: "tok_123".to_string(),
        };
        let err = settle(
            &Declining,
            Money::from_units(5355),
            "COP",
            PaymentMethod::DebitCard,
            Some(&reference),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::PaymentFailed(msg) if msg == "insufficient funds"));
    }

    struct Unreachable;

    #[async_trait]
    impl PaymentGateway for Unreachable {
        async fn process_payment(
            &self,
            _amount: Money,
            _currency: &str,
            _method_ref: &str,
        ) -> anyhow::Result<PaymentResult> {
            anyhow::bail!("connect timeout")
        }
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_infrastructure_failure() {
        let reference = PaymentReference::Token {
            token: "tok_123".to_string(),
        };
        let err = settle(
            &Unreachable,
            Money::from_units(5355),
            "COP",
            PaymentMethod::CreditCard,
            Some(&reference),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(err.kind(), crate::error::ErrorKind::Infrastructure);
    }

    #[tokio::test]
    async fn test_card_without_reference_fails() {
        let err = settle(
            &SandboxPaymentGateway::new(),
            Money::from_units(100),
            "COP",
            PaymentMethod::DigitalWallet,
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::PaymentFailed(_)));
    }

    #[tokio::test]
    async fn test_sandbox_issues_sequential_ids() {
        let gateway = SandboxPaymentGateway::new();
        let first = gateway
            .process_payment(Money::from_units(1), "COP", "tok")
            .await
            .unwrap();
        let second = gateway
            .process_payment(Money::from_units(1), "COP", "tok")
            .await
            .unwrap();
        assert_eq!(first.transaction_id.as_deref(), Some("sandbox-00000001"));
        assert_eq!(second.transaction_id.as_deref(), Some("sandbox-00000002"));
    }
}
