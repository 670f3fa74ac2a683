//! Payment gateway abstraction.
//!
//! Paid bookings go through a [`PaymentGateway`] before the spot is written.
//! The real processor is external; the runtime crate ships a simulated
//! gateway and the testing crate a scripted one.

use crate::types::{Money, PaymentId};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Payment gateway result
pub type GatewayResult<T> = Result<T, PaymentError>;

/// Boxed future returned by gateway calls.
pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = GatewayResult<T>> + Send + 'a>>;

/// How the attendee pays.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card payment; only the last four digits ever reach this system
    Card {
        /// Last four digits of the card number
        last_four: String,
    },
    /// UPI payment
    Upi {
        /// Virtual payment address
        vpa: String,
    },
}

/// Payment gateway error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// Card declined
    #[error("Card declined: {reason}")]
    Declined {
        /// Decline reason
        reason: String,
    },

    /// Invalid payment method
    #[error("Invalid payment method: {reason}")]
    InvalidPaymentMethod {
        /// Invalid reason
        reason: String,
    },

    /// Gateway timeout
    #[error("Gateway timeout")]
    Timeout,

    /// Refund rejected by the processor
    #[error("Refund failed: {reason}")]
    RefundFailed {
        /// Processor message
        reason: String,
    },
}

/// A captured charge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    /// Payment ID (internal)
    pub payment_id: PaymentId,
    /// Gateway transaction ID
    pub transaction_id: String,
    /// Amount charged
    pub amount: Money,
}

/// Payment gateway trait
///
/// Abstraction over the payment processor. Uses boxed futures so it can be
/// held as `Arc<dyn PaymentGateway>`.
pub trait PaymentGateway: Send + Sync {
    /// Charge `amount` using `method`.
    ///
    /// # Errors
    ///
    /// Returns error if the processor declines or does not answer.
    fn charge(
        &self,
        payment_id: PaymentId,
        amount: Money,
        method: PaymentMethod,
    ) -> GatewayFuture<'_, PaymentReceipt>;

    /// Refund a captured charge in full.
    ///
    /// # Errors
    ///
    /// Returns error if the refund is rejected.
    fn refund(&self, receipt: &PaymentReceipt) -> GatewayFuture<'_, String>;
}
