//! Simulated payment gateway for development.
//!
//! Approves a configurable share of charges after a configurable delay.
//! In production, replace with a real processor integration.

use eventbook_core::payment::{
    GatewayFuture, PaymentError, PaymentGateway, PaymentMethod, PaymentReceipt,
};
use eventbook_core::types::{Money, PaymentId};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// Simulated payment gateway.
///
/// Defaults to a 90% approval rate and two seconds of latency.
#[derive(Clone, Debug)]
pub struct SimulatedPaymentGateway {
    success_rate: f64,
    latency: Duration,
}

impl SimulatedPaymentGateway {
    /// Creates a gateway with the given approval rate (clamped to `0.0..=1.0`)
    /// and latency.
    #[must_use]
    pub fn new(success_rate: f64, latency: Duration) -> Self {
        let success_rate = if success_rate.is_nan() {
            0.0
        } else {
            success_rate.clamp(0.0, 1.0)
        };
        Self {
            success_rate,
            latency,
        }
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared(self) -> Arc<dyn PaymentGateway> {
        Arc::new(self)
    }

    fn approves(&self) -> bool {
        rand::thread_rng().gen_bool(self.success_rate)
    }
}

impl Default for SimulatedPaymentGateway {
    fn default() -> Self {
        Self::new(0.9, Duration::from_secs(2))
    }
}

fn validate(method: &PaymentMethod) -> Result<(), PaymentError> {
    match method {
        PaymentMethod::Card { last_four }
            if last_four.len() != 4 || !last_four.chars().all(|c| c.is_ascii_digit()) =>
        {
            Err(PaymentError::InvalidPaymentMethod {
                reason: "card number must end in four digits".to_string(),
            })
        }
        PaymentMethod::Upi { vpa } if !vpa.contains('@') => {
            Err(PaymentError::InvalidPaymentMethod {
                reason: format!("'{vpa}' is not a UPI address"),
            })
        }
        _ => Ok(()),
    }
}

impl PaymentGateway for SimulatedPaymentGateway {
    fn charge(
        &self,
        payment_id: PaymentId,
        amount: Money,
        method: PaymentMethod,
    ) -> GatewayFuture<'_, PaymentReceipt> {
        Box::pin(async move {
            validate(&method)?;
            tokio::time::sleep(self.latency).await;

            if !self.approves() {
                tracing::info!(%payment_id, %amount, "Simulated payment declined");
                return Err(PaymentError::Declined {
                    reason: "Payment failed. Please try again.".to_string(),
                });
            }

            let transaction_id = format!("sim_txn_{}", uuid::Uuid::new_v4());
            tracing::info!(
                %payment_id,
                %amount,
                transaction_id = %transaction_id,
                "Simulated payment processed"
            );

            Ok(PaymentReceipt {
                payment_id,
                transaction_id,
                amount,
            })
        })
    }

    fn refund(&self, receipt: &PaymentReceipt) -> GatewayFuture<'_, String> {
        let receipt = receipt.clone();
        Box::pin(async move {
            tokio::time::sleep(self.latency).await;

            let refund_id = format!("sim_refund_{}", uuid::Uuid::new_v4());
            tracing::info!(
                transaction_id = %receipt.transaction_id,
                amount = %receipt.amount,
                refund_id = %refund_id,
                "Simulated refund processed"
            );

            Ok(refund_id)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn card() -> PaymentMethod {
        PaymentMethod::Card {
            last_four: "4242".to_string(),
        }
    }

    #[tokio::test]
    async fn always_approves_at_rate_one() {
        let gateway = SimulatedPaymentGateway::new(1.0, Duration::ZERO);
        let amount = Money::from_minor(49_900);

        let receipt = gateway
            .charge(PaymentId::new(), amount, card())
            .await
            .unwrap();

        assert_eq!(receipt.amount, amount);
        assert!(receipt.transaction_id.starts_with("sim_txn_"));
    }

    #[tokio::test]
    async fn always_declines_at_rate_zero() {
        let gateway = SimulatedPaymentGateway::new(0.0, Duration::ZERO);

        let result = gateway
            .charge(PaymentId::new(), Money::from_minor(100), card())
            .await;

        assert!(matches!(result, Err(PaymentError::Declined { .. })));
    }

    #[tokio::test]
    async fn malformed_method_is_rejected_before_charging() {
        let gateway = SimulatedPaymentGateway::new(1.0, Duration::ZERO);

        let result = gateway
            .charge(
                PaymentId::new(),
                Money::from_minor(100),
                PaymentMethod::Upi {
                    vpa: "not-an-address".to_string(),
                },
            )
            .await;

        assert!(matches!(
            result,
            Err(PaymentError::InvalidPaymentMethod { .. })
        ));
    }

    #[tokio::test]
    async fn refund_returns_an_id() {
        let gateway = SimulatedPaymentGateway::new(1.0, Duration::ZERO);
        let receipt = gateway
            .charge(PaymentId::new(), Money::from_minor(100), card())
            .await
            .unwrap();

        let refund_id = gateway.refund(&receipt).await.unwrap();
        assert!(refund_id.starts_with("sim_refund_"));
    }
}
