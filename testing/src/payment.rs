//! Scripted payment gateway.
//!
//! Charges succeed unless an outcome was queued with
//! [`ScriptedPaymentGateway::push_outcome`]. Every charge and refund is
//! recorded so tests can assert on exactly-once charging and compensation.

use eventbook_core::payment::{
    GatewayFuture, PaymentError, PaymentGateway, PaymentMethod, PaymentReceipt,
};
use eventbook_core::types::{Money, PaymentId};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Ledger {
    outcomes: VecDeque<Result<(), PaymentError>>,
    charges: Vec<PaymentReceipt>,
    refunds: Vec<PaymentReceipt>,
    decline_all: bool,
}

/// Payment gateway whose answers are decided by the test.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPaymentGateway {
    ledger: Arc<Mutex<Ledger>>,
}

impl ScriptedPaymentGateway {
    /// Gateway that approves every charge.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway that declines every charge.
    #[must_use]
    pub fn always_decline() -> Self {
        let gateway = Self::default();
        if let Ok(mut ledger) = gateway.ledger.lock() {
            ledger.decline_all = true;
        }
        gateway
    }

    /// Queue the outcome of the next unscripted charge.
    pub fn push_outcome(&self, outcome: Result<(), PaymentError>) {
        if let Ok(mut ledger) = self.ledger.lock() {
            ledger.outcomes.push_back(outcome);
        }
    }

    /// Queue a decline for the next charge.
    pub fn decline_next(&self, reason: &str) {
        self.push_outcome(Err(PaymentError::Declined {
            reason: reason.to_string(),
        }));
    }

    /// Successful charges, in order.
    #[must_use]
    pub fn charges(&self) -> Vec<PaymentReceipt> {
        self.ledger
            .lock()
            .map(|ledger| ledger.charges.clone())
            .unwrap_or_default()
    }

    /// Refunded receipts, in order.
    #[must_use]
    pub fn refunds(&self) -> Vec<PaymentReceipt> {
        self.ledger
            .lock()
            .map(|ledger| ledger.refunds.clone())
            .unwrap_or_default()
    }

    /// Sum of charges minus refunds.
    #[must_use]
    pub fn net_collected(&self) -> Money {
        let charged: u64 = self.charges().iter().map(|r| r.amount.minor()).sum();
        let refunded: u64 = self.refunds().iter().map(|r| r.amount.minor()).sum();
        Money::from_minor(charged.saturating_sub(refunded))
    }

    fn next_outcome(&self) -> Result<(), PaymentError> {
        let mut ledger = self
            .ledger
            .lock()
            .map_err(|_| PaymentError::Timeout)?;
        if ledger.decline_all {
            return Err(PaymentError::Declined {
                reason: "scripted decline".to_string(),
            });
        }
        ledger.outcomes.pop_front().unwrap_or(Ok(()))
    }
}

impl PaymentGateway for ScriptedPaymentGateway {
    fn charge(
        &self,
        payment_id: PaymentId,
        amount: Money,
        _method: PaymentMethod,
    ) -> GatewayFuture<'_, PaymentReceipt> {
        Box::pin(async move {
            self.next_outcome()?;

            let receipt = PaymentReceipt {
                payment_id,
                transaction_id: format!("scripted_txn_{}", uuid::Uuid::new_v4()),
                amount,
            };
            self.ledger
                .lock()
                .map_err(|_| PaymentError::Timeout)?
                .charges
                .push(receipt.clone());
            Ok(receipt)
        })
    }

    fn refund(&self, receipt: &PaymentReceipt) -> GatewayFuture<'_, String> {
        let receipt = receipt.clone();
        Box::pin(async move {
            let mut ledger = self.ledger.lock().map_err(|_| PaymentError::RefundFailed {
                reason: "ledger unavailable".to_string(),
            })?;
            if !ledger
                .charges
                .iter()
                .any(|charge| charge.transaction_id == receipt.transaction_id)
            {
                return Err(PaymentError::RefundFailed {
                    reason: format!("unknown transaction {}", receipt.transaction_id),
                });
            }
            let refund_id = format!("scripted_refund_{}", receipt.payment_id);
            ledger.refunds.push(receipt);
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
    async fn charges_succeed_by_default_and_are_recorded() {
        let gateway = ScriptedPaymentGateway::new();
        let amount = Money::from_minor(29_900);

        let receipt = gateway
            .charge(PaymentId::new(), amount, card())
            .await
            .unwrap();

        assert_eq!(receipt.amount, amount);
        assert!(receipt.transaction_id.starts_with("scripted_txn_"));
        assert_eq!(gateway.charges(), vec![receipt]);
        assert_eq!(gateway.net_collected(), amount);
    }

    #[tokio::test]
    async fn queued_decline_is_used_once() {
        let gateway = ScriptedPaymentGateway::new();
        gateway.decline_next("insufficient funds");

        let first = gateway
            .charge(PaymentId::new(), Money::from_minor(100), card())
            .await;
        let second = gateway
            .charge(PaymentId::new(), Money::from_minor(100), card())
            .await;

        assert!(matches!(first, Err(PaymentError::Declined { .. })));
        assert!(second.is_ok());
        assert_eq!(gateway.charges().len(), 1);
    }

    #[tokio::test]
    async fn refund_balances_the_ledger() {
        let gateway = ScriptedPaymentGateway::new();
        let receipt = gateway
            .charge(PaymentId::new(), Money::from_minor(50_000), card())
            .await
            .unwrap();

        gateway.refund(&receipt).await.unwrap();

        assert_eq!(gateway.refunds().len(), 1);
        assert_eq!(gateway.net_collected(), Money::ZERO);
    }

    #[tokio::test]
    async fn always_decline_never_records_a_charge() {
        let gateway = ScriptedPaymentGateway::always_decline();
        let result = gateway
            .charge(PaymentId::new(), Money::from_minor(100), card())
            .await;

        assert!(result.is_err());
        assert!(gateway.charges().is_empty());
    }
}
