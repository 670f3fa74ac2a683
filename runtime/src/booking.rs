//! The booking operation.
//!
//! [`BookingService::book`] ties the pure decision to the outside world:
//!
//! 1. reject callers without a live session before reading anything
//! 2. read the event and the caller's user record (with versions)
//! 3. [`decide`]; a rejection returns without writing or charging
//! 4. charge paid events before the first commit
//! 5. commit through [`BookingStore::reserve_spot`]; on a version conflict
//!    back off, reload, decide again and recommit
//!
//! Conflicts keep being retried until [`BookingConfig::retry_timeout`] runs
//! out; a busy event with spots left is never reported as a store error.
//! A retry that sees a different price refunds the earlier charge and charges
//! the current amount, so the receipt always matches the committed terms.
//! A captured charge is refunded if the booking ends in any error after it.

use crate::metrics::{BookingMetrics, PaymentMetrics, outcome_label};
use crate::retry::RetryPolicy;
use chrono::{DateTime, Utc};
use eventbook_core::booking::{BookingPlan, decide};
use eventbook_core::environment::Clock;
use eventbook_core::error::BookingError;
use eventbook_core::event::EventRecord;
use eventbook_core::payment::{PaymentGateway, PaymentMethod, PaymentReceipt};
use eventbook_core::session::Session;
use eventbook_core::store::{BookingStore, StoreError};
use eventbook_core::types::{EventId, Money, PaymentId, UserId, Version, Versioned};
use eventbook_core::user::UserRecord;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Tuning for the commit loop.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingConfig {
    /// How long one call keeps retrying version conflicts
    pub retry_timeout: Duration,
    /// Backoff before the first retry
    pub initial_delay: Duration,
    /// Backoff cap
    pub max_delay: Duration,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            retry_timeout: Duration::from_secs(10),
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(500),
        }
    }
}

impl BookingConfig {
    /// Backoff schedule for conflict retries.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_attempts(usize::MAX)
            .max_elapsed(self.retry_timeout)
            .initial_delay(self.initial_delay)
            .max_delay(self.max_delay)
            .build()
    }
}

/// What a successful booking returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingConfirmation {
    /// Booked event
    pub event_id: EventId,
    /// Booking user
    pub user_id: UserId,
    /// Attendee count including this booking
    pub current_attendees: u32,
    /// Spots left after this booking
    pub available_spots: u32,
    /// Capacity
    pub max_attendees: u32,
    /// Event version written by the booking
    pub event_version: Version,
    /// Receipt for paid events
    pub payment: Option<PaymentReceipt>,
    /// Commit time
    pub booked_at: DateTime<Utc>,
}

/// Runs the booking operation against a store and a payment gateway.
#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn BookingStore>,
    payments: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for BookingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingService")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl BookingService {
    /// Creates a booking service.
    #[must_use]
    pub fn new(
        store: Arc<dyn BookingStore>,
        payments: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
        config: &BookingConfig,
    ) -> Self {
        Self {
            store,
            payments,
            clock,
            retry: config.retry_policy(),
        }
    }

    /// Book one spot in `event_id` for the session's user.
    ///
    /// `payment_method` is only used for paid events.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotAuthenticated`]: no session, or it expired
    /// - [`BookingError::EventNotFound`]: no such event
    /// - [`BookingError::Rejected`]: already registered, or the event is full
    /// - [`BookingError::PaymentFailed`]: no payment method, or the charge
    ///   was declined
    /// - [`BookingError::Store`]: store failure, or version conflicts outlasted
    ///   the retry timeout
    ///
    /// None of these leave a partial write or an unrefunded charge behind.
    #[tracing::instrument(
        name = "book",
        skip(self, session, payment_method),
        fields(user_id = tracing::field::Empty)
    )]
    pub async fn book(
        &self,
        session: Option<&Session>,
        event_id: EventId,
        payment_method: Option<PaymentMethod>,
    ) -> Result<BookingConfirmation, BookingError> {
        let started = Instant::now();
        let result = self.run(session, event_id, payment_method).await;

        let outcome = match &result {
            Ok(_) => "confirmed",
            Err(error) => outcome_label(error.code()),
        };
        BookingMetrics::record_outcome(outcome, started.elapsed());

        match &result {
            Ok(confirmation) => tracing::info!(
                current_attendees = confirmation.current_attendees,
                available_spots = confirmation.available_spots,
                "Booking confirmed"
            ),
            Err(error) => tracing::info!(code = error.code(), %error, "Booking refused"),
        }
        result
    }

    async fn run(
        &self,
        session: Option<&Session>,
        event_id: EventId,
        payment_method: Option<PaymentMethod>,
    ) -> Result<BookingConfirmation, BookingError> {
        let user_id = self.authenticate(session)?;
        tracing::Span::current().record("user_id", tracing::field::display(user_id));

        let started = Instant::now();
        let mut receipt: Option<PaymentReceipt> = None;
        let mut attempt = 1;

        loop {
            let step = self
                .attempt(event_id, user_id, &mut receipt, payment_method.as_ref())
                .await;

            let conflict = match step {
                Ok(confirmation) => return Ok(confirmation),
                Err(Attempt::Conflict(conflict)) => conflict,
                Err(Attempt::Failed(error)) => {
                    self.compensate(receipt.take(), "booking failed").await;
                    return Err(error);
                }
            };

            BookingMetrics::record_conflict();
            let Some(delay) = self.retry.next_delay(attempt, started.elapsed()) else {
                tracing::warn!(attempt, %conflict, "Booking conflicts outlasted the retry timeout");
                self.compensate(receipt.take(), "booking failed").await;
                return Err(BookingError::Store(conflict));
            };

            tracing::debug!(
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                %conflict,
                "Booking lost a version race, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    fn authenticate(&self, session: Option<&Session>) -> Result<UserId, BookingError> {
        let now = self.clock.now();
        session
            .filter(|session| session.is_active_at(now))
            .map(|session| session.user_id)
            .ok_or(BookingError::NotAuthenticated)
    }

    /// One read-decide-(charge)-commit round.
    async fn attempt(
        &self,
        event_id: EventId,
        user_id: UserId,
        receipt: &mut Option<PaymentReceipt>,
        payment_method: Option<&PaymentMethod>,
    ) -> Result<BookingConfirmation, Attempt> {
        let (event, user) = self.load(event_id, user_id).await.map_err(Attempt::from)?;

        let plan = decide(&event, &user, user_id).map_err(|r| Attempt::Failed(r.into()))?;

        let paid = receipt.as_ref().map(|captured| captured.amount);
        if paid != plan.charge {
            if paid.is_some() {
                tracing::info!(?paid, due = ?plan.charge, "Price changed since the charge");
                self.compensate(receipt.take(), "price changed").await;
            }
            if let Some(amount) = plan.charge {
                let captured = self
                    .charge(&plan, amount, payment_method.cloned())
                    .await
                    .map_err(Attempt::Failed)?;
                *receipt = Some(captured);
            }
        }

        let booked_at = self.clock.now();
        let event_version = self
            .store
            .reserve_spot(plan.reservation(booked_at))
            .await
            .map_err(Attempt::from)?;

        Ok(confirm(&plan, event.record, event_version, receipt.clone(), booked_at))
    }

    async fn load(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<(Versioned<EventRecord>, Versioned<UserRecord>), StoreError> {
        let (event, user) = futures::future::try_join(
            self.store.load_event(event_id),
            self.store.load_user(user_id),
        )
        .await?;

        let event = event.ok_or(StoreError::EventNotFound(event_id))?;
        let user =
            user.unwrap_or_else(|| Versioned::new(UserRecord::empty(user_id), Version::INITIAL));
        Ok((event, user))
    }

    async fn charge(
        &self,
        plan: &BookingPlan,
        amount: Money,
        method: Option<PaymentMethod>,
    ) -> Result<PaymentReceipt, BookingError> {
        let Some(method) = method else {
            PaymentMetrics::record("failed");
            return Err(BookingError::PaymentFailed {
                reason: "A payment method is required for paid events".to_string(),
            });
        };

        let payment_id = PaymentId::new();
        match self.payments.charge(payment_id, amount, method).await {
            Ok(receipt) => {
                PaymentMetrics::record("succeeded");
                tracing::info!(
                    %payment_id,
                    event_id = %plan.event_id,
                    %amount,
                    "Payment captured"
                );
                Ok(receipt)
            }
            Err(error) => {
                PaymentMetrics::record("failed");
                tracing::info!(%payment_id, %error, "Payment failed");
                Err(error.into())
            }
        }
    }

    async fn compensate(&self, receipt: Option<PaymentReceipt>, reason: &'static str) {
        let Some(receipt) = receipt else {
            return;
        };
        match self.payments.refund(&receipt).await {
            Ok(refund_id) => {
                PaymentMetrics::record("refunded");
                tracing::info!(
                    transaction_id = %receipt.transaction_id,
                    refund_id = %refund_id,
                    reason,
                    "Charge refunded"
                );
            }
            Err(error) => {
                PaymentMetrics::record("refund_failed");
                tracing::error!(
                    transaction_id = %receipt.transaction_id,
                    amount = %receipt.amount,
                    %error,
                    "Refund failed; charge needs manual reconciliation"
                );
            }
        }
    }
}

/// How a single round ended, when it did not book.
enum Attempt {
    /// Lost a version race; worth another round
    Conflict(StoreError),
    /// Final answer
    Failed(BookingError),
}

impl From<StoreError> for Attempt {
    fn from(error: StoreError) -> Self {
        if error.is_conflict() {
            Self::Conflict(error)
        } else {
            Self::Failed(error.into())
        }
    }
}

fn confirm(
    plan: &BookingPlan,
    event: EventRecord,
    event_version: Version,
    payment: Option<PaymentReceipt>,
    booked_at: DateTime<Utc>,
) -> BookingConfirmation {
    let (event, _) = plan.apply(event, UserRecord::empty(plan.user_id));
    BookingConfirmation {
        event_id: plan.event_id,
        user_id: plan.user_id,
        current_attendees: event.current_attendees,
        available_spots: event.available_spots(),
        max_attendees: event.max_attendees,
        event_version,
        payment,
        booked_at,
    }
}
