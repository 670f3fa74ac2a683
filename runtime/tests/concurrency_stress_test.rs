//! Concurrency stress tests for last-spot scenarios.
//!
//! Store latency is injected so concurrent bookings read the same versions
//! and collide on the conditional write; the retry loop must then settle
//! every request with a correct answer and no over-booking.
//!
//! Run with: `cargo test --test concurrency_stress_test -- --nocapture`

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use chrono::Utc;
use eventbook_core::booking::BookingRejection;
use eventbook_core::environment::SystemClock;
use eventbook_core::error::BookingError;
use eventbook_core::payment::PaymentMethod;
use eventbook_core::types::{Money, UserId};
use eventbook_runtime::{BookingConfig, BookingService};
use eventbook_testing::fixtures::{EventFixture, session_for};
use eventbook_testing::{InMemoryStore, ScriptedPaymentGateway};
use std::sync::Arc;
use std::time::Duration;

fn service(store: &InMemoryStore, payments: &ScriptedPaymentGateway) -> Arc<BookingService> {
    Arc::new(BookingService::new(
        Arc::new(store.clone()),
        Arc::new(payments.clone()),
        Arc::new(SystemClock),
        &BookingConfig {
            retry_timeout: Duration::from_secs(10),
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(20),
        },
    ))
}

async fn race(
    service: &Arc<BookingService>,
    event_id: eventbook_core::types::EventId,
    users: &[UserId],
    payment: Option<PaymentMethod>,
) -> Vec<Result<u32, BookingError>> {
    let handles: Vec<_> = users
        .iter()
        .map(|user_id| {
            let service = Arc::clone(service);
            let session = session_for(*user_id, Utc::now());
            let payment = payment.clone();
            tokio::spawn(async move {
                service
                    .book(Some(&session), event_id, payment)
                    .await
                    .map(|confirmation| confirmation.current_attendees)
            })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    results
}

/// Test: two users race for the last spot (max 2, current 1).
///
/// Exactly one wins and the other sees `EVENT_FULL`.
#[tokio::test]
async fn test_last_spot_two_users() {
    let store = InMemoryStore::new().with_latency(Duration::from_millis(5));
    let payments = ScriptedPaymentGateway::new();
    let event = store.seed_event(EventFixture::new().capacity(2).attendees(1).build());
    let users = [UserId::new(), UserId::new()];

    let results = race(&service(&store, &payments), event.id, &users, None).await;

    let wins = results.iter().filter(|r| r.is_ok()).count();
    let full = results
        .iter()
        .filter(|r| matches!(r, Err(BookingError::Rejected(BookingRejection::EventFull))))
        .count();
    assert_eq!((wins, full), (1, 1));

    let stored = store.event(event.id).unwrap().record;
    assert_eq!(stored.current_attendees, 2);
    assert!(stored.check_invariants().is_ok());
}

/// Test: 50 concurrent bookings for 5 spots.
///
/// Exactly 5 succeed, 45 see `EVENT_FULL`, and every winner has a matching
/// booked-events entry.
#[tokio::test]
async fn test_fifty_users_five_spots() {
    let store = InMemoryStore::new().with_latency(Duration::from_millis(2));
    let payments = ScriptedPaymentGateway::new();
    let event = store.seed_event(EventFixture::new().capacity(5).build());
    let users: Vec<UserId> = (0..50).map(|_| UserId::new()).collect();

    let results = race(&service(&store, &payments), event.id, &users, None).await;

    let wins = results.iter().filter(|r| r.is_ok()).count();
    let full = results
        .iter()
        .filter(|r| matches!(r, Err(BookingError::Rejected(BookingRejection::EventFull))))
        .count();
    assert_eq!(wins, 5);
    assert_eq!(full, 45);

    let stored = store.event(event.id).unwrap().record;
    assert_eq!(stored.current_attendees, 5);
    assert!(stored.check_invariants().is_ok());
    for user_id in &stored.attendees {
        let user = store.user(*user_id).unwrap().record;
        assert_eq!(user.booked_events, vec![event.id]);
    }
    assert!(store.conflicts_seen() > 0, "latency should force at least one conflict");
}

/// Test: one user books the same event from two tabs at once.
#[tokio::test]
async fn test_same_user_double_submit() {
    let store = InMemoryStore::new().with_latency(Duration::from_millis(5));
    let payments = ScriptedPaymentGateway::new();
    let event = store.seed_event(EventFixture::new().capacity(10).build());
    let alice = UserId::new();

    let results = race(&service(&store, &payments), event.id, &[alice, alice], None).await;

    let wins = results.iter().filter(|r| r.is_ok()).count();
    let duplicates = results
        .iter()
        .filter(|r| {
            matches!(
                r,
                Err(BookingError::Rejected(BookingRejection::AlreadyRegistered))
            )
        })
        .count();
    assert_eq!((wins, duplicates), (1, 1));
    assert_eq!(store.event(event.id).unwrap().record.current_attendees, 1);
    assert_eq!(store.user(alice).unwrap().record.booked_events, vec![event.id]);
}

/// Test: paid race for one spot never keeps money for a spot it did not give.
#[tokio::test]
async fn test_paid_race_refunds_the_loser() {
    let store = InMemoryStore::new().with_latency(Duration::from_millis(5));
    let payments = ScriptedPaymentGateway::new();
    let price = Money::from_minor(75_000);
    let event = store.seed_event(EventFixture::new().capacity(1).paid(price.minor()).build());
    let users: Vec<UserId> = (0..4).map(|_| UserId::new()).collect();
    let card = PaymentMethod::Card {
        last_four: "4242".to_string(),
    };

    let results = race(&service(&store, &payments), event.id, &users, Some(card)).await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(payments.net_collected(), price);
    assert_eq!(payments.charges().len() - payments.refunds().len(), 1);
    assert_eq!(store.event(event.id).unwrap().record.current_attendees, 1);
}

/// Test: 40 concurrent bookings on a roomy event with the default config.
///
/// Every conflict here is plain contention with spots left, so every caller
/// gets a spot and none sees `STORE_ERROR`.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_contention_with_spots_left_never_surfaces_store_error() {
    let store = InMemoryStore::new().with_latency(Duration::from_millis(2));
    let payments = ScriptedPaymentGateway::new();
    let event = store.seed_event(EventFixture::new().capacity(100).build());
    let users: Vec<UserId> = (0..40).map(|_| UserId::new()).collect();
    let service = Arc::new(BookingService::new(
        Arc::new(store.clone()),
        Arc::new(payments.clone()),
        Arc::new(SystemClock),
        &BookingConfig::default(),
    ));

    let results = race(&service, event.id, &users, None).await;

    let store_errors = results
        .iter()
        .filter(|r| matches!(r, Err(BookingError::Store(_))))
        .count();
    assert_eq!(store_errors, 0);
    assert!(results.iter().all(Result::is_ok));

    let stored = store.event(event.id).unwrap().record;
    assert_eq!(stored.current_attendees, 40);
    assert!(stored.check_invariants().is_ok());
}
