//! # Eventbook Testing
//!
//! Testing utilities for the eventbook crates.
//!
//! This crate provides:
//! - [`InMemoryStore`]: every store trait over one mutex-guarded map, with
//!   the same conditional-write semantics as the `PostgreSQL` store
//! - [`ScriptedPaymentGateway`]: queued payment outcomes plus a call log
//! - [`FixedClock`]: deterministic time
//! - [`fixtures`]: event builders
//! - [`properties`]: proptest strategies for booking scripts
//!
//! ## Example
//!
//! ```ignore
//! use eventbook_testing::{fixtures::EventFixture, InMemoryStore};
//!
//! #[tokio::test]
//! async fn test_booking_flow() {
//!     let store = InMemoryStore::new();
//!     let event = store.seed_event(EventFixture::new().capacity(2).build());
//!
//!     let service = booking_service(store.clone());
//!     service.book(Some(&session), event.id, None).await?;
//!
//!     let stored = store.event(event.id).unwrap();
//!     assert_eq!(stored.record.current_attendees, 1);
//! }
//! ```

pub mod fixtures;
pub mod memory;
pub mod payment;

use chrono::{DateTime, Utc};
use eventbook_core::environment::Clock;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::Mutex;

    /// Fixed clock for deterministic tests
    ///
    /// Returns the same time until [`FixedClock::advance`] moves it.
    ///
    /// # Example
    ///
    /// ```
    /// use eventbook_testing::mocks::FixedClock;
    /// use eventbook_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug)]
    pub struct FixedClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Move the clock forward.
        pub fn advance(&self, by: chrono::Duration) {
            if let Ok(mut time) = self.time.lock() {
                *time += by;
            }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
                .lock()
                .map_or_else(|poisoned| *poisoned.into_inner(), |time| *time)
        }
    }

    /// Create a default fixed clock for tests (2026-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
                .map_or_else(|_| DateTime::<Utc>::default(), |time| time.with_timezone(&Utc)),
        )
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// One step of a booking script: which of the script's users books.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BookingAttempt {
        /// Index into the script's user pool
        pub user: usize,
    }

    /// A random event capacity plus a sequence of booking attempts.
    ///
    /// Users are drawn from a small pool so duplicates happen often and the
    /// sequences regularly run past capacity.
    #[derive(Debug, Clone)]
    pub struct BookingScript {
        /// Event capacity
        pub capacity: u32,
        /// Size of the user pool
        pub users: usize,
        /// Attempts in order
        pub attempts: Vec<BookingAttempt>,
    }

    /// Strategy for [`BookingScript`].
    pub fn booking_script() -> impl Strategy<Value = BookingScript> {
        (1_u32..8, 1_usize..10).prop_flat_map(|(capacity, users)| {
            prop::collection::vec((0..users).prop_map(|user| BookingAttempt { user }), 0..24)
                .prop_map(move |attempts| BookingScript {
                    capacity,
                    users,
                    attempts,
                })
        })
    }
}

// Re-export commonly used items
pub use memory::InMemoryStore;
pub use mocks::{FixedClock, test_clock};
pub use payment::ScriptedPaymentGateway;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn test_fixed_clock_advances() {
        let clock = test_clock();
        let before = clock.now();
        clock.advance(chrono::Duration::minutes(10));
        assert_eq!(clock.now() - before, chrono::Duration::minutes(10));
    }
}
