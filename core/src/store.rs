//! Store traits for the event, user and session records.
//!
//! The booking operation never locks in-process: callers are independent
//! processes, so the store itself provides the atomic primitive. Every record
//! carries a [`Version`]; [`BookingStore::reserve_spot`] applies the
//! three-part booking write only if both records are still at the versions
//! the decision was made against, and reports
//! [`StoreError::ConcurrencyConflict`] otherwise so the caller can re-read
//! and retry.
//!
//! # Implementations
//!
//! - `PostgresStore` (in `eventbook-postgres`): production implementation
//! - `InMemoryStore` (in `eventbook-testing`): fast, deterministic tests and
//!   local development
//!
//! # Dyn Compatibility
//!
//! The traits return `Pin<Box<dyn Future>>` instead of using `async fn` so
//! services can hold them as `Arc<dyn BookingStore>`.

use crate::event::{EventDetails, EventRecord, Pricing};
use crate::session::Session;
use crate::types::{EventId, SessionId, UserId, Version, Versioned};
use crate::user::UserRecord;
use chrono::{DateTime, Utc};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by store calls.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Which record a conflict was detected on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordRef {
    /// An event record
    Event(EventId),
    /// A user record
    User(UserId),
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event(id) => write!(f, "event {id}"),
            Self::User(id) => write!(f, "user {id}"),
        }
    }
}

/// Errors that can occur during store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Optimistic concurrency conflict: the record moved past the expected version.
    ///
    /// Transient. The caller re-reads and retries rather than surfacing it.
    #[error("Concurrency conflict on {record}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The record where the conflict occurred.
        record: RecordRef,
        /// The version the write was decided against.
        expected: Version,
        /// The version currently stored.
        actual: Version,
    },

    /// Event not found.
    #[error("Event not found: {0}")]
    EventNotFound(EventId),

    /// An event with this id already exists.
    #[error("Event already exists: {0}")]
    DuplicateEvent(EventId),

    /// The write would break a record invariant; never retried.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Database connection or query error.
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Whether the error is a version conflict worth retrying.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

/// The booking write: counter +1, attendee insert, booked-list append.
///
/// Applied as a single all-or-nothing update, conditional on both records
/// still being at the expected versions. A user without a record is expected
/// at [`Version::INITIAL`] and gets created by the write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpotReservation {
    /// Event to take a spot in
    pub event_id: EventId,
    /// User taking the spot
    pub user_id: UserId,
    /// Event version the booking decision read
    pub expected_event_version: Version,
    /// User version the booking decision read
    pub expected_user_version: Version,
    /// Timestamp written to the event's `updated_at`
    pub booked_at: DateTime<Utc>,
}

/// An organizer edit of an existing event, conditional on its version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventRevision {
    /// Event to edit
    pub event_id: EventId,
    /// Version the edit was prepared against
    pub expected_version: Version,
    /// New descriptive fields
    pub details: EventDetails,
    /// New pricing
    pub pricing: Pricing,
    /// New capacity (never below the current attendee count)
    pub max_attendees: u32,
    /// Edit time
    pub updated_at: DateTime<Utc>,
}

/// Reads and the atomic booking write.
pub trait BookingStore: Send + Sync {
    /// Fetch an event record by id, `None` when absent.
    ///
    /// # Errors
    ///
    /// - `Database`: connection or query failed
    /// - `Serialization`: stored record could not be decoded
    fn load_event(&self, event_id: EventId) -> StoreFuture<'_, Option<Versioned<EventRecord>>>;

    /// Fetch a user record by id, `None` when the user never booked anything.
    ///
    /// # Errors
    ///
    /// - `Database`: connection or query failed
    fn load_user(&self, user_id: UserId) -> StoreFuture<'_, Option<Versioned<UserRecord>>>;

    /// Apply the booking write atomically.
    ///
    /// Returns the event's new version.
    ///
    /// # Errors
    ///
    /// - `ConcurrencyConflict`: either record moved past its expected version;
    ///   nothing was written
    /// - `EventNotFound`: the event does not exist
    /// - `ConstraintViolation`: the write would exceed capacity or duplicate an
    ///   attendee; nothing was written
    /// - `Database`: connection or query failed; nothing was written
    fn reserve_spot(&self, reservation: SpotReservation) -> StoreFuture<'_, Version>;
}

/// Organizer-side event management.
pub trait EventCatalog: BookingStore {
    /// Store a brand-new event at version 1.
    ///
    /// # Errors
    ///
    /// - `DuplicateEvent`: an event with this id exists
    /// - `Database`: connection or query failed
    fn insert_event(&self, event: EventRecord) -> StoreFuture<'_, Version>;

    /// Apply an organizer edit if the event is still at the expected version.
    ///
    /// Returns the event's new version. Attendance counters are untouched.
    ///
    /// # Errors
    ///
    /// - `ConcurrencyConflict`: the event moved on
    /// - `EventNotFound`: the event does not exist
    /// - `ConstraintViolation`: new capacity below the attendee count
    /// - `Database`: connection or query failed
    fn update_event(&self, revision: EventRevision) -> StoreFuture<'_, Version>;

    /// Every event, newest date first.
    ///
    /// # Errors
    ///
    /// - `Database`: connection or query failed
    fn list_events(&self) -> StoreFuture<'_, Vec<EventRecord>>;

    /// Events owned by `organizer`, newest date first.
    ///
    /// # Errors
    ///
    /// - `Database`: connection or query failed
    fn events_by_organizer(&self, organizer: UserId) -> StoreFuture<'_, Vec<EventRecord>>;
}

/// Lookup of sessions issued by the sign-in flow.
pub trait SessionStore: Send + Sync {
    /// Fetch a session by id, `None` when unknown.
    ///
    /// Expiry is checked by the caller against its clock.
    ///
    /// # Errors
    ///
    /// - `Database`: connection or query failed
    fn find_session(&self, session_id: SessionId) -> StoreFuture<'_, Option<Session>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_conflict_error_display() {
        let event_id = EventId::new();
        let error = StoreError::ConcurrencyConflict {
            record: RecordRef::Event(event_id),
            expected: Version::new(5),
            actual: Version::new(7),
        };

        let display = format!("{error}");
        assert!(display.contains(&format!("event {event_id}")));
        assert!(display.contains("expected version 5"));
        assert!(display.contains("found 7"));
        assert!(error.is_conflict());
    }

    #[test]
    fn other_errors_are_not_conflicts() {
        assert!(!StoreError::EventNotFound(EventId::new()).is_conflict());
        assert!(!StoreError::ConstraintViolation("full".to_string()).is_conflict());
    }
}
