//! In-memory implementation of every eventbook store trait.
//!
//! One mutex guards events, users and sessions together, so
//! [`BookingStore::reserve_spot`] checks both versions and applies the
//! three-part write under the same lock: all or nothing, exactly like the
//! `PostgreSQL` transaction.
//!
//! The mutex is never held across an `.await`. An optional latency is slept
//! *before* each operation takes the lock, which lets tests force concurrent
//! bookings to read the same versions and collide on the write.

use eventbook_core::booking::take_spot;
use eventbook_core::event::EventRecord;
use eventbook_core::session::Session;
use eventbook_core::store::{
    BookingStore, EventCatalog, EventRevision, RecordRef, SessionStore, SpotReservation,
    StoreError, StoreFuture,
};
use eventbook_core::types::{EventId, SessionId, UserId, Version, Versioned};
use eventbook_core::user::UserRecord;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct Records {
    events: HashMap<EventId, Versioned<EventRecord>>,
    users: HashMap<UserId, Versioned<UserRecord>>,
    sessions: HashMap<SessionId, Session>,
}

/// In-memory store for tests and local development.
///
/// Cloning is cheap and every clone shares the same records.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    records: Arc<Mutex<Records>>,
    latency: Option<Duration>,
    reservation_calls: Arc<AtomicUsize>,
    conflicts: Arc<AtomicUsize>,
    forced_conflicts: Arc<AtomicUsize>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before every operation.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make the next `count` calls to `reserve_spot` fail with a conflict
    /// without writing, as if another writer got there first.
    pub fn force_conflicts(&self, count: usize) {
        self.forced_conflicts.store(count, Ordering::SeqCst);
    }

    /// Number of `reserve_spot` calls so far (including failed ones).
    #[must_use]
    pub fn reservation_calls(&self) -> usize {
        self.reservation_calls.load(Ordering::SeqCst)
    }

    /// Number of `reserve_spot` calls that failed with a version conflict.
    #[must_use]
    pub fn conflicts_seen(&self) -> usize {
        self.conflicts.load(Ordering::SeqCst)
    }

    /// Insert or overwrite an event at version 1, bypassing validation.
    pub fn seed_event(&self, event: EventRecord) -> EventRecord {
        if let Ok(mut records) = self.records.lock() {
            records
                .events
                .insert(event.id, Versioned::new(event.clone(), Version::new(1)));
        }
        event
    }

    /// Register a session.
    pub fn seed_session(&self, session: Session) -> Session {
        if let Ok(mut records) = self.records.lock() {
            records.sessions.insert(session.session_id, session.clone());
        }
        session
    }

    /// Snapshot of an event.
    #[must_use]
    pub fn event(&self, event_id: EventId) -> Option<Versioned<EventRecord>> {
        self.records
            .lock()
            .ok()
            .and_then(|records| records.events.get(&event_id).cloned())
    }

    /// Snapshot of a user.
    #[must_use]
    pub fn user(&self, user_id: UserId) -> Option<Versioned<UserRecord>> {
        self.records
            .lock()
            .ok()
            .and_then(|records| records.users.get(&user_id).cloned())
    }

    /// Snapshot of every event record.
    #[must_use]
    pub fn all_events(&self) -> Vec<EventRecord> {
        self.records
            .lock()
            .map(|records| records.events.values().map(|v| v.record.clone()).collect())
            .unwrap_or_default()
    }

    /// Snapshot of every user record.
    #[must_use]
    pub fn all_users(&self) -> Vec<UserRecord> {
        self.records
            .lock()
            .map(|records| records.users.values().map(|v| v.record.clone()).collect())
            .unwrap_or_default()
    }

    fn run<T, F>(&self, op: F) -> StoreFuture<'_, T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Records) -> Result<T, StoreError> + Send + 'static,
    {
        let records = Arc::clone(&self.records);
        let latency = self.latency;
        Box::pin(async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            let mut guard = records
                .lock()
                .map_err(|_| StoreError::Database("in-memory store lock poisoned".to_string()))?;
            op(&mut guard)
        })
    }
}

fn newest_first(events: &mut [EventRecord]) {
    events.sort_by(|a, b| {
        (b.details.date, b.details.time, b.created_at).cmp(&(
            a.details.date,
            a.details.time,
            a.created_at,
        ))
    });
}

fn reserve(records: &mut Records, reservation: &SpotReservation) -> Result<Version, StoreError> {
    let event_entry = records
        .events
        .get(&reservation.event_id)
        .ok_or(StoreError::EventNotFound(reservation.event_id))?;
    if event_entry.version != reservation.expected_event_version {
        return Err(StoreError::ConcurrencyConflict {
            record: RecordRef::Event(reservation.event_id),
            expected: reservation.expected_event_version,
            actual: event_entry.version,
        });
    }

    let user_version = records
        .users
        .get(&reservation.user_id)
        .map_or(Version::INITIAL, |user| user.version);
    if user_version != reservation.expected_user_version {
        return Err(StoreError::ConcurrencyConflict {
            record: RecordRef::User(reservation.user_id),
            expected: reservation.expected_user_version,
            actual: user_version,
        });
    }

    let event = &event_entry.record;
    if event.is_full() {
        return Err(StoreError::ConstraintViolation(format!(
            "event {} is at capacity {}",
            event.id, event.max_attendees
        )));
    }
    if event.has_attendee(reservation.user_id) {
        return Err(StoreError::ConstraintViolation(format!(
            "user {} already attends event {}",
            reservation.user_id, event.id
        )));
    }

    // Both checks passed: mutate copies, then swap them in together.
    let mut event = event.clone();
    let mut user = records
        .users
        .get(&reservation.user_id)
        .map_or_else(|| UserRecord::empty(reservation.user_id), |u| u.record.clone());
    take_spot(&mut event, &mut user, reservation.booked_at);

    let event_version = reservation.expected_event_version.next();
    records
        .events
        .insert(reservation.event_id, Versioned::new(event, event_version));
    records.users.insert(
        reservation.user_id,
        Versioned::new(user, reservation.expected_user_version.next()),
    );
    Ok(event_version)
}

impl BookingStore for InMemoryStore {
    fn load_event(&self, event_id: EventId) -> StoreFuture<'_, Option<Versioned<EventRecord>>> {
        self.run(move |records| Ok(records.events.get(&event_id).cloned()))
    }

    fn load_user(&self, user_id: UserId) -> StoreFuture<'_, Option<Versioned<UserRecord>>> {
        self.run(move |records| Ok(records.users.get(&user_id).cloned()))
    }

    fn reserve_spot(&self, reservation: SpotReservation) -> StoreFuture<'_, Version> {
        self.reservation_calls.fetch_add(1, Ordering::SeqCst);

        let forced = self
            .forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        let conflicts = Arc::clone(&self.conflicts);

        self.run(move |records| {
            let result = if forced {
                let actual = records
                    .events
                    .get(&reservation.event_id)
                    .map_or(Version::INITIAL, |e| e.version);
                Err(StoreError::ConcurrencyConflict {
                    record: RecordRef::Event(reservation.event_id),
                    expected: reservation.expected_event_version,
                    actual,
                })
            } else {
                reserve(records, &reservation)
            };
            if result.as_ref().is_err_and(StoreError::is_conflict) {
                conflicts.fetch_add(1, Ordering::SeqCst);
            }
            result
        })
    }
}

impl EventCatalog for InMemoryStore {
    fn insert_event(&self, event: EventRecord) -> StoreFuture<'_, Version> {
        self.run(move |records| {
            if records.events.contains_key(&event.id) {
                return Err(StoreError::DuplicateEvent(event.id));
            }
            let version = Version::new(1);
            records.events.insert(event.id, Versioned::new(event, version));
            Ok(version)
        })
    }

    fn update_event(&self, revision: EventRevision) -> StoreFuture<'_, Version> {
        self.run(move |records| {
            let entry = records
                .events
                .get_mut(&revision.event_id)
                .ok_or(StoreError::EventNotFound(revision.event_id))?;
            if entry.version != revision.expected_version {
                return Err(StoreError::ConcurrencyConflict {
                    record: RecordRef::Event(revision.event_id),
                    expected: revision.expected_version,
                    actual: entry.version,
                });
            }
            if revision.max_attendees < entry.record.current_attendees {
                return Err(StoreError::ConstraintViolation(format!(
                    "capacity {} below {} current attendees",
                    revision.max_attendees, entry.record.current_attendees
                )));
            }

            entry.record.details = revision.details;
            entry.record.pricing = revision.pricing;
            entry.record.max_attendees = revision.max_attendees;
            entry.record.updated_at = revision.updated_at;
            entry.version = entry.version.next();
            Ok(entry.version)
        })
    }

    fn list_events(&self) -> StoreFuture<'_, Vec<EventRecord>> {
        self.run(|records| {
            let mut events: Vec<EventRecord> =
                records.events.values().map(|v| v.record.clone()).collect();
            newest_first(&mut events);
            Ok(events)
        })
    }

    fn events_by_organizer(&self, organizer: UserId) -> StoreFuture<'_, Vec<EventRecord>> {
        self.run(move |records| {
            let mut events: Vec<EventRecord> = records
                .events
                .values()
                .filter(|v| v.record.is_organized_by(organizer))
                .map(|v| v.record.clone())
                .collect();
            newest_first(&mut events);
            Ok(events)
        })
    }
}

impl SessionStore for InMemoryStore {
    fn find_session(&self, session_id: SessionId) -> StoreFuture<'_, Option<Session>> {
        self.run(move |records| Ok(records.sessions.get(&session_id).cloned()))
    }
}
