//! The booking decision.
//!
//! [`decide`] is the pure half of the booking operation: given the event and
//! user records exactly as read (with their versions) it either rejects the
//! request or produces a [`BookingPlan`]. The plan carries the versions it was
//! decided against; the store applies it only if nothing changed since.
//!
//! Checks run in this order:
//!
//! 1. the user already holds a spot → [`BookingRejection::AlreadyRegistered`]
//! 2. `current_attendees >= max_attendees` → [`BookingRejection::EventFull`]
//!
//! Neither check calls out to a payment gateway; a full free or paid event is
//! rejected before any charge is attempted.

use crate::event::EventRecord;
use crate::store::SpotReservation;
use crate::types::{EventId, Money, UserId, Version, Versioned};
use crate::user::UserRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a booking was refused. No state is mutated for either reason.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingRejection {
    /// The user already holds a spot in this event
    #[error("You have already registered for this event")]
    AlreadyRegistered,

    /// No spots left
    #[error("No spots left for this event")]
    EventFull,
}

impl BookingRejection {
    /// Stable error code shown to clients
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::AlreadyRegistered => "ALREADY_REGISTERED",
            Self::EventFull => "EVENT_FULL",
        }
    }
}

/// An accepted booking, not yet written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookingPlan {
    /// Event to take a spot in
    pub event_id: EventId,
    /// User taking the spot
    pub user_id: UserId,
    /// Amount to charge before writing, `None` for free events
    pub charge: Option<Money>,
    /// Event version the decision read
    pub expected_event_version: Version,
    /// User version the decision read
    pub expected_user_version: Version,
}

impl BookingPlan {
    /// The conditional write that commits this plan.
    #[must_use]
    pub const fn reservation(&self, booked_at: DateTime<Utc>) -> SpotReservation {
        SpotReservation {
            event_id: self.event_id,
            user_id: self.user_id,
            expected_event_version: self.expected_event_version,
            expected_user_version: self.expected_user_version,
            booked_at,
        }
    }

    /// The records as they look after the plan is committed.
    #[must_use]
    pub fn apply(&self, mut event: EventRecord, mut user: UserRecord) -> (EventRecord, UserRecord) {
        let booked_at = event.updated_at;
        take_spot(&mut event, &mut user, booked_at);
        (event, user)
    }
}

/// Decide whether `user_id` may take a spot in `event`.
///
/// `user` is the caller's record; pass [`UserRecord::empty`] at
/// [`Version::INITIAL`] for a user who never booked anything.
///
/// # Errors
///
/// Returns the first failed check, see the module docs for the order.
pub fn decide(
    event: &Versioned<EventRecord>,
    user: &Versioned<UserRecord>,
    user_id: UserId,
) -> Result<BookingPlan, BookingRejection> {
    let record = &event.record;

    if record.has_attendee(user_id) || user.record.has_booked(record.id) {
        return Err(BookingRejection::AlreadyRegistered);
    }

    if record.is_full() {
        return Err(BookingRejection::EventFull);
    }

    Ok(BookingPlan {
        event_id: record.id,
        user_id,
        charge: record.pricing.charge(),
        expected_event_version: event.version,
        expected_user_version: user.version,
    })
}

/// The three-part booking mutation on in-memory records.
///
/// Stores that hold whole records call this inside their atomic section; the
/// caller guarantees the decision still holds (same versions).
pub fn take_spot(event: &mut EventRecord, user: &mut UserRecord, booked_at: DateTime<Utc>) {
    event.current_attendees += 1;
    event.attendees.insert(user.id);
    event.updated_at = booked_at;
    user.push_booking(event.id);
}
