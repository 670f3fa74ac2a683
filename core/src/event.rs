//! The event record: descriptive details plus the capacity counters the
//! booking operation guards.
//!
//! # Invariants
//!
//! - `current_attendees <= max_attendees`
//! - `attendees.len() == current_attendees`
//!
//! Only [`crate::booking::BookingPlan::apply`] (through a store's atomic
//! write) changes `current_attendees` and `attendees`. Organizer edits touch
//! [`EventDetails`], [`Pricing`] and `max_attendees`, never the counters.

use crate::types::{EventId, Money, UserId};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Where an event takes place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Venue {
    /// In-person event
    Physical {
        /// Venue name
        venue: String,
        /// City
        city: String,
    },
    /// Online event
    Online {
        /// Streaming/meeting platform
        platform: String,
        /// Join link
        meeting_link: String,
    },
}

impl Venue {
    /// Text fields of the venue, used for search matching.
    #[must_use]
    pub fn searchable_text(&self) -> [&str; 2] {
        match self {
            Self::Physical { venue, city } => [venue, city],
            Self::Online { platform, .. } => [platform, ""],
        }
    }
}

/// Whether and how much attendees pay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "amount", rename_all = "snake_case")]
pub enum Pricing {
    /// Free entry, no payment step
    Free,
    /// Paid entry at this price per spot
    Paid(Money),
}

impl Pricing {
    /// Amount to charge for one spot, `None` for free events.
    #[must_use]
    pub const fn charge(&self) -> Option<Money> {
        match self {
            Self::Free => None,
            Self::Paid(price) => Some(*price),
        }
    }

    /// Whether the event is free
    #[must_use]
    pub const fn is_free(&self) -> bool {
        matches!(self, Self::Free)
    }
}

/// The organizer who owns an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organizer {
    /// Organizer's user id (ownership checks compare against this)
    pub user_id: UserId,
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
}

/// Descriptive, organizer-editable fields of an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetails {
    /// Title
    pub title: String,
    /// Long description
    pub description: String,
    /// Cover image URL
    pub image_url: String,
    /// Category (e.g. "Music", "Tech")
    pub category: String,
    /// Event type (e.g. "Conference", "Workshop")
    pub event_type: String,
    /// Calendar date
    pub date: NaiveDate,
    /// Start time
    pub time: NaiveTime,
    /// Location
    pub venue: Venue,
}

/// Ways an event record can violate its capacity invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// More attendees than spots
    #[error("current attendees {current} exceed max attendees {max}")]
    OverCapacity {
        /// Recorded attendee count
        current: u32,
        /// Capacity
        max: u32,
    },

    /// Counter and attendee set disagree
    #[error("current attendees {counter} but {set_size} entries in the attendee set")]
    CounterMismatch {
        /// Recorded attendee count
        counter: u32,
        /// Size of the attendee set
        set_size: usize,
    },
}

/// A bookable event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event id
    pub id: EventId,
    /// Descriptive fields
    pub details: EventDetails,
    /// Owner
    pub organizer: Organizer,
    /// Free or paid
    pub pricing: Pricing,
    /// Capacity
    pub max_attendees: u32,
    /// Spots taken
    pub current_attendees: u32,
    /// Users holding a spot
    pub attendees: BTreeSet<UserId>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last organizer edit or booking
    pub updated_at: DateTime<Utc>,
}

impl EventRecord {
    /// Creates a fresh event with no attendees.
    #[must_use]
    pub fn new(
        id: EventId,
        details: EventDetails,
        organizer: Organizer,
        pricing: Pricing,
        max_attendees: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            details,
            organizer,
            pricing,
            max_attendees,
            current_attendees: 0,
            attendees: BTreeSet::new(),
            created_at,
            updated_at: created_at,
        }
    }

    /// Spots still open.
    #[must_use]
    pub const fn available_spots(&self) -> u32 {
        self.max_attendees.saturating_sub(self.current_attendees)
    }

    /// Whether no spot is left.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.current_attendees >= self.max_attendees
    }

    /// Whether `user_id` already holds a spot.
    #[must_use]
    pub fn has_attendee(&self, user_id: UserId) -> bool {
        self.attendees.contains(&user_id)
    }

    /// Whether `user_id` organizes this event.
    #[must_use]
    pub fn is_organized_by(&self, user_id: UserId) -> bool {
        self.organizer.user_id == user_id
    }

    /// Verify the capacity invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if self.current_attendees > self.max_attendees {
            return Err(InvariantViolation::OverCapacity {
                current: self.current_attendees,
                max: self.max_attendees,
            });
        }
        if self.attendees.len() != self.current_attendees as usize {
            return Err(InvariantViolation::CounterMismatch {
                counter: self.current_attendees,
                set_size: self.attendees.len(),
            });
        }
        Ok(())
    }
}
