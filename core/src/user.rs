//! The user record as seen by the booking operation.

use crate::types::{EventId, UserId};
use serde::{Deserialize, Serialize};

/// Per-user list of booked events.
///
/// `booked_events` keeps booking order and never holds the same event twice;
/// every entry has a matching attendee entry in that event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// User id
    pub id: UserId,
    /// Booked events, oldest first
    pub booked_events: Vec<EventId>,
}

impl UserRecord {
    /// Record for a user who has never booked anything.
    #[must_use]
    pub const fn empty(id: UserId) -> Self {
        Self {
            id,
            booked_events: Vec::new(),
        }
    }

    /// Whether `event_id` is already in the booked list.
    #[must_use]
    pub fn has_booked(&self, event_id: EventId) -> bool {
        self.booked_events.contains(&event_id)
    }

    /// Append `event_id` unless it is already present.
    ///
    /// Returns `false` when the event was already booked.
    pub fn push_booking(&mut self, event_id: EventId) -> bool {
        if self.has_booked(event_id) {
            return false;
        }
        self.booked_events.push(event_id);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_booking_keeps_list_unique() {
        let mut user = UserRecord::empty(UserId::new());
        let event = EventId::new();

        assert!(user.push_booking(event));
        assert!(!user.push_booking(event));
        assert_eq!(user.booked_events, vec![event]);
    }
}
