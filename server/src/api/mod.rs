//! HTTP API handlers.
//!
//! - [`events`]: listing, search and organizer management
//! - [`bookings`]: the booking operation
//! - [`profile`]: the caller's booked events

pub mod bookings;
pub mod events;
pub mod profile;

use eventbook_core::event::EventRecord;
use serde::{Deserialize, Serialize};

/// An event as returned by the API: the record plus its remaining spots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventView {
    /// The stored record
    #[serde(flatten)]
    pub event: EventRecord,
    /// `max_attendees - current_attendees`
    pub available_spots: u32,
}

impl From<EventRecord> for EventView {
    fn from(event: EventRecord) -> Self {
        Self {
            available_spots: event.available_spots(),
            event,
        }
    }
}

pub(crate) fn views(events: Vec<EventRecord>) -> Vec<EventView> {
    events.into_iter().map(EventView::from).collect()
}
