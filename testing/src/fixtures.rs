//! Builders for event records and sessions.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use eventbook_core::booking::take_spot;
use eventbook_core::event::{EventDetails, EventRecord, Organizer, Pricing, Venue};
use eventbook_core::session::Session;
use eventbook_core::types::{EventId, Money, SessionId, UserId};
use eventbook_core::user::UserRecord;

/// Builder for [`EventRecord`] with sensible defaults.
///
/// Defaults: free, capacity 10, no attendees, category "Tech", dated
/// 2026-12-01 19:00, physical venue in Bengaluru.
#[derive(Debug, Clone)]
pub struct EventFixture {
    id: EventId,
    title: String,
    description: String,
    category: String,
    event_type: String,
    date: NaiveDate,
    time: NaiveTime,
    venue: Venue,
    organizer: Organizer,
    pricing: Pricing,
    capacity: u32,
    attendees: u32,
    created_at: DateTime<Utc>,
}

impl Default for EventFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl EventFixture {
    /// Start from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: EventId::new(),
            title: "Rust Bengaluru Meetup".to_string(),
            description: "An evening of talks about async Rust".to_string(),
            category: "Tech".to_string(),
            event_type: "Meetup".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap_or_default(),
            time: NaiveTime::from_hms_opt(19, 0, 0).unwrap_or_default(),
            venue: Venue::Physical {
                venue: "Koramangala Hub".to_string(),
                city: "Bengaluru".to_string(),
            },
            organizer: Organizer {
                user_id: UserId::new(),
                name: "Meera Rao".to_string(),
                email: "meera@example.com".to_string(),
            },
            pricing: Pricing::Free,
            capacity: 10,
            attendees: 0,
            created_at: Utc::now(),
        }
    }

    /// Capacity (`max_attendees`).
    #[must_use]
    pub const fn capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    /// Pre-book this many anonymous attendees.
    #[must_use]
    pub const fn attendees(mut self, attendees: u32) -> Self {
        self.attendees = attendees;
        self
    }

    /// Paid event at `price_minor` paise per spot.
    #[must_use]
    pub const fn paid(mut self, price_minor: u64) -> Self {
        self.pricing = Pricing::Paid(Money::from_minor(price_minor));
        self
    }

    /// Owner of the event.
    #[must_use]
    pub fn organizer(mut self, user_id: UserId) -> Self {
        self.organizer.user_id = user_id;
        self
    }

    /// Title.
    #[must_use]
    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// Description.
    #[must_use]
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Category.
    #[must_use]
    pub fn category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    /// Calendar date.
    #[must_use]
    pub const fn date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    /// Online venue on `platform`.
    #[must_use]
    pub fn online(mut self, platform: &str) -> Self {
        self.venue = Venue::Online {
            platform: platform.to_string(),
            meeting_link: "https://meet.example.com/room".to_string(),
        };
        self
    }

    /// Build the record.
    #[must_use]
    pub fn build(self) -> EventRecord {
        let mut event = EventRecord::new(
            self.id,
            EventDetails {
                title: self.title,
                description: self.description,
                image_url: "https://images.example.com/event.png".to_string(),
                category: self.category,
                event_type: self.event_type,
                date: self.date,
                time: self.time,
                venue: self.venue,
            },
            self.organizer,
            self.pricing,
            self.capacity,
            self.created_at,
        );
        for _ in 0..self.attendees.min(self.capacity) {
            let mut filler = UserRecord::empty(UserId::new());
            take_spot(&mut event, &mut filler, self.created_at);
        }
        event
    }
}

/// Session for `user_id` valid for one hour after `now`.
#[must_use]
pub fn session_for(user_id: UserId, now: DateTime<Utc>) -> Session {
    Session::new(SessionId::new(), user_id, now + Duration::hours(1))
}
