//! Row types and conversions between `PostgreSQL` columns and records.

use chrono::{DateTime, Utc};
use eventbook_core::event::{EventDetails, EventRecord, Organizer, Pricing};
use eventbook_core::session::Session;
use eventbook_core::store::StoreError;
use eventbook_core::types::{EventId, Money, SessionId, UserId, Version, Versioned};
use eventbook_core::user::UserRecord;
use sqlx::types::Json;
use uuid::Uuid;

/// Columns selected for an event, attendees folded into an array so one
/// statement sees a consistent snapshot.
pub(crate) const EVENT_COLUMNS: &str = r"
    e.id, e.details, e.organizer_id, e.organizer_name, e.organizer_email,
    e.price_minor, e.max_attendees, e.current_attendees, e.version,
    e.created_at, e.updated_at,
    ARRAY(SELECT a.user_id FROM event_attendees a WHERE a.event_id = e.id) AS attendees
";

/// Newest event date first, then newest start time, then newest created.
pub(crate) const EVENT_ORDER: &str =
    "ORDER BY e.details->>'date' DESC, e.details->>'time' DESC, e.created_at DESC";

#[derive(sqlx::FromRow)]
pub(crate) struct EventRow {
    id: Uuid,
    details: Json<EventDetails>,
    organizer_id: Uuid,
    organizer_name: String,
    organizer_email: String,
    price_minor: Option<i64>,
    max_attendees: i32,
    current_attendees: i32,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    attendees: Vec<Uuid>,
}

impl TryFrom<EventRow> for Versioned<EventRecord> {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let pricing = match row.price_minor {
            None => Pricing::Free,
            Some(minor) => Pricing::Paid(Money::from_minor(to_u64(minor, "price_minor")?)),
        };
        let record = EventRecord {
            id: EventId::from_uuid(row.id),
            details: row.details.0,
            organizer: Organizer {
                user_id: UserId::from_uuid(row.organizer_id),
                name: row.organizer_name,
                email: row.organizer_email,
            },
            pricing,
            max_attendees: to_u32(row.max_attendees, "max_attendees")?,
            current_attendees: to_u32(row.current_attendees, "current_attendees")?,
            attendees: row.attendees.into_iter().map(UserId::from_uuid).collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        };
        Ok(Self::new(record, version_from_db(row.version)?))
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct UserRow {
    id: Uuid,
    version: i64,
    booked_events: Vec<Uuid>,
}

impl TryFrom<UserRow> for Versioned<UserRecord> {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let record = UserRecord {
            id: UserId::from_uuid(row.id),
            booked_events: row.booked_events.into_iter().map(EventId::from_uuid).collect(),
        };
        Ok(Self::new(record, version_from_db(row.version)?))
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct SessionRow {
    id: Uuid,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Self::new(
            SessionId::from_uuid(row.id),
            UserId::from_uuid(row.user_id),
            row.expires_at,
        )
    }
}

pub(crate) fn version_from_db(value: i64) -> Result<Version, StoreError> {
    to_u64(value, "version").map(Version::new)
}

pub(crate) fn version_to_db(version: Version) -> Result<i64, StoreError> {
    i64::try_from(version.value())
        .map_err(|_| StoreError::Serialization(format!("version {version} exceeds BIGINT")))
}

pub(crate) fn price_to_db(pricing: Pricing) -> Result<Option<i64>, StoreError> {
    pricing
        .charge()
        .map(|price| {
            i64::try_from(price.minor())
                .map_err(|_| StoreError::Serialization(format!("price {price} exceeds BIGINT")))
        })
        .transpose()
}

pub(crate) fn count_to_db(count: u32, column: &str) -> Result<i32, StoreError> {
    i32::try_from(count)
        .map_err(|_| StoreError::Serialization(format!("{column} {count} exceeds INTEGER")))
}

fn to_u64(value: i64, column: &str) -> Result<u64, StoreError> {
    u64::try_from(value)
        .map_err(|_| StoreError::Serialization(format!("negative {column}: {value}")))
}

fn to_u32(value: i32, column: &str) -> Result<u32, StoreError> {
    u32::try_from(value)
        .map_err(|_| StoreError::Serialization(format!("negative {column}: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_events_store_null_price() {
        assert_eq!(price_to_db(Pricing::Free), Ok(None));
        assert_eq!(
            price_to_db(Pricing::Paid(Money::from_minor(49_900))),
            Ok(Some(49_900))
        );
    }

    #[test]
    fn negative_columns_are_rejected() {
        assert!(version_from_db(-1).is_err());
        assert!(to_u32(-3, "current_attendees").is_err());
        assert_eq!(version_from_db(7), Ok(Version::new(7)));
    }

    #[test]
    fn oversized_values_are_rejected() {
        assert!(version_to_db(Version::new(u64::MAX)).is_err());
        assert!(count_to_db(u32::MAX, "max_attendees").is_err());
    }
}
