//! Organizer-facing event catalog: create, edit, list and search events.
//!
//! Edits go through the same optimistic concurrency as bookings. A revision
//! names the version it read; if a booking lands in between, the edit is
//! re-read and re-applied. Edits never touch the attendance counters.
//!
//! Events are never deleted: user records keep references to the events
//! they booked.

use crate::metrics::CatalogMetrics;
use crate::retry::{RetryPolicy, retry_with_predicate};
use crate::search::{SearchQuery, SearchResults, search};
use eventbook_core::environment::Clock;
use eventbook_core::event::{EventDetails, EventRecord, Organizer, Pricing, Venue};
use eventbook_core::session::Session;
use eventbook_core::store::{EventCatalog, EventRevision, StoreError};
use eventbook_core::types::{EventId, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Why an event draft was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventValidationError {
    /// Title shorter than two characters
    #[error("Title must be at least 2 characters")]
    TitleTooShort,

    /// Description shorter than ten characters
    #[error("Description must be at least 10 characters")]
    DescriptionTooShort,

    /// A required field was blank
    #[error("Please enter {0}")]
    MissingField(&'static str),

    /// Capacity below one
    #[error("Maximum attendees must be at least 1")]
    CapacityTooSmall,

    /// Paid event priced at zero
    #[error("Paid events need a price above zero")]
    PriceRequired,

    /// Capacity below the spots already taken
    #[error("Maximum attendees cannot drop below the {current} already registered")]
    CapacityBelowAttendance {
        /// Spots already taken
        current: u32,
    },
}

/// Errors from catalog operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// No live session
    #[error("Sign in to manage events")]
    NotAuthenticated,

    /// No such event
    #[error("Event not found: {0}")]
    NotFound(EventId),

    /// Caller does not organize the event
    #[error("Only the organizer can change this event")]
    Forbidden,

    /// Draft failed validation
    #[error(transparent)]
    Validation(#[from] EventValidationError),

    /// Search text missing
    #[error("Search query is required")]
    EmptyQuery,

    /// Store failure or exhausted conflict retries
    #[error("Catalog store error: {0}")]
    Store(StoreError),
}

impl CatalogError {
    /// Stable error code shown to clients
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "NOT_AUTHENTICATED",
            Self::NotFound(_) => "EVENT_NOT_FOUND",
            Self::Forbidden => "FORBIDDEN",
            Self::Validation(_) | Self::EmptyQuery => "VALIDATION_ERROR",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    const fn is_conflict(&self) -> bool {
        matches!(self, Self::Store(error) if error.is_conflict())
    }
}

impl From<StoreError> for CatalogError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::EventNotFound(event_id) => Self::NotFound(event_id),
            other => Self::Store(other),
        }
    }
}

/// Request body for creating an event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NewEvent {
    /// Descriptive fields
    pub details: EventDetails,
    /// Free or paid
    pub pricing: Pricing,
    /// Capacity
    pub max_attendees: u32,
    /// Organizer display name
    pub organizer_name: String,
    /// Organizer contact email
    pub organizer_email: String,
}

/// Request body for editing an event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EventUpdate {
    /// Descriptive fields
    pub details: EventDetails,
    /// Free or paid
    pub pricing: Pricing,
    /// Capacity, never below current attendance
    pub max_attendees: u32,
}

/// Check an event draft against the organizer form's rules.
///
/// # Errors
///
/// Returns the first rule the draft breaks.
pub fn validate_draft(
    details: &EventDetails,
    pricing: Pricing,
    max_attendees: u32,
) -> Result<(), EventValidationError> {
    if details.title.trim().chars().count() < 2 {
        return Err(EventValidationError::TitleTooShort);
    }
    if details.description.trim().chars().count() < 10 {
        return Err(EventValidationError::DescriptionTooShort);
    }
    if details.category.trim().is_empty() {
        return Err(EventValidationError::MissingField("a category"));
    }
    if details.event_type.trim().is_empty() {
        return Err(EventValidationError::MissingField("an event type"));
    }
    match &details.venue {
        Venue::Physical { venue, city } => {
            if venue.trim().is_empty() {
                return Err(EventValidationError::MissingField("a venue"));
            }
            if city.trim().is_empty() {
                return Err(EventValidationError::MissingField("a city"));
            }
        }
        Venue::Online { platform, .. } => {
            if platform.trim().is_empty() {
                return Err(EventValidationError::MissingField("a platform"));
            }
        }
    }
    if max_attendees < 1 {
        return Err(EventValidationError::CapacityTooSmall);
    }
    if matches!(pricing, Pricing::Paid(price) if price.is_zero()) {
        return Err(EventValidationError::PriceRequired);
    }
    Ok(())
}

/// Catalog operations for organizers and browsing users.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn EventCatalog>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl CatalogService {
    /// Creates a catalog service.
    #[must_use]
    pub fn new(store: Arc<dyn EventCatalog>, clock: Arc<dyn Clock>, retry: RetryPolicy) -> Self {
        Self {
            store,
            clock,
            retry,
        }
    }

    fn authenticate(&self, session: Option<&Session>) -> Result<UserId, CatalogError> {
        let now = self.clock.now();
        session
            .filter(|session| session.is_active_at(now))
            .map(|session| session.user_id)
            .ok_or(CatalogError::NotAuthenticated)
    }

    /// Create an event owned by the caller, with no attendees.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotAuthenticated`], [`CatalogError::Validation`] or a
    /// store error.
    #[tracing::instrument(skip(self, session, draft), fields(title = %draft.details.title))]
    pub async fn create_event(
        &self,
        session: Option<&Session>,
        draft: NewEvent,
    ) -> Result<EventRecord, CatalogError> {
        let organizer_id = self.authenticate(session)?;
        validate_draft(&draft.details, draft.pricing, draft.max_attendees)?;

        let event = EventRecord::new(
            EventId::new(),
            draft.details,
            Organizer {
                user_id: organizer_id,
                name: draft.organizer_name,
                email: draft.organizer_email,
            },
            draft.pricing,
            draft.max_attendees,
            self.clock.now(),
        );
        self.store.insert_event(event.clone()).await?;

        CatalogMetrics::record_created();
        tracing::info!(event_id = %event.id, %organizer_id, "Event created");
        Ok(event)
    }

    /// Replace the editable fields of an event the caller organizes.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotFound`], [`CatalogError::Forbidden`],
    /// [`CatalogError::Validation`] (including capacity below attendance) or
    /// a store error once conflicts exhaust the retry budget. The body is
    /// only validated for the event's organizer.
    #[tracing::instrument(skip(self, session, update))]
    pub async fn update_event(
        &self,
        session: Option<&Session>,
        event_id: EventId,
        update: EventUpdate,
    ) -> Result<EventRecord, CatalogError> {
        let caller = self.authenticate(session)?;

        let updated = retry_with_predicate(
            &self.retry,
            || self.apply_update(caller, event_id, update.clone()),
            CatalogError::is_conflict,
        )
        .await?;

        tracing::info!(%event_id, version = %updated.1, "Event updated");
        Ok(updated.0)
    }

    async fn apply_update(
        &self,
        caller: UserId,
        event_id: EventId,
        update: EventUpdate,
    ) -> Result<(EventRecord, eventbook_core::types::Version), CatalogError> {
        let current = self
            .store
            .load_event(event_id)
            .await?
            .ok_or(CatalogError::NotFound(event_id))?;

        if !current.record.is_organized_by(caller) {
            return Err(CatalogError::Forbidden);
        }
        validate_draft(&update.details, update.pricing, update.max_attendees)?;
        if update.max_attendees < current.record.current_attendees {
            return Err(EventValidationError::CapacityBelowAttendance {
                current: current.record.current_attendees,
            }
            .into());
        }

        let updated_at = self.clock.now();
        let version = self
            .store
            .update_event(EventRevision {
                event_id,
                expected_version: current.version,
                details: update.details.clone(),
                pricing: update.pricing,
                max_attendees: update.max_attendees,
                updated_at,
            })
            .await?;

        let mut record = current.record;
        record.details = update.details;
        record.pricing = update.pricing;
        record.max_attendees = update.max_attendees;
        record.updated_at = updated_at;
        Ok((record, version))
    }

    /// A single event.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotFound`] or a store error.
    pub async fn get_event(&self, event_id: EventId) -> Result<EventRecord, CatalogError> {
        self.store
            .load_event(event_id)
            .await?
            .map(|versioned| versioned.record)
            .ok_or(CatalogError::NotFound(event_id))
    }

    /// Every event, newest date first.
    ///
    /// # Errors
    ///
    /// Store errors only.
    pub async fn list_events(&self) -> Result<Vec<EventRecord>, CatalogError> {
        Ok(self.store.list_events().await?)
    }

    /// Events the caller organizes.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotAuthenticated`] or a store error.
    pub async fn organizer_events(
        &self,
        session: Option<&Session>,
    ) -> Result<Vec<EventRecord>, CatalogError> {
        let organizer = self.authenticate(session)?;
        Ok(self.store.events_by_organizer(organizer).await?)
    }

    /// Events the caller booked, in booking order.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotAuthenticated`] or a store error.
    pub async fn booked_events(
        &self,
        session: Option<&Session>,
    ) -> Result<Vec<EventRecord>, CatalogError> {
        let user_id = self.authenticate(session)?;
        let Some(user) = self.store.load_user(user_id).await? else {
            return Ok(Vec::new());
        };

        let mut events = Vec::with_capacity(user.record.booked_events.len());
        for event_id in user.record.booked_events {
            match self.store.load_event(event_id).await? {
                Some(event) => events.push(event.record),
                None => tracing::warn!(%event_id, %user_id, "Booked event missing from catalog"),
            }
        }
        Ok(events)
    }

    /// Full-text search over the catalog.
    ///
    /// # Errors
    ///
    /// [`CatalogError::EmptyQuery`] for blank text, or a store error.
    #[tracing::instrument(skip(self))]
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResults, CatalogError> {
        if query.text.trim().is_empty() {
            return Err(CatalogError::EmptyQuery);
        }
        let events = self.store.list_events().await?;
        Ok(search(events, query))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use eventbook_core::types::Money;
    use eventbook_testing::fixtures::{EventFixture, session_for};
    use eventbook_testing::{InMemoryStore, test_clock};
    use std::time::Duration;

    fn service(store: &InMemoryStore) -> CatalogService {
        CatalogService::new(
            Arc::new(store.clone()),
            Arc::new(test_clock()),
            RetryPolicy::builder()
                .max_attempts(3)
                .initial_delay(Duration::from_millis(1))
                .build(),
        )
    }

    fn now() -> chrono::DateTime<chrono::Utc> {
        test_clock().now()
    }

    fn draft() -> NewEvent {
        let template = EventFixture::new().build();
        NewEvent {
            details: template.details,
            pricing: Pricing::Paid(Money::from_minor(49_900)),
            max_attendees: 40,
            organizer_name: "Meera Rao".to_string(),
            organizer_email: "meera@example.com".to_string(),
        }
    }

    fn update_of(event: &EventRecord, max_attendees: u32) -> EventUpdate {
        EventUpdate {
            details: event.details.clone(),
            pricing: event.pricing,
            max_attendees,
        }
    }

    #[tokio::test]
    async fn create_starts_empty_and_owned_by_caller() {
        let store = InMemoryStore::new();
        let organizer = UserId::new();
        let session = session_for(organizer, now());

        let event = service(&store)
            .create_event(Some(&session), draft())
            .await
            .unwrap();

        assert_eq!(event.current_attendees, 0);
        assert!(event.attendees.is_empty());
        assert!(event.is_organized_by(organizer));
        assert!(store.event(event.id).is_some());
    }

    #[tokio::test]
    async fn create_validates_the_draft() {
        let store = InMemoryStore::new();
        let session = session_for(UserId::new(), now());

        let mut short = draft();
        short.details.title = "A".to_string();
        let mut free_priced = draft();
        free_priced.pricing = Pricing::Paid(Money::ZERO);
        let mut no_room = draft();
        no_room.max_attendees = 0;

        let catalog = service(&store);
        assert_eq!(
            catalog.create_event(Some(&session), short).await.unwrap_err(),
            CatalogError::Validation(EventValidationError::TitleTooShort)
        );
        assert_eq!(
            catalog.create_event(Some(&session), free_priced).await.unwrap_err(),
            CatalogError::Validation(EventValidationError::PriceRequired)
        );
        assert_eq!(
            catalog.create_event(Some(&session), no_room).await.unwrap_err(),
            CatalogError::Validation(EventValidationError::CapacityTooSmall)
        );
        assert!(store.all_events().is_empty());
    }

    #[tokio::test]
    async fn create_requires_a_session() {
        let store = InMemoryStore::new();
        let error = service(&store).create_event(None, draft()).await.unwrap_err();
        assert_eq!(error, CatalogError::NotAuthenticated);
    }

    #[tokio::test]
    async fn update_by_stranger_is_forbidden() {
        let store = InMemoryStore::new();
        let event = store.seed_event(EventFixture::new().build());
        let stranger = session_for(UserId::new(), now());

        let error = service(&store)
            .update_event(Some(&stranger), event.id, update_of(&event, 20))
            .await
            .unwrap_err();

        assert_eq!(error, CatalogError::Forbidden);
    }

    #[tokio::test]
    async fn invalid_update_from_stranger_is_still_forbidden() {
        let store = InMemoryStore::new();
        let event = store.seed_event(EventFixture::new().build());
        let stranger = session_for(UserId::new(), now());
        let mut update = update_of(&event, 0);
        update.details.title = "x".to_string();

        let error = service(&store)
            .update_event(Some(&stranger), event.id, update.clone())
            .await
            .unwrap_err();
        assert_eq!(error, CatalogError::Forbidden);

        let missing = EventId::new();
        let error = service(&store)
            .update_event(Some(&stranger), missing, update)
            .await
            .unwrap_err();
        assert_eq!(error, CatalogError::NotFound(missing));
    }

    #[tokio::test]
    async fn update_of_missing_event_is_not_found() {
        let store = InMemoryStore::new();
        let session = session_for(UserId::new(), now());
        let template = EventFixture::new().build();
        let missing = EventId::new();

        let error = service(&store)
            .update_event(Some(&session), missing, update_of(&template, 5))
            .await
            .unwrap_err();

        assert_eq!(error, CatalogError::NotFound(missing));
        assert_eq!(error.code(), "EVENT_NOT_FOUND");
    }

    #[tokio::test]
    async fn update_cannot_drop_capacity_below_attendance() {
        let store = InMemoryStore::new();
        let organizer = UserId::new();
        let event = store.seed_event(
            EventFixture::new()
                .organizer(organizer)
                .capacity(5)
                .attendees(3)
                .build(),
        );

        let error = service(&store)
            .update_event(Some(&session_for(organizer, now())), event.id, update_of(&event, 2))
            .await
            .unwrap_err();

        assert_eq!(
            error,
            CatalogError::Validation(EventValidationError::CapacityBelowAttendance { current: 3 })
        );
    }

    #[tokio::test]
    async fn update_keeps_attendance() {
        let store = InMemoryStore::new();
        let organizer = UserId::new();
        let event = store.seed_event(
            EventFixture::new()
                .organizer(organizer)
                .capacity(5)
                .attendees(2)
                .build(),
        );
        let mut update = update_of(&event, 10);
        update.details.title = "Rust Bengaluru Meetup: Async Special".to_string();

        let updated = service(&store)
            .update_event(Some(&session_for(organizer, now())), event.id, update)
            .await
            .unwrap();

        assert_eq!(updated.max_attendees, 10);
        assert_eq!(updated.current_attendees, 2);
        let stored = store.event(event.id).unwrap();
        assert_eq!(stored.record.attendees, event.attendees);
        assert_eq!(stored.record.details.title, "Rust Bengaluru Meetup: Async Special");
        assert_eq!(stored.version.value(), 2);
    }

    #[tokio::test]
    async fn organizer_events_only_lists_own() {
        let store = InMemoryStore::new();
        let organizer = UserId::new();
        store.seed_event(EventFixture::new().organizer(organizer).build());
        store.seed_event(EventFixture::new().organizer(organizer).build());
        store.seed_event(EventFixture::new().build());

        let events = service(&store)
            .organizer_events(Some(&session_for(organizer, now())))
            .await
            .unwrap();

        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.is_organized_by(organizer)));
    }

    #[tokio::test]
    async fn blank_search_is_rejected() {
        let store = InMemoryStore::new();
        let error = service(&store)
            .search(&SearchQuery::new("   "))
            .await
            .unwrap_err();
        assert_eq!(error, CatalogError::EmptyQuery);
    }
}
