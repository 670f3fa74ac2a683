//! Event catalog endpoints.
//!
//! - GET /api/events - every event, newest date first
//! - GET /api/events/search - text search with category and limit
//! - POST /api/events/search - search with the advanced filters
//! - GET /api/events/:id - one event
//! - POST /api/events - create (requires auth)
//! - PUT /api/events/:id - update (requires ownership)
//! - GET /api/organizer/events - the caller's events (requires auth)

use super::{EventView, views};
use crate::auth::SessionUser;
use crate::server::state::AppState;
use axum::{extract::State, http::StatusCode};
use eventbook_core::event::EventRecord;
use eventbook_core::types::EventId;
use eventbook_runtime::{EventUpdate, NewEvent, SearchQuery, SearchResults};
use eventbook_web::{AppError, AppJson, AppPath, AppQuery};
use serde::{Deserialize, Serialize};

/// Query string for `GET /api/events/search`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    /// Search text
    #[serde(default)]
    pub q: String,
    /// Category, `All` for no filter
    pub category: Option<String>,
    /// Page size
    pub limit: Option<usize>,
}

impl From<SearchParams> for SearchQuery {
    fn from(params: SearchParams) -> Self {
        Self {
            text: params.q,
            category: params.category,
            limit: params.limit,
            ..Self::default()
        }
    }
}

/// Search response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Matching events, best first
    pub events: Vec<EventView>,
    /// Matches before the limit
    pub total: usize,
    /// Query text as given
    pub query: String,
    /// Category filter as given
    pub category: Option<String>,
    /// Page size used
    pub limit: usize,
}

impl From<SearchResults> for SearchResponse {
    fn from(results: SearchResults) -> Self {
        Self {
            events: views(results.events),
            total: results.total,
            query: results.query,
            category: results.category,
            limit: results.limit,
        }
    }
}

/// List every event.
///
/// ```bash
/// curl http://localhost:8080/api/events
/// ```
pub async fn list_events(
    State(state): State<AppState>,
) -> Result<AppJson<Vec<EventView>>, AppError> {
    Ok(AppJson(views(state.catalog.list_events().await?)))
}

/// Get one event with its remaining spots.
///
/// ```bash
/// curl http://localhost:8080/api/events/550e8400-e29b-41d4-a716-446655440000
/// ```
pub async fn get_event(
    State(state): State<AppState>,
    AppPath(event_id): AppPath<EventId>,
) -> Result<AppJson<EventView>, AppError> {
    Ok(AppJson(state.catalog.get_event(event_id).await?.into()))
}

/// Search by text, category and limit.
///
/// ```bash
/// curl "http://localhost:8080/api/events/search?q=jazz&category=Music&limit=10"
/// ```
pub async fn search_events(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<SearchParams>,
) -> Result<AppJson<SearchResponse>, AppError> {
    let results = state.catalog.search(&params.into()).await?;
    Ok(AppJson(results.into()))
}

/// Search with event type, date range and price range filters.
///
/// ```bash
/// curl -X POST http://localhost:8080/api/events/search \
///   -H "Content-Type: application/json" \
///   -d '{"text": "rust", "date_from": "2026-12-01", "max_price": 50000}'
/// ```
pub async fn advanced_search(
    State(state): State<AppState>,
    AppJson(query): AppJson<SearchQuery>,
) -> Result<AppJson<SearchResponse>, AppError> {
    let results = state.catalog.search(&query).await?;
    Ok(AppJson(results.into()))
}

/// Create an event owned by the caller.
///
/// ```bash
/// curl -X POST http://localhost:8080/api/events \
///   -H "Authorization: Bearer <session_id>" \
///   -H "Content-Type: application/json" \
///   -d @event.json
/// ```
pub async fn create_event(
    user: SessionUser,
    State(state): State<AppState>,
    AppJson(draft): AppJson<NewEvent>,
) -> Result<(StatusCode, AppJson<EventView>), AppError> {
    let event: EventRecord = state
        .catalog
        .create_event(Some(&user.session), draft)
        .await?;
    Ok((StatusCode::CREATED, AppJson(event.into())))
}

/// Replace the editable fields of an event the caller organizes.
pub async fn update_event(
    user: SessionUser,
    State(state): State<AppState>,
    AppPath(event_id): AppPath<EventId>,
    AppJson(update): AppJson<EventUpdate>,
) -> Result<AppJson<EventView>, AppError> {
    let event = state
        .catalog
        .update_event(Some(&user.session), event_id, update)
        .await?;
    Ok(AppJson(event.into()))
}

/// Events the caller organizes.
pub async fn organizer_events(
    user: SessionUser,
    State(state): State<AppState>,
) -> Result<AppJson<Vec<EventView>>, AppError> {
    let events = state.catalog.organizer_events(Some(&user.session)).await?;
    Ok(AppJson(views(events)))
}
