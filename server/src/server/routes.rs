//! Router configuration for the eventbook API.

use super::health::{health_check, metrics};
use super::state::AppState;
use crate::api::{bookings, events, profile};
use axum::{
    Router,
    routing::{get, post},
};
use eventbook_web::{correlation_id_layer, cors_layer, trace_layer};

/// Build the complete Axum router.
///
/// Health and metrics sit at the root; everything else under `/api`.
/// Every request passes through tracing, correlation-id and CORS layers.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/events", get(events::list_events).post(events::create_event))
        .route(
            "/events/search",
            get(events::search_events).post(events::advanced_search),
        )
        .route("/events/:id", get(events::get_event).put(events::update_event))
        .route("/events/:id/bookings", post(bookings::book_event))
        .route("/organizer/events", get(events::organizer_events))
        .route("/me/bookings", get(profile::my_bookings));

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .nest("/api", api_routes)
        .layer(correlation_id_layer())
        .layer(trace_layer())
        .layer(cors_layer())
        .with_state(state)
}
