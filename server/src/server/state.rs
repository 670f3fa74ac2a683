//! Application state for the eventbook HTTP server.
//!
//! Holds the two services the handlers call plus what the session extractor
//! needs. Cloned per request; every field is an `Arc` or wraps one.

use eventbook_core::environment::Clock;
use eventbook_core::payment::PaymentGateway;
use eventbook_core::store::{BookingStore, EventCatalog, SessionStore};
use eventbook_runtime::{BookingConfig, BookingService, CatalogService};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Booking operation
    pub bookings: BookingService,
    /// Organizer catalog, listings and search
    pub catalog: CatalogService,
    /// Session lookup for bearer tokens
    pub sessions: Arc<dyn SessionStore>,
    /// Time source for session expiry
    pub clock: Arc<dyn Clock>,
    /// Test-only bearer token, see [`crate::config::AuthConfig`]
    pub auth_test_token: Option<Arc<str>>,
    /// Prometheus scrape handle, absent when no recorder was installed
    pub metrics: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("bookings", &self.bookings)
            .field("catalog", &self.catalog)
            .field("test_token_enabled", &self.auth_test_token.is_some())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire both services to one store.
    ///
    /// The store is shared: the booking service sees it as a
    /// [`BookingStore`], the catalog as an [`EventCatalog`] and the session
    /// extractor as a [`SessionStore`].
    #[must_use]
    pub fn new<S>(
        store: Arc<S>,
        payments: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
        booking: &BookingConfig,
    ) -> Self
    where
        S: EventCatalog + SessionStore + 'static,
    {
        let booking_store: Arc<dyn BookingStore> = store.clone();
        let catalog_store: Arc<dyn EventCatalog> = store.clone();
        let sessions: Arc<dyn SessionStore> = store;

        Self {
            bookings: BookingService::new(booking_store, payments, clock.clone(), booking),
            catalog: CatalogService::new(catalog_store, clock.clone(), booking.retry_policy()),
            sessions,
            clock,
            auth_test_token: None,
            metrics: None,
        }
    }

    /// Accept `token` as the fixed test user.
    #[must_use]
    pub fn with_test_token(mut self, token: Option<String>) -> Self {
        self.auth_test_token = token.map(Arc::from);
        self
    }

    /// Serve `handle` at `/metrics`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
