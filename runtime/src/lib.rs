//! # Eventbook Runtime
//!
//! Services that run the eventbook operations against the store and payment
//! traits from `eventbook-core`.
//!
//! ## Core Components
//!
//! - **[`BookingService`]**: authenticate, decide, charge, commit with
//!   conflict retries and refund on failure
//! - **[`CatalogService`]**: organizer create/edit, listings and search
//! - **[`retry`]**: backoff schedule for version conflicts
//! - **[`SimulatedPaymentGateway`]**: development payment processor
//! - **[`metrics`]**: business counters and histograms
//!
//! ## Example
//!
//! ```ignore
//! use eventbook_runtime::{BookingConfig, BookingService};
//!
//! let service = BookingService::new(store, payments, clock, &BookingConfig::default());
//! let confirmation = service.book(Some(&session), event_id, None).await?;
//! println!("{} spots left", confirmation.available_spots);
//! ```

/// The booking operation
pub mod booking;

/// Organizer catalog and browsing
pub mod catalog;

/// Prometheus metrics for observability
pub mod metrics;

/// Simulated payment processor
pub mod payment;

/// Retry logic with exponential backoff
pub mod retry;

/// Catalog search
pub mod search;

pub use booking::{BookingConfig, BookingConfirmation, BookingService};
pub use catalog::{CatalogError, CatalogService, EventUpdate, EventValidationError, NewEvent};
pub use payment::SimulatedPaymentGateway;
pub use retry::RetryPolicy;
pub use search::{SearchQuery, SearchResults};
