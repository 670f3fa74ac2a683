//! Axum integration for eventbook.
//!
//! This crate is the HTTP edge shared by eventbook binaries. It holds no
//! routes; it turns domain results into HTTP and HTTP into typed input.
//!
//! # Request Flow
//!
//! 1. **Middleware** assigns a correlation id and opens a request span
//! 2. **Extractors** parse the path, query, body and bearer token
//! 3. **Handler** calls `BookingService` or `CatalogService`
//! 4. **`AppError`** maps any failure to `{ "code", "message" }` with the
//!    matching status
//!
//! # Example
//!
//! ```ignore
//! use eventbook_web::{AppError, AppJson, AppPath};
//!
//! async fn get_event(
//!     State(state): State<AppState>,
//!     AppPath(event_id): AppPath<EventId>,
//! ) -> Result<AppJson<EventRecord>, AppError> {
//!     Ok(AppJson(state.catalog.get_event(event_id).await?))
//! }
//! ```

pub mod error;
pub mod extractors;
pub mod middleware;

pub use error::{AppError, ErrorBody};
pub use extractors::{AppJson, AppPath, AppQuery, BearerToken, CorrelationId};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer, cors_layer, trace_layer};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
