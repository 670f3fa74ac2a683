//! Error types for web handlers.
//!
//! [`AppError`] is the single error type returned by eventbook handlers. It
//! carries the stable error code clients switch on and renders as
//!
//! ```json
//! { "code": "EVENT_FULL", "message": "No spots left for this event" }
//! ```
//!
//! Domain errors convert into it through `From`, so handlers can use `?`
//! directly on `BookingService` and `CatalogService` results.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use eventbook_core::error::BookingError;
use eventbook_core::store::StoreError;
use eventbook_runtime::CatalogError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Application error type for web handlers.
///
/// Server errors are logged when rendered; the internal source is never
/// exposed to the client.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<AppState>) -> Result<Json<Data>, AppError> {
///     let confirmation = state.bookings.book(Some(&session), event_id, None).await?;
///     Ok(Json(confirmation))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: code.into(),
            source: None,
        }
    }

    /// Attach an internal source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// 400 with `VALIDATION_ERROR`.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    /// 401 with `NOT_AUTHENTICATED`.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "NOT_AUTHENTICATED", message)
    }

    /// 404 with `NOT_FOUND`.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{resource} with id {id} not found"),
        )
    }

    /// 500 with `INTERNAL_SERVER_ERROR`.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            message,
        )
    }

    /// 503 with `STORE_ERROR`.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "STORE_ERROR", message)
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// HTTP status this error renders with
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Stable error code
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// User-facing message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    /// Stable error code
    pub code: String,
    /// Human-readable message, shown to the user as a notification
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Request failed"
                ),
                None => tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Request failed"
                ),
            }
        } else {
            tracing::debug!(status = %self.status, code = %self.code, "Request rejected");
        }

        let body = ErrorBody {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

/// HTTP status for a booking or catalog error code.
fn status_for(code: &str) -> StatusCode {
    match code {
        "NOT_AUTHENTICATED" => StatusCode::UNAUTHORIZED,
        "EVENT_NOT_FOUND" => StatusCode::NOT_FOUND,
        "ALREADY_REGISTERED" | "EVENT_FULL" => StatusCode::CONFLICT,
        "PAYMENT_FAILED" => StatusCode::PAYMENT_REQUIRED,
        "FORBIDDEN" => StatusCode::FORBIDDEN,
        "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl From<BookingError> for AppError {
    fn from(error: BookingError) -> Self {
        let code = error.code();
        let app = Self::new(status_for(code), code, error.to_string());
        match error {
            BookingError::Store(store) => app
                .with_message("Booking could not be completed, please try again")
                .with_source(store.into()),
            _ => app,
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(error: CatalogError) -> Self {
        let code = error.code();
        let app = Self::new(status_for(code), code, error.to_string());
        match error {
            CatalogError::Store(store) => app
                .with_message("Event store unavailable, please try again")
                .with_source(store.into()),
            _ => app,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::EventNotFound(event_id) => Self::new(
                StatusCode::NOT_FOUND,
                "EVENT_NOT_FOUND",
                format!("Event not found: {event_id}"),
            ),
            other => Self::unavailable("Event store unavailable, please try again")
                .with_source(other.into()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventbook_core::booking::BookingRejection;
    use eventbook_core::types::EventId;
    use eventbook_runtime::EventValidationError;

    #[test]
    fn test_error_display() {
        let err = AppError::validation("Invalid input");
        assert_eq!(err.to_string(), "[VALIDATION_ERROR] Invalid input");
    }

    #[test]
    fn test_booking_errors_map_to_statuses() {
        let cases = [
            (BookingError::NotAuthenticated, StatusCode::UNAUTHORIZED),
            (
                BookingError::EventNotFound(EventId::new()),
                StatusCode::NOT_FOUND,
            ),
            (
                BookingRejection::AlreadyRegistered.into(),
                StatusCode::CONFLICT,
            ),
            (BookingRejection::EventFull.into(), StatusCode::CONFLICT),
            (
                BookingError::PaymentFailed {
                    reason: "Card declined".to_string(),
                },
                StatusCode::PAYMENT_REQUIRED,
            ),
            (
                BookingError::Store(StoreError::Database("down".to_string())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (error, status) in cases {
            let code = error.code();
            let app = AppError::from(error);
            assert_eq!(app.status(), status, "{code}");
            assert_eq!(app.code(), code);
        }
    }

    #[test]
    fn test_store_details_stay_internal() {
        let app = AppError::from(BookingError::Store(StoreError::Database(
            "password authentication failed".to_string(),
        )));

        assert!(!app.message().contains("password"));
        assert!(std::error::Error::source(&app).is_some());
    }

    #[test]
    fn test_catalog_errors_map_to_statuses() {
        assert_eq!(
            AppError::from(CatalogError::Forbidden).status(),
            StatusCode::FORBIDDEN
        );
        let invalid = AppError::from(CatalogError::Validation(
            EventValidationError::TitleTooShort,
        ));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.code(), "VALIDATION_ERROR");
        assert_eq!(invalid.message(), "Title must be at least 2 characters");
        assert_eq!(
            AppError::from(CatalogError::NotFound(EventId::new())).code(),
            "EVENT_NOT_FOUND"
        );
    }

    #[test]
    fn test_missing_event_from_store() {
        let app = AppError::from(StoreError::EventNotFound(EventId::new()));
        assert_eq!(app.status(), StatusCode::NOT_FOUND);
        assert_eq!(app.code(), "EVENT_NOT_FOUND");
    }
}
