//! Booking endpoint.
//!
//! POST /api/events/:id/bookings takes one spot for the caller. The body is
//! optional for free events; paid events need a payment method:
//!
//! ```json
//! { "payment_method": { "type": "upi", "vpa": "asha@okbank" } }
//! ```

use crate::auth::SessionUser;
use crate::server::state::AppState;
use axum::{body::Bytes, extract::State, http::StatusCode};
use eventbook_core::payment::PaymentMethod;
use eventbook_core::types::EventId;
use eventbook_runtime::BookingConfirmation;
use eventbook_web::{AppError, AppJson, AppPath, CorrelationId};
use serde::{Deserialize, Serialize};

/// Booking request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    /// How to pay; ignored for free events
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

impl BookingRequest {
    fn parse(body: &[u8]) -> Result<Self, AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| AppError::validation(format!("Invalid booking request: {e}")))
    }
}

/// Book a spot.
///
/// ```bash
/// curl -X POST http://localhost:8080/api/events/<event_id>/bookings \
///   -H "Authorization: Bearer <session_id>"
/// ```
pub async fn book_event(
    user: SessionUser,
    correlation_id: CorrelationId,
    State(state): State<AppState>,
    AppPath(event_id): AppPath<EventId>,
    body: Bytes,
) -> Result<(StatusCode, AppJson<BookingConfirmation>), AppError> {
    let request = BookingRequest::parse(&body)?;

    let confirmation = state
        .bookings
        .book(Some(&user.session), event_id, request.payment_method)
        .await
        .inspect_err(|error| {
            tracing::info!(
                correlation_id = %correlation_id.0,
                %event_id,
                user_id = %user.user_id,
                code = error.code(),
                "Booking refused"
            );
        })?;

    Ok((StatusCode::CREATED, AppJson(confirmation)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_means_no_payment_method() {
        assert_eq!(BookingRequest::parse(b"").unwrap(), BookingRequest::default());
        assert_eq!(BookingRequest::parse(b" \n").unwrap(), BookingRequest::default());
    }

    #[test]
    fn payment_method_is_parsed() {
        let request =
            BookingRequest::parse(br#"{"payment_method":{"type":"card","last_four":"4242"}}"#)
                .unwrap();
        assert_eq!(
            request.payment_method,
            Some(PaymentMethod::Card {
                last_four: "4242".to_string()
            })
        );
    }

    #[test]
    fn malformed_body_is_a_validation_error() {
        let error = BookingRequest::parse(b"{not json").unwrap_err();
        assert_eq!(error.code(), "VALIDATION_ERROR");
    }
}
