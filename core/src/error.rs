//! Errors surfaced by the booking operation.

use crate::booking::BookingRejection;
use crate::payment::PaymentError;
use crate::store::StoreError;
use crate::types::EventId;
use thiserror::Error;

/// Everything the booking operation can answer besides a confirmation.
///
/// Every variant leaves the stores exactly as they were before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// No live session; rejected before any read
    #[error("Sign in to book a spot")]
    NotAuthenticated,

    /// The event id does not reference a stored event
    #[error("Event not found: {0}")]
    EventNotFound(EventId),

    /// Duplicate or capacity check failed
    #[error(transparent)]
    Rejected(#[from] BookingRejection),

    /// The payment step did not complete; the user may retry
    #[error("Payment failed: {reason}")]
    PaymentFailed {
        /// Why the charge did not go through
        reason: String,
    },

    /// The store failed, or version conflicts outlasted the retry budget
    #[error("Booking could not be saved: {0}")]
    Store(StoreError),
}

impl BookingError {
    /// Stable error code shown to clients
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "NOT_AUTHENTICATED",
            Self::EventNotFound(_) => "EVENT_NOT_FOUND",
            Self::Rejected(rejection) => rejection.code(),
            Self::PaymentFailed { .. } => "PAYMENT_FAILED",
            Self::Store(_) => "STORE_ERROR",
        }
    }
}

impl From<StoreError> for BookingError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::EventNotFound(event_id) => Self::EventNotFound(event_id),
            other => Self::Store(other),
        }
    }
}

impl From<PaymentError> for BookingError {
    fn from(error: PaymentError) -> Self {
        Self::PaymentFailed {
            reason: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(BookingError::NotAuthenticated.code(), "NOT_AUTHENTICATED");
        assert_eq!(
            BookingError::from(BookingRejection::EventFull).code(),
            "EVENT_FULL"
        );
        assert_eq!(
            BookingError::from(PaymentError::Timeout).code(),
            "PAYMENT_FAILED"
        );
    }

    #[test]
    fn missing_event_from_store_maps_to_not_found() {
        let event_id = EventId::new();
        assert_eq!(
            BookingError::from(StoreError::EventNotFound(event_id)),
            BookingError::EventNotFound(event_id)
        );
        assert_eq!(
            BookingError::from(StoreError::Database("down".to_string())).code(),
            "STORE_ERROR"
        );
    }
}
