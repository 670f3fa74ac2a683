//! Authentication extractor for the eventbook API.
//!
//! Bearer tokens are session ids issued by the sign-in flow. A token is
//! accepted when it parses as a UUID, names a stored session and that
//! session has not expired by the server clock.
//!
//! # Usage
//!
//! ```rust,ignore
//! async fn my_bookings(
//!     user: SessionUser,
//!     State(state): State<AppState>,
//! ) -> Result<AppJson<Vec<EventView>>, AppError> {
//!     let events = state.catalog.booked_events(Some(&user.session)).await?;
//!     ...
//! }
//! ```

use crate::server::state::AppState;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::Duration;
use eventbook_core::session::Session;
use eventbook_core::types::{SessionId, UserId};
use eventbook_web::{AppError, BearerToken, CorrelationId};
use uuid::Uuid;

/// User behind the `AUTH_TEST_TOKEN` bypass.
pub const TEST_USER_ID: UserId =
    UserId::from_uuid(Uuid::from_bytes([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]));

const TEST_SESSION_ID: SessionId =
    SessionId::from_uuid(Uuid::from_bytes([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2]));

/// Authenticated session user.
///
/// Use as a handler parameter to require authentication; rejects with 401
/// `NOT_AUTHENTICATED`.
#[derive(Debug, Clone)]
pub struct SessionUser {
    /// The authenticated user ID
    pub user_id: UserId,
    /// The full session
    pub session: Session,
}

impl SessionUser {
    fn from_session(session: Session) -> Self {
        Self {
            user_id: session.user_id,
            session,
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = BearerToken::from_request_parts(parts, state).await?;
        let now = state.clock.now();

        if let Some(test_token) = state.auth_test_token.as_deref() {
            if bearer.0 == test_token {
                let session = Session::new(TEST_SESSION_ID, TEST_USER_ID, now + Duration::days(1));
                return Ok(Self::from_session(session));
            }
        }

        let Ok(CorrelationId(correlation_id)) =
            CorrelationId::from_request_parts(parts, state).await;

        let session_id = Uuid::parse_str(&bearer.0)
            .map(SessionId::from_uuid)
            .map_err(|_| AppError::unauthorized("Invalid session token"))?;

        let session = state
            .sessions
            .find_session(session_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("Session not found, please sign in again"))?;

        if !session.is_active_at(now) {
            tracing::debug!(%correlation_id, %session_id, "Expired session presented");
            return Err(AppError::unauthorized("Session expired, please sign in again"));
        }

        tracing::debug!(%correlation_id, user_id = %session.user_id, "Session validated");
        Ok(Self::from_session(session))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use eventbook_core::environment::Clock;
    use axum::http::{Request, StatusCode, header::AUTHORIZATION};
    use eventbook_core::payment::PaymentGateway;
    use eventbook_runtime::BookingConfig;
    use eventbook_testing::fixtures::session_for;
    use eventbook_testing::{FixedClock, InMemoryStore, ScriptedPaymentGateway, test_clock};
    use std::sync::Arc;

    fn state(store: &InMemoryStore, clock: Arc<FixedClock>) -> AppState {
        let payments: Arc<dyn PaymentGateway> = Arc::new(ScriptedPaymentGateway::new());
        AppState::new(Arc::new(store.clone()), payments, clock, &BookingConfig::default())
            .with_test_token(Some("test-token".to_string()))
    }

    async fn extract(state: &AppState, token: &str) -> Result<SessionUser, AppError> {
        let (mut parts, ()) = Request::builder()
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(())
            .expect("Valid request")
            .into_parts();
        SessionUser::from_request_parts(&mut parts, state).await
    }

    #[tokio::test]
    async fn stored_session_is_accepted() {
        let store = InMemoryStore::new();
        let clock = Arc::new(test_clock());
        let session = store.seed_session(session_for(UserId::new(), clock.now()));

        let user = extract(&state(&store, clock), &session.session_id.to_string())
            .await
            .unwrap();

        assert_eq!(user.user_id, session.user_id);
    }

    #[tokio::test]
    async fn expired_session_is_rejected() {
        let store = InMemoryStore::new();
        let clock = Arc::new(test_clock());
        let session = store.seed_session(session_for(UserId::new(), clock.now()));
        clock.advance(Duration::hours(2));

        let error = extract(&state(&store, clock), &session.session_id.to_string())
            .await
            .unwrap_err();

        assert_eq!(error.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error.code(), "NOT_AUTHENTICATED");
    }

    #[tokio::test]
    async fn unknown_and_malformed_tokens_are_rejected() {
        let store = InMemoryStore::new();
        let state = state(&store, Arc::new(test_clock()));

        for token in [SessionId::new().to_string(), "not-a-session".to_string()] {
            let error = extract(&state, &token).await.unwrap_err();
            assert_eq!(error.status(), StatusCode::UNAUTHORIZED, "{token}");
        }
    }

    #[tokio::test]
    async fn test_token_maps_to_fixed_user() {
        let store = InMemoryStore::new();

        let user = extract(&state(&store, Arc::new(test_clock())), "test-token")
            .await
            .unwrap();

        assert_eq!(user.user_id, TEST_USER_ID);
    }
}
