//! Authenticated sessions.
//!
//! Sign-in happens outside this system; whatever issues sessions writes them
//! where a [`crate::store::SessionStore`] can find them. The booking core only
//! needs to know which user is calling and whether the session is still live.

use crate::types::{SessionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated user session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session id (the bearer token)
    pub session_id: SessionId,
    /// Authenticated user
    pub user_id: UserId,
    /// Expiry
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Creates a new session
    #[must_use]
    pub const fn new(session_id: SessionId, user_id: UserId, expires_at: DateTime<Utc>) -> Self {
        Self {
            session_id,
            user_id,
            expires_at,
        }
    }

    /// A session is live strictly before its expiry.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
