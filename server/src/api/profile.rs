//! The caller's profile view.

use super::{EventView, views};
use crate::auth::SessionUser;
use crate::server::state::AppState;
use axum::extract::State;
use eventbook_web::{AppError, AppJson};

/// Events the caller has booked, in booking order.
///
/// ```bash
/// curl http://localhost:8080/api/me/bookings -H "Authorization: Bearer <session_id>"
/// ```
pub async fn my_bookings(
    user: SessionUser,
    State(state): State<AppState>,
) -> Result<AppJson<Vec<EventView>>, AppError> {
    let events = state.catalog.booked_events(Some(&user.session)).await?;
    Ok(AppJson(views(events)))
}
