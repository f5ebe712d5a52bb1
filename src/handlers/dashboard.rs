use axum::extract::State;
use axum::response::Response;

use crate::auth::{Action, CurrentUser};
use crate::state::AppState;
use crate::utils::response::success;
use crate::utils::AppResult;

pub async fn admin_dashboard(State(state): State<AppState>, user: CurrentUser) -> AppResult<Response> {
    user.require(Action::ViewAdminDashboard)?;
    let summary = state.dashboard.admin().await?;
    Ok(success(summary, "Admin dashboard"))
}

pub async fn organizer_dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Response> {
    user.require(Action::ViewOrganizerDashboard)?;
    let summary = state.dashboard.organizer(user.id).await?;
    Ok(success(summary, "Organizer dashboard"))
}
