use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use crate::models::Role;
use crate::services::accounts::Registration;
use crate::state::AppState;
use crate::utils::response::{empty_success, success};
use crate::utils::{AppError, AppResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Response> {
    let role = match req.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        None => Role::Attendee,
        Some(raw) => raw
            .parse::<Role>()
            .map_err(|e| AppError::ValidationError(e.to_string()))?,
    };

    state
        .accounts
        .register(Registration {
            name: req.name,
            email: req.email,
            password: req.password,
            role,
        })
        .await?;

    Ok(empty_success("Registration successful."))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Response> {
    let session = state.accounts.login(&req.email, &req.password).await?;
    Ok(success(session, "Login successful."))
}
