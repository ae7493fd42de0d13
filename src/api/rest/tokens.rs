//! Token endpoint

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use super::{ApiError, ApiRejection};
use crate::api::auth::{AccessToken, AuthError};
use crate::api::state::AppState;

/// Body for POST /auth/token
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /auth/token - Exchange credentials for an access token
pub async fn issue(
    State(state): State<Arc<AppState>>,
    Json(login): Json<LoginRequest>,
) -> Result<Json<AccessToken>, ApiRejection> {
    let user = state
        .auth
        .authenticate(&login.username, &login.password)
        .map_err(|e| (StatusCode::UNAUTHORIZED, Json(ApiError::unauthorized(e.to_string()))))?;

    let token = state.auth.generate_token(user).map_err(|e: AuthError| {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiError::internal(e.to_string())))
    })?;

    Ok(Json(token))
}
