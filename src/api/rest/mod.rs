//! REST API module for HTTP endpoints
//!
//! Provides REST endpoints over the contribution log:
//! - `GET /api/contributions/latest` - Public activity feed
//! - `GET /api/contributions` - Filtered moderation listing
//! - `GET /api/sentences/:id/contributions` - Sentence history
//! - `GET /api/users/:id/...` - Per-user aggregates
//! - `POST /api/...` - Domain event hooks for the sentence and link services

pub mod contributions;
pub mod links;
pub mod sentences;
pub mod tokens;
pub mod users;

use axum::{http::StatusCode, Json};
use serde::Serialize;
use tracing::error;

use crate::log_store::ContributionError;

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Total count (for paginated responses)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data, total: None }
    }

    pub fn with_total(data: T, total: u64) -> Self {
        Self {
            data,
            total: Some(total),
        }
    }
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    fn new(message: impl Into<String>, code: &str) -> Self {
        Self {
            error: message.into(),
            code: code.to_string(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(message, "BAD_REQUEST")
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(message, "UNAUTHORIZED")
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(message, "FORBIDDEN")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(message, "INTERNAL_ERROR")
    }
}

/// Error half of every handler result
pub type ApiRejection = (StatusCode, Json<ApiError>);

/// Handler result
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiRejection>;

impl From<ContributionError> for ApiError {
    fn from(e: ContributionError) -> Self {
        match e {
            ContributionError::Timeout(_) => Self::new(e.to_string(), "TIMEOUT"),
            ContributionError::ActorUnresolved(_) => Self::new(e.to_string(), "ACTOR_UNRESOLVED"),
            _ => Self::internal(e.to_string()),
        }
    }
}

/// Map a store failure to a response
pub fn store_failure(e: ContributionError) -> ApiRejection {
    let status = match e {
        ContributionError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        ContributionError::ActorUnresolved(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("contribution store failure: {}", e);
    }
    (status, Json(ApiError::from(e)))
}
