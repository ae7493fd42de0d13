//! Per-user endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use super::{store_failure, ApiResponse, ApiResult};
use crate::api::auth::PERMISSION_MODERATE;
use crate::api::extract::Viewer;
use crate::api::state::AppState;
use crate::types::IpUsage;

/// Response for GET /api/users/:id/contributions/count
#[derive(Debug, Serialize)]
pub struct ContributionCount {
    pub user_id: i64,
    pub count: u64,
}

/// GET /api/users/:id/contributions/count - Exact contribution count
pub async fn contribution_count(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> ApiResult<ContributionCount> {
    let count = state
        .store
        .number_of_contributions_by(user_id)
        .await
        .map_err(store_failure)?;

    Ok(Json(ApiResponse::new(ContributionCount { user_id, count })))
}

/// GET /api/users/:id/ips - Most-used origin IPs (moderators)
pub async fn ips(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Path(user_id): Path<i64>,
) -> ApiResult<Vec<IpUsage>> {
    viewer.require(PERMISSION_MODERATE)?;

    let usage = state.store.ip_usage_of(user_id).await.map_err(store_failure)?;
    Ok(Json(ApiResponse::new(usage)))
}
