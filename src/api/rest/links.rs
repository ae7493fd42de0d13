//! Link endpoint

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};

use super::{store_failure, ApiRejection, ApiResponse};
use crate::api::auth::PERMISSION_WRITE;
use crate::api::extract::{RequestActor, Viewer};
use crate::api::state::AppState;
use crate::subscriber::LinkChanged;
use crate::types::ContributionLogEntry;

/// POST /api/links - Link-changed event
pub async fn changed(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    headers: HeaderMap,
    Json(event): Json<LinkChanged>,
) -> Result<(StatusCode, Json<ApiResponse<ContributionLogEntry>>), ApiRejection> {
    viewer.require(PERMISSION_WRITE)?;
    let actor = RequestActor::new(&viewer, &headers);

    let entry = state
        .recorder
        .on_link_changed(&event, &actor)
        .await
        .map_err(store_failure)?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(entry))))
}
