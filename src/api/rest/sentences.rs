//! Sentence endpoints: history, attribution and event hooks

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{store_failure, ApiError, ApiResponse, ApiResult};
use crate::api::auth::PERMISSION_WRITE;
use crate::api::extract::{RequestActor, Viewer};
use crate::api::state::AppState;
use crate::subscriber::SentenceSaved;
use crate::types::{ContributionAction, ContributionLogEntry, SentenceSnapshot};

/// GET /api/sentences/:id/contributions - Sentence history, oldest first
pub async fn history(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Path(sentence_id): Path<i64>,
) -> ApiResult<Vec<ContributionLogEntry>> {
    let entries = state
        .store
        .contributions_related_to_sentence(sentence_id, viewer.visibility())
        .await
        .map_err(store_failure)?;

    Ok(Json(ApiResponse::new(entries)))
}

/// Response for GET /api/sentences/:id/creator
#[derive(Debug, Serialize)]
pub struct Creator {
    pub sentence_id: i64,
    pub user_id: Option<i64>,
}

/// GET /api/sentences/:id/creator - Original creator of a sentence
pub async fn creator(
    State(state): State<Arc<AppState>>,
    Path(sentence_id): Path<i64>,
) -> ApiResult<Creator> {
    let user_id = state
        .store
        .original_creator_of(sentence_id)
        .await
        .map_err(store_failure)?;

    Ok(Json(ApiResponse::new(Creator {
        sentence_id,
        user_id,
    })))
}

/// Body for POST /api/sentences/:id/contributions
#[derive(Debug, Deserialize)]
pub struct RecordSentenceBody {
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub script: Option<String>,
    pub text: String,
    pub action: ContributionAction,
}

/// POST /api/sentences/:id/contributions - Log a sentence insert, edit or delete
pub async fn record(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    headers: HeaderMap,
    Path(sentence_id): Path<i64>,
    Json(body): Json<RecordSentenceBody>,
) -> Result<(StatusCode, Json<ApiResponse<ContributionLogEntry>>), super::ApiRejection> {
    viewer.require(PERMISSION_WRITE)?;
    let actor = RequestActor::new(&viewer, &headers);

    let snapshot = SentenceSnapshot {
        sentence_id,
        lang: body.lang,
        script: body.script,
        text: body.text,
    };
    let entry = state
        .store
        .record_sentence_contribution(snapshot, body.action, &actor)
        .await
        .map_err(store_failure)?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(entry))))
}

/// Body for POST /api/sentences/:id/saved
#[derive(Debug, Deserialize)]
pub struct SentenceSavedBody {
    pub was_newly_created: bool,
    #[serde(default)]
    pub license: Option<String>,
}

/// POST /api/sentences/:id/saved - Sentence-saved event; logs the license if present
pub async fn saved(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    headers: HeaderMap,
    Path(sentence_id): Path<i64>,
    Json(body): Json<SentenceSavedBody>,
) -> ApiResult<Option<ContributionLogEntry>> {
    viewer.require(PERMISSION_WRITE)?;
    let actor = RequestActor::new(&viewer, &headers);

    let event = SentenceSaved {
        sentence_id,
        was_newly_created: body.was_newly_created,
        license: body.license,
    };
    let entry = state
        .recorder
        .on_sentence_saved(&event, &actor)
        .await
        .map_err(store_failure)?;

    Ok(Json(ApiResponse::new(entry)))
}

/// Body for PUT /api/sentences/:id/language
#[derive(Debug, Deserialize)]
pub struct LanguageBody {
    pub lang: String,
}

/// Response for PUT /api/sentences/:id/language
#[derive(Debug, Serialize)]
pub struct Relabelled {
    pub rows: u64,
}

/// PUT /api/sentences/:id/language - Propagate a language change to the history
pub async fn language(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Path(sentence_id): Path<i64>,
    Json(body): Json<LanguageBody>,
) -> ApiResult<Relabelled> {
    viewer.require(PERMISSION_WRITE)?;

    // The store trusts its caller; over HTTP the caller is this handler.
    if body.lang.is_empty() || !body.lang.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::bad_request(format!("invalid language code '{}'", body.lang))),
        ));
    }

    let rows = state
        .recorder
        .on_language_changed(sentence_id, &body.lang)
        .await
        .map_err(store_failure)?;

    Ok(Json(ApiResponse::new(Relabelled { rows })))
}
