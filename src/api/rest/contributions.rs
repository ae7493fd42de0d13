//! Contribution feed and listing endpoints

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use super::{store_failure, ApiResponse, ApiResult};
use crate::api::auth::PERMISSION_MODERATE;
use crate::api::extract::Viewer;
use crate::api::state::AppState;
use crate::log_store::{StoreStats, ALL_LANGUAGES};
use crate::types::{ContributionAction, ContributionFilter, ContributionLogEntry, ContributionType};

/// Query parameters for the activity feed
///
/// Kept as raw strings: malformed values give an empty feed, not a 400.
#[derive(Debug, Deserialize)]
pub struct LatestParams {
    #[serde(default = "default_feed_limit")]
    pub limit: String,
    #[serde(default = "default_lang")]
    pub lang: String,
}

fn default_feed_limit() -> String {
    "20".to_string()
}

fn default_lang() -> String {
    ALL_LANGUAGES.to_string()
}

/// GET /api/contributions/latest - Most recent sentence contributions
pub async fn latest(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LatestParams>,
) -> ApiResult<Vec<ContributionLogEntry>> {
    let entries = state
        .store
        .last_contributions(&params.limit, &params.lang)
        .await
        .map_err(store_failure)?;

    Ok(Json(ApiResponse::new(entries)))
}

/// Response for GET /api/contributions/today
#[derive(Debug, serde::Serialize)]
pub struct TodayCount {
    pub count: u64,
}

/// GET /api/contributions/today - Sentences created since local midnight
pub async fn today(State(state): State<Arc<AppState>>) -> ApiResult<TodayCount> {
    let count = state
        .store
        .today_contributions()
        .await
        .map_err(store_failure)?;

    Ok(Json(ApiResponse::new(TodayCount { count })))
}

/// GET /api/contributions/stats - Log statistics
pub async fn stats(State(state): State<Arc<AppState>>) -> ApiResult<StoreStats> {
    let stats = state.store.stats().await.map_err(store_failure)?;
    Ok(Json(ApiResponse::new(stats)))
}

/// Query parameters for the moderation listing
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub user_id: Option<i64>,
    pub sentence_id: Option<i64>,
    pub lang: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<ContributionType>,
    pub action: Option<ContributionAction>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// Bots are excluded unless asked for
    #[serde(default)]
    pub include_bots: bool,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    100
}

impl ListParams {
    fn filter(&self) -> ContributionFilter {
        ContributionFilter {
            sentence_id: self.sentence_id,
            user_id: self.user_id,
            sentence_lang: self.lang.clone(),
            kind: self.kind,
            action: self.action,
            ..Default::default()
        }
    }
}

/// GET /api/contributions - Filtered, paginated listing (moderators)
pub async fn list(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<ContributionLogEntry>> {
    viewer.require(PERMISSION_MODERATE)?;

    let mut filter = params.filter();
    if !params.include_bots {
        filter = state.store.bots().apply(filter);
    }

    let page = state
        .store
        .list_contributions(&filter, params.page, params.per_page)
        .await
        .map_err(store_failure)?;

    Ok(Json(ApiResponse::with_total(page.entries, page.total)))
}
