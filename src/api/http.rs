//! HTTP server setup with Axum

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::rest::{contributions, links, sentences, tokens, users};
use super::state::AppState;

/// Create the Axum router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    // Feeds are read cross-origin by the corpus web UI
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        .route("/auth/token", post(tokens::issue))
        // Feeds and listings
        .route("/api/contributions", get(contributions::list))
        .route("/api/contributions/latest", get(contributions::latest))
        .route("/api/contributions/today", get(contributions::today))
        .route("/api/contributions/stats", get(contributions::stats))
        // Sentences
        .route(
            "/api/sentences/:id/contributions",
            get(sentences::history).post(sentences::record),
        )
        .route("/api/sentences/:id/creator", get(sentences::creator))
        .route("/api/sentences/:id/saved", post(sentences::saved))
        .route("/api/sentences/:id/language", put(sentences::language))
        // Links
        .route("/api/links", post(links::changed))
        // Users
        .route(
            "/api/users/:id/contributions/count",
            get(users::contribution_count),
        )
        .route("/api/users/:id/ips", get(users::ips))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
