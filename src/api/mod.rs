//! API module for HTTP endpoints
//!
//! This module exposes the contribution log over REST for activity feeds,
//! sentence history views, moderation tooling and the domain services that
//! report sentence and link changes.

pub mod auth;
pub mod extract;
pub mod http;
pub mod rest;
pub mod state;

pub use http::create_router;
pub use state::AppState;
