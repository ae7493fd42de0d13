//! Contribution Log
//!
//! Append-only audit trail for a collaborative multilingual sentence corpus:
//! who created, edited or deleted which sentence, translation link or
//! license, when, and from where.
//!
//! # Features
//!
//! - **Append-Only**: rows are write-once, enforced by the schema
//! - **Bot Exclusion**: automated accounts filtered out of public feeds
//! - **Cheap Pagination**: unfiltered counts come from engine statistics
//! - **Denormalized Language**: per-row language kept current by bulk propagation
//! - **Attribution**: original creator resolved from the log
//!
//! # Modules
//!
//! - `types`: Log entry, enums, actor context and filters
//! - `log_store`: SQLite-backed store, counting, queries, propagation
//! - `subscriber`: Typed hooks for sentence and link domain events
//! - `api`: Axum REST API with JWT authentication
//! - `config`: Environment configuration
//! - `utils`: Clock and timestamp helpers
//!
//! # Example
//!
//! ```no_run
//! use std::net::Ipv4Addr;
//! use contribution_log::{Actor, ContributionAction, ContributionStore, SentenceSnapshot, StoreConfig};
//!
//! # async fn example() -> contribution_log::ContributionResult<()> {
//! let store = ContributionStore::open(StoreConfig::new("sqlite://contributions.db").bot_user_ids([3])).await?;
//! let actor = Actor::user(42, Ipv4Addr::LOCALHOST.into());
//! let sentence = SentenceSnapshot {
//!     sentence_id: 1,
//!     lang: Some("eng".to_string()),
//!     script: None,
//!     text: "Hello world.".to_string(),
//! };
//! store.record_sentence_contribution(sentence, ContributionAction::Insert, &actor).await?;
//! let feed = store.last_contributions("10", "und").await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod log_store;
pub mod subscriber;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::AppConfig;
pub use log_store::{
    BotExclusion, ContributionError, ContributionResult, ContributionStore, RowEstimator,
    StoreConfig,
};
pub use subscriber::{ContributionRecorder, LinkChanged, SentenceSaved};
pub use types::{
    Actor, ActorSource, ContributionAction, ContributionFilter, ContributionLogEntry,
    ContributionType, LinkAction, SentenceSnapshot, Visibility,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
