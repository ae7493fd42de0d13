//! Contribution Log Store
//!
//! This module provides the audit-log storage and its read path:
//! - `ContributionStore`: append-only writes for sentence, link and license events
//! - `BotExclusion`: filters automated accounts out of listings
//! - `RowEstimator`: engine-statistics or exact counts for pagination
//! - Listing and aggregation queries, language propagation and attribution
//!
//! # Architecture
//!
//! ```text
//! Write Path:
//! ┌──────────────┐    ┌────────────────┐    ┌──────────────────────┐
//! │ Sentence /   │───►│ resolve actor, │───►│ INSERT contributions │
//! │ link service │    │ stamp time     │    │ (append-only)        │
//! └──────────────┘    └────────────────┘    └──────────────────────┘
//!
//! Read Path:
//! ┌──────────────┐    ┌────────────────┐    ┌──────────────────────┐
//! │ Feed / admin │───►│ bot exclusion  │───►│ last_contributions   │
//! │ request      │    │ + filter       │    │ view or contributions│
//! └──────────────┘    └────────────────┘    └──────────────────────┘
//!                              │
//!                              ▼
//!                     ┌────────────────┐
//!                     │ paginate_count │──► sqlite_stat1 or COUNT(*)
//!                     └────────────────┘
//! ```

mod attribution;
mod bot_filter;
mod estimator;
mod propagation;
mod queries;
mod stats;
mod store;

pub use bot_filter::BotExclusion;
pub use estimator::RowEstimator;
pub use queries::{ContributionPage, ALL_LANGUAGES, IP_USAGE_LIMIT};
pub use stats::StoreStats;
pub use store::{
    ContributionError, ContributionResult, ContributionStore, StoreConfig, CONTRIBUTIONS_TABLE,
};
