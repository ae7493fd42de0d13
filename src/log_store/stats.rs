//! Contribution Store Statistics
//!
//! Provides statistics about the log:
//! - Estimated and exact row counts
//! - Entries by type
//! - Configured bot accounts

use std::collections::BTreeMap;

use serde::Serialize;

use super::store::{ContributionError, ContributionResult, ContributionStore, CONTRIBUTIONS_TABLE};
use crate::types::ContributionType;

/// Statistics about the contribution log
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    /// Row count from engine statistics, `None` when the engine has none
    pub estimated_rows: Option<u64>,
    /// Live row count
    pub exact_rows: u64,
    /// Entries by type
    pub entries_by_type: BTreeMap<ContributionType, u64>,
    /// Number of configured bot accounts
    pub bot_accounts: usize,
}

impl ContributionStore {
    /// Collect all statistics
    pub async fn stats(&self) -> ContributionResult<StoreStats> {
        let estimate = self
            .bounded(
                "stats.estimate",
                self.config()
                    .row_estimator
                    .approximate_rows(self.pool(), CONTRIBUTIONS_TABLE),
            )
            .await;
        let estimated_rows = match estimate {
            Ok(rows) => Some(rows),
            Err(ContributionError::StatsUnavailable(_)) => None,
            Err(e) => return Err(e),
        };

        let by_type: Vec<(String, i64)> = self
            .bounded("stats", async {
                let rows: Vec<(String, i64)> = sqlx::query_as("SELECT type, COUNT(*) FROM contributions GROUP BY type")
                    .fetch_all(self.pool())
                    .await?;
                Ok::<_, ContributionError>(rows)
            })
            .await?;

        let mut stats = StoreStats {
            estimated_rows,
            bot_accounts: self.bots().ids().len(),
            ..Default::default()
        };
        for (kind, count) in by_type {
            let kind = kind
                .parse::<ContributionType>()
                .map_err(ContributionError::InvalidRow)?;
            stats.entries_by_type.insert(kind, count as u64);
            stats.exact_rows += count as u64;
        }

        Ok(stats)
    }
}
