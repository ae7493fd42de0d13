//! Row count estimation for pagination
//!
//! Unfiltered listings page over the whole log, which only grows. Counting it
//! exactly on every page view is a full scan, so those counts come from the
//! storage engine's own statistics instead. Narrowed queries (moderation,
//! per-user views) are always counted exactly.
//!
//! Statistics are collected when the store opens and then by
//! `run_statistics_refresh`, so estimates trail the table by at most one
//! refresh interval.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::store::{ContributionError, ContributionResult, ContributionStore, CONTRIBUTIONS_TABLE};
use crate::types::ContributionFilter;

/// Source of approximate row counts, chosen at configuration time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowEstimator {
    /// Leading row count from `sqlite_stat1`, as of the last `ANALYZE`
    #[default]
    EngineStatistics,
    /// Always `COUNT(*)`, for back-ends without usable statistics
    Exact,
}

impl RowEstimator {
    /// Approximate number of rows in `table`
    pub async fn approximate_rows(&self, pool: &SqlitePool, table: &str) -> ContributionResult<u64> {
        match self {
            RowEstimator::EngineStatistics => engine_statistics(pool, table).await,
            RowEstimator::Exact => {
                let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
                    .fetch_one(pool)
                    .await?;
                Ok(count as u64)
            }
        }
    }
}

impl std::str::FromStr for RowEstimator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "engine" | "engine_statistics" | "stats" => Ok(RowEstimator::EngineStatistics),
            "exact" => Ok(RowEstimator::Exact),
            other => Err(format!("unknown row estimator '{}'", other)),
        }
    }
}

async fn engine_statistics(pool: &SqlitePool, table: &str) -> ContributionResult<u64> {
    // sqlite_stat1 only exists once ANALYZE has run
    let stat: Option<String> = sqlx::query_scalar("SELECT stat FROM sqlite_stat1 WHERE tbl = ? LIMIT 1")
        .bind(table)
        .fetch_optional(pool)
        .await
        .map_err(|e| ContributionError::StatsUnavailable(e.to_string()))?;

    let stat = stat.ok_or_else(|| {
        ContributionError::StatsUnavailable(format!("no statistics for table {}", table))
    })?;

    parse_row_count(&stat)
        .ok_or_else(|| ContributionError::StatsUnavailable(format!("malformed stat '{}'", stat)))
}

/// The first integer of a `sqlite_stat1.stat` value is the table's row count
fn parse_row_count(stat: &str) -> Option<u64> {
    stat.split_whitespace().next()?.parse().ok()
}

impl ContributionStore {
    /// Count rows for pagination
    ///
    /// An empty filter or the bot-exclusion-only filter is answered from the
    /// configured estimator and may lag the true count. Anything narrower is
    /// counted exactly. If statistics are unavailable the count falls back to
    /// exact rather than failing.
    pub async fn paginate_count(&self, filter: &ContributionFilter) -> ContributionResult<u64> {
        if filter.is_empty() || self.bots().is_exclusion_only(filter) {
            let estimate = self
                .bounded(
                    "paginate_count.estimate",
                    self.config()
                        .row_estimator
                        .approximate_rows(self.pool(), CONTRIBUTIONS_TABLE),
                )
                .await;

            match estimate {
                Ok(rows) => {
                    debug!(rows, "pagination count from estimator");
                    return Ok(rows);
                }
                Err(ContributionError::StatsUnavailable(reason)) => {
                    warn!("row statistics unavailable, counting exactly: {}", reason);
                }
                Err(e) => return Err(e),
            }
        }

        self.exact_count(filter).await
    }

    /// Exact number of rows matching a filter
    pub async fn exact_count(&self, filter: &ContributionFilter) -> ContributionResult<u64> {
        self.bounded("exact_count", async {
            let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM contributions");
            filter.push_where(&mut qb);
            let row = qb.build().fetch_one(self.pool()).await?;
            let count: i64 = row.try_get(0)?;
            Ok::<_, ContributionError>(count as u64)
        })
        .await
    }

    /// Refresh engine statistics (`ANALYZE`)
    ///
    /// Estimated counts reflect the table as of the last refresh.
    pub async fn refresh_statistics(&self) -> ContributionResult<()> {
        sqlx::query(&format!("ANALYZE {}", CONTRIBUTIONS_TABLE))
            .execute(self.pool())
            .await?;
        debug!("refreshed row statistics");
        Ok(())
    }

    /// Refresh statistics every `every`, forever
    ///
    /// Meant to be spawned as a background task. A failed refresh is logged
    /// and retried on the next tick. `every` must be non-zero.
    pub async fn run_statistics_refresh(&self, every: Duration) {
        info!("Statistics refresh running every {:?}", every);

        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately; open() has just refreshed
        interval.tick().await;

        loop {
            interval.tick().await;
            if let Err(e) = self.refresh_statistics().await {
                warn!("statistics refresh failed: {}", e);
            }
        }
    }
}
