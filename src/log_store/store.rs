//! Contribution Store - append-only log of contribution events
//!
//! The store owns the SQLite pool and the write path. Read queries live in
//! sibling modules as further `impl ContributionStore` blocks.

use std::collections::BTreeSet;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, error, info, warn};

use super::bot_filter::BotExclusion;
use super::estimator::RowEstimator;
use crate::types::{
    ActorSource, ContributionAction, ContributionLogEntry, ContributionType, LinkAction,
    SentenceSnapshot,
};
use crate::utils::{from_millis, to_millis, Clock, SystemClock};

/// Table holding every contribution
pub const CONTRIBUTIONS_TABLE: &str = "contributions";

/// Column list shared by every entry query
pub(crate) const ENTRY_COLUMNS: &str = "id, sentence_id, translation_id, sentence_lang, script, \
     text, user_id, datetime, ip, type, action";

/// Configuration for the ContributionStore
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// SQLite database URL (e.g. "sqlite://contributions.db")
    pub database_url: String,
    /// Maximum number of pooled connections
    pub max_connections: u32,
    /// Automated accounts excluded from public feeds
    pub bot_user_ids: BTreeSet<i64>,
    /// How unfiltered pagination counts are obtained
    pub row_estimator: RowEstimator,
    /// Upper bound for any single read query
    pub query_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://contributions.db".to_string(),
            max_connections: 5,
            bot_user_ids: BTreeSet::new(),
            row_estimator: RowEstimator::EngineStatistics,
            query_timeout: Duration::from_secs(5),
        }
    }
}

impl StoreConfig {
    /// Create config for a database URL
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }

    /// Create config for a database file path
    pub fn with_path<P: AsRef<std::path::Path>>(path: P) -> Self {
        Self::new(format!("sqlite://{}", path.as_ref().display()))
    }

    pub fn bot_user_ids(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.bot_user_ids = ids.into_iter().collect();
        self
    }

    pub fn row_estimator(mut self, estimator: RowEstimator) -> Self {
        self.row_estimator = estimator;
        self
    }

    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }
}

/// Result type for ContributionStore operations
pub type ContributionResult<T> = Result<T, ContributionError>;

/// Errors that can occur in ContributionStore operations
#[derive(Debug, thiserror::Error)]
pub enum ContributionError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("could not resolve actor: {0}")]
    ActorUnresolved(String),
    #[error("invalid stored contribution: {0}")]
    InvalidRow(String),
    #[error("query timed out after {0:?}")]
    Timeout(Duration),
    #[error("row statistics unavailable: {0}")]
    StatsUnavailable(String),
}

/// Raw row as stored in SQLite
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ContributionRow {
    id: i64,
    sentence_id: i64,
    translation_id: Option<i64>,
    sentence_lang: Option<String>,
    script: Option<String>,
    text: Option<String>,
    user_id: Option<i64>,
    datetime: i64,
    ip: Option<String>,
    #[sqlx(rename = "type")]
    kind: String,
    action: String,
}

impl TryFrom<ContributionRow> for ContributionLogEntry {
    type Error = ContributionError;

    fn try_from(row: ContributionRow) -> Result<Self, Self::Error> {
        let kind = ContributionType::from_str(&row.kind).map_err(ContributionError::InvalidRow)?;
        let action =
            ContributionAction::from_str(&row.action).map_err(ContributionError::InvalidRow)?;
        let datetime = from_millis(row.datetime).ok_or_else(|| {
            ContributionError::InvalidRow(format!("datetime {} out of range", row.datetime))
        })?;

        Ok(ContributionLogEntry {
            id: row.id,
            sentence_id: row.sentence_id,
            translation_id: row.translation_id,
            sentence_lang: row.sentence_lang,
            script: row.script,
            text: row.text,
            user_id: row.user_id,
            datetime,
            ip: row.ip,
            kind,
            action,
        })
    }
}

pub(crate) fn into_entries(rows: Vec<ContributionRow>) -> ContributionResult<Vec<ContributionLogEntry>> {
    rows.into_iter().map(ContributionLogEntry::try_from).collect()
}

/// Entry fields supplied by the caller; actor and time are stamped by the store
struct NewContribution {
    sentence_id: i64,
    translation_id: Option<i64>,
    sentence_lang: Option<String>,
    script: Option<String>,
    text: Option<String>,
    kind: ContributionType,
    action: ContributionAction,
}

/// The ContributionStore manages the append-only contribution log
pub struct ContributionStore {
    pool: SqlitePool,
    config: StoreConfig,
    bots: BotExclusion,
    clock: Arc<dyn Clock>,
}

impl ContributionStore {
    /// Open the store: connect, run migrations, sync the bot-account table and
    /// collect engine statistics
    pub async fn open(config: StoreConfig) -> ContributionResult<Self> {
        info!("Opening contribution store at {}", config.database_url);

        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(1)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let store = Self {
            pool,
            bots: BotExclusion::new(config.bot_user_ids.iter().copied()),
            config,
            clock: Arc::new(SystemClock),
        };
        store.sync_bot_accounts().await?;
        store.refresh_statistics().await?;

        Ok(store)
    }

    /// Replace the clock used to stamp entries and compute "today"
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Get the bot exclusion filter built from the configured ids
    pub fn bots(&self) -> &BotExclusion {
        &self.bots
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Close the connection pool
    pub async fn close(&self) {
        info!("Closing contribution store");
        self.pool.close().await;
    }

    /// Mirror the configured bot ids into `bot_accounts`, which backs the
    /// `last_contributions` view
    async fn sync_bot_accounts(&self) -> ContributionResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM bot_accounts")
            .execute(&mut *tx)
            .await?;

        for user_id in self.bots.ids() {
            sqlx::query("INSERT INTO bot_accounts (user_id) VALUES (?)")
                .bind(*user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        info!("Synced {} bot accounts", self.bots.ids().len());
        Ok(())
    }

    /// Run a read query under the configured timeout
    pub(crate) async fn bounded<T, F>(&self, query: &'static str, fut: F) -> ContributionResult<T>
    where
        F: Future<Output = ContributionResult<T>>,
    {
        let limit = self.config.query_timeout;
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(query, ?limit, "contribution query timed out");
                Err(ContributionError::Timeout(limit))
            }
        }
    }

    /// Append one entry, stamping actor, ip and time
    async fn append<A>(&self, new: NewContribution, actor: &A) -> ContributionResult<ContributionLogEntry>
    where
        A: ActorSource + ?Sized,
    {
        let actor = actor.resolve_actor().map_err(|e| {
            error!(sentence_id = new.sentence_id, kind = %new.kind, "refusing contribution: {}", e);
            e
        })?;
        // Stored at millisecond precision; hand back what a read would return
        let now = self.clock.now();
        let stamp = to_millis(now);
        let datetime = from_millis(stamp).unwrap_or(now);
        let ip = actor.ip.to_string();

        let result = sqlx::query(
            r#"
            INSERT INTO contributions (
                sentence_id, translation_id, sentence_lang, script, text,
                user_id, datetime, ip, type, action
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.sentence_id)
        .bind(new.translation_id)
        .bind(new.sentence_lang.as_deref())
        .bind(new.script.as_deref())
        .bind(new.text.as_deref())
        .bind(actor.user_id)
        .bind(stamp)
        .bind(ip.as_str())
        .bind(new.kind.as_str())
        .bind(new.action.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(sentence_id = new.sentence_id, kind = %new.kind, "failed to append contribution: {}", e);
            ContributionError::from(e)
        })?;

        let entry = ContributionLogEntry {
            id: result.last_insert_rowid(),
            sentence_id: new.sentence_id,
            translation_id: new.translation_id,
            sentence_lang: new.sentence_lang,
            script: new.script,
            text: new.text,
            user_id: actor.user_id,
            datetime,
            ip: Some(ip),
            kind: new.kind,
            action: new.action,
        };

        debug!(
            id = entry.id,
            sentence_id = entry.sentence_id,
            kind = %entry.kind,
            action = %entry.action,
            "appended contribution"
        );

        Ok(entry)
    }

    /// Log an insert, update or delete of a sentence
    pub async fn record_sentence_contribution<A>(
        &self,
        sentence: SentenceSnapshot,
        action: ContributionAction,
        actor: &A,
    ) -> ContributionResult<ContributionLogEntry>
    where
        A: ActorSource + ?Sized,
    {
        let new = NewContribution {
            sentence_id: sentence.sentence_id,
            translation_id: None,
            sentence_lang: sentence.lang,
            script: sentence.script,
            text: Some(sentence.text),
            kind: ContributionType::Sentence,
            action,
        };
        self.append(new, actor).await
    }

    /// Log a translation link being added or removed
    pub async fn record_link_contribution<A>(
        &self,
        sentence_id: i64,
        translation_id: i64,
        action: LinkAction,
        actor: &A,
    ) -> ContributionResult<ContributionLogEntry>
    where
        A: ActorSource + ?Sized,
    {
        let new = NewContribution {
            sentence_id,
            translation_id: Some(translation_id),
            sentence_lang: None,
            script: None,
            text: None,
            kind: ContributionType::Link,
            action: action.into(),
        };
        self.append(new, actor).await
    }

    /// Log a license being set on a new sentence or changed on an existing one
    pub async fn record_license_change<A>(
        &self,
        sentence_id: i64,
        actor: &A,
        license: &str,
        is_new_entity: bool,
    ) -> ContributionResult<ContributionLogEntry>
    where
        A: ActorSource + ?Sized,
    {
        let action = if is_new_entity {
            ContributionAction::Insert
        } else {
            ContributionAction::Update
        };
        let new = NewContribution {
            sentence_id,
            translation_id: None,
            sentence_lang: None,
            script: None,
            text: Some(license.to_string()),
            kind: ContributionType::License,
            action,
        };
        self.append(new, actor).await
    }
}
