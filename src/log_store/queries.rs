//! Listing and aggregation queries over the contribution log

use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite};

use super::store::{
    into_entries, ContributionError, ContributionResult, ContributionRow, ContributionStore,
    ENTRY_COLUMNS,
};
use crate::types::{
    ContributionFilter, ContributionLogEntry, ContributionType, IpUsage, Visibility,
};
use crate::utils::{local_midnight, to_millis};

/// Language code meaning "all languages"
pub const ALL_LANGUAGES: &str = "und";

/// Number of origin IPs reported per user
pub const IP_USAGE_LIMIT: i64 = 10;

/// One page of a filtered listing
#[derive(Debug, Clone, Serialize)]
pub struct ContributionPage {
    pub entries: Vec<ContributionLogEntry>,
    /// From `paginate_count`; approximate for unfiltered listings
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

/// Parse a feed limit: a positive integer, anything else is rejected
fn parse_limit(limit: &str) -> Option<i64> {
    match limit.trim().parse::<u32>() {
        Ok(limit) if limit > 0 => Some(i64::from(limit)),
        _ => None,
    }
}

/// Language codes are alphanumeric (`eng`, `cmn`, `und`)
fn is_valid_lang(lang: &str) -> bool {
    lang.chars().all(|c| c.is_ascii_alphanumeric())
}

impl ContributionStore {
    /// Most recent sentence contributions, newest first
    ///
    /// `lang` of `"und"` or empty means all languages and reads the
    /// pre-filtered `last_contributions` view. Any other language is filtered
    /// here, with bots excluded. A malformed `limit` or `lang` yields an empty
    /// result rather than an error: a non-numeric, zero or negative limit, or
    /// a language with non-alphanumeric characters such as `zh-Hant`.
    pub async fn last_contributions(
        &self,
        limit: &str,
        lang: &str,
    ) -> ContributionResult<Vec<ContributionLogEntry>> {
        let Some(limit) = parse_limit(limit) else {
            return Ok(Vec::new());
        };
        let lang = lang.trim();
        if !is_valid_lang(lang) {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM ", ENTRY_COLUMNS));
        if lang.is_empty() || lang == ALL_LANGUAGES {
            qb.push("last_contributions");
        } else {
            let filter = self.bots().apply(
                ContributionFilter::new()
                    .kind(ContributionType::Sentence)
                    .lang(lang),
            );
            qb.push("contributions");
            filter.push_where(&mut qb);
        }
        qb.push(" ORDER BY datetime DESC, id DESC LIMIT ").push_bind(limit);

        self.bounded("last_contributions", async {
            let rows: Vec<ContributionRow> = qb.build_query_as().fetch_all(self.pool()).await?;
            into_entries(rows)
        })
        .await
    }

    /// Full history of one sentence, oldest first
    ///
    /// License entries are only returned to privileged readers.
    pub async fn contributions_related_to_sentence(
        &self,
        sentence_id: i64,
        visibility: Visibility,
    ) -> ContributionResult<Vec<ContributionLogEntry>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM contributions", ENTRY_COLUMNS));
        ContributionFilter::new().sentence(sentence_id).push_where(&mut qb);
        if !visibility.can_see(ContributionType::License) {
            qb.push(" AND type != ").push_bind(ContributionType::License.as_str());
        }
        qb.push(" ORDER BY datetime ASC, id ASC");

        self.bounded("contributions_related_to_sentence", async {
            let rows: Vec<ContributionRow> = qb.build_query_as().fetch_all(self.pool()).await?;
            into_entries(rows)
        })
        .await
    }

    /// Number of brand-new sentences since local midnight
    ///
    /// Counts sentence inserts only: no translation links, no license changes.
    pub async fn today_contributions(&self) -> ContributionResult<u64> {
        let since = local_midnight(self.clock().now());

        self.bounded("today_contributions", async {
            let count: i64 = sqlx::query_scalar(
                r#"
                SELECT COUNT(*)
                FROM contributions
                WHERE type = 'sentence'
                  AND action = 'insert'
                  AND translation_id IS NULL
                  AND datetime >= ?
                "#,
            )
            .bind(to_millis(since))
            .fetch_one(self.pool())
            .await?;
            Ok::<_, ContributionError>(count as u64)
        })
        .await
    }

    /// Exact number of contributions made by a user
    pub async fn number_of_contributions_by(&self, user_id: i64) -> ContributionResult<u64> {
        self.exact_count(&ContributionFilter::new().user(user_id)).await
    }

    /// The user's ten most-used origin IPs, most used first
    pub async fn ip_usage_of(&self, user_id: i64) -> ContributionResult<Vec<IpUsage>> {
        self.bounded("ip_usage_of", async {
            let rows: Vec<(Option<String>, i64)> = sqlx::query_as(
                r#"
                SELECT ip, COUNT(*) AS count
                FROM contributions
                WHERE user_id = ?
                GROUP BY ip
                ORDER BY count DESC, ip ASC
                LIMIT ?
                "#,
            )
            .bind(user_id)
            .bind(IP_USAGE_LIMIT)
            .fetch_all(self.pool())
            .await?;

            Ok::<_, ContributionError>(
                rows.into_iter()
                    .map(|(ip, count)| IpUsage {
                        ip,
                        count: count as u64,
                    })
                    .collect(),
            )
        })
        .await
    }

    /// One page of a filtered listing, newest first
    ///
    /// `page` is 1-based. The total comes from `paginate_count`.
    pub async fn list_contributions(
        &self,
        filter: &ContributionFilter,
        page: u32,
        per_page: u32,
    ) -> ContributionResult<ContributionPage> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, 1000);
        let offset = i64::from(page - 1) * i64::from(per_page);

        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM contributions", ENTRY_COLUMNS));
        filter.push_where(&mut qb);
        qb.push(" ORDER BY datetime DESC, id DESC LIMIT ")
            .push_bind(i64::from(per_page))
            .push(" OFFSET ")
            .push_bind(offset);

        let entries = self
            .bounded("list_contributions", async {
                let rows: Vec<ContributionRow> = qb.build_query_as().fetch_all(self.pool()).await?;
                into_entries(rows)
            })
            .await?;
        let total = self.paginate_count(filter).await?;

        Ok(ContributionPage {
            entries,
            total,
            page,
            per_page,
        })
    }
}
