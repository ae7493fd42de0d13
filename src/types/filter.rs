//! Query filter over the contribution log

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite};

use super::{ContributionAction, ContributionType};

/// Conjunction of predicates over contribution rows
///
/// `excluded_user_ids` is the single canonical exclusion clause. Bot exclusion
/// merges into it instead of appending a new clause, so applying it twice
/// yields the same filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionFilter {
    #[serde(default)]
    pub sentence_id: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub sentence_lang: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<ContributionType>,
    #[serde(default)]
    pub action: Option<ContributionAction>,
    #[serde(default)]
    pub excluded_user_ids: BTreeSet<i64>,
}

impl ContributionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sentence(mut self, sentence_id: i64) -> Self {
        self.sentence_id = Some(sentence_id);
        self
    }

    pub fn user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.sentence_lang = Some(lang.into());
        self
    }

    pub fn kind(mut self, kind: ContributionType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn action(mut self, action: ContributionAction) -> Self {
        self.action = Some(action);
        self
    }

    /// True when any predicate other than user exclusion is set
    pub fn has_predicates(&self) -> bool {
        self.sentence_id.is_some()
            || self.user_id.is_some()
            || self.sentence_lang.is_some()
            || self.kind.is_some()
            || self.action.is_some()
    }

    /// True when the filter matches every row
    pub fn is_empty(&self) -> bool {
        !self.has_predicates() && self.excluded_user_ids.is_empty()
    }

    /// Append ` WHERE ...` for this filter to a query
    pub(crate) fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" WHERE 1 = 1");

        if let Some(sentence_id) = self.sentence_id {
            qb.push(" AND sentence_id = ").push_bind(sentence_id);
        }
        if let Some(user_id) = self.user_id {
            qb.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(ref lang) = self.sentence_lang {
            qb.push(" AND sentence_lang = ").push_bind(lang.clone());
        }
        if let Some(kind) = self.kind {
            qb.push(" AND type = ").push_bind(kind.as_str());
        }
        if let Some(action) = self.action {
            qb.push(" AND action = ").push_bind(action.as_str());
        }

        // Anonymous rows are never bot rows; NOT IN alone would drop them.
        if !self.excluded_user_ids.is_empty() {
            qb.push(" AND (user_id IS NULL OR user_id NOT IN (");
            let mut ids = qb.separated(", ");
            for user_id in &self.excluded_user_ids {
                ids.push_bind(*user_id);
            }
            ids.push_unseparated("))");
        }
    }
}
