//! Bot exclusion filter

use std::collections::BTreeSet;

use crate::types::ContributionFilter;

/// Excludes contributions authored by automated accounts
///
/// The bot id set is fixed at construction; there is no process-wide lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BotExclusion {
    ids: BTreeSet<i64>,
}

impl BotExclusion {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn ids(&self) -> &BTreeSet<i64> {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Add "user_id not in bots" to a filter
    ///
    /// The bot ids are merged into the filter's exclusion set, so the result
    /// is the same no matter how many times this is applied.
    pub fn apply(&self, mut filter: ContributionFilter) -> ContributionFilter {
        if !self.ids.is_empty() {
            filter.excluded_user_ids.extend(self.ids.iter().copied());
        }
        filter
    }

    /// True for the default listing view: no predicate but bot exclusion
    pub fn is_exclusion_only(&self, filter: &ContributionFilter) -> bool {
        !self.ids.is_empty() && !filter.has_predicates() && filter.excluded_user_ids == self.ids
    }
}
