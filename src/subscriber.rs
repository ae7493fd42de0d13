//! Domain event subscriber
//!
//! The sentence and link services call these hooks directly as part of their
//! own mutations. The log never triggers domain mutations itself.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::log_store::{ContributionResult, ContributionStore};
use crate::types::{ActorSource, ContributionLogEntry, LinkAction};

/// A sentence was saved (created or edited)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceSaved {
    pub sentence_id: i64,
    pub was_newly_created: bool,
    /// Set when the save carried a license
    #[serde(default)]
    pub license: Option<String>,
}

/// A translation link was added or removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkChanged {
    pub sentence_id: i64,
    pub translation_id: i64,
    pub action: LinkAction,
}

/// Records contributions in response to domain events
#[derive(Clone)]
pub struct ContributionRecorder {
    store: Arc<ContributionStore>,
}

impl ContributionRecorder {
    pub fn new(store: Arc<ContributionStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ContributionStore {
        &self.store
    }

    /// Log the license carried by a sentence save, if any
    ///
    /// Returns `None` when the save had no license.
    pub async fn on_sentence_saved<A>(
        &self,
        event: &SentenceSaved,
        actor: &A,
    ) -> ContributionResult<Option<ContributionLogEntry>>
    where
        A: ActorSource + ?Sized,
    {
        let Some(ref license) = event.license else {
            return Ok(None);
        };

        let entry = self
            .store
            .record_license_change(event.sentence_id, actor, license, event.was_newly_created)
            .await?;
        Ok(Some(entry))
    }

    /// Log a link change
    pub async fn on_link_changed<A>(
        &self,
        event: &LinkChanged,
        actor: &A,
    ) -> ContributionResult<ContributionLogEntry>
    where
        A: ActorSource + ?Sized,
    {
        self.store
            .record_link_contribution(event.sentence_id, event.translation_id, event.action, actor)
            .await
    }

    /// Relabel the sentence's history after its language changed
    pub async fn on_language_changed(&self, sentence_id: i64, lang: &str) -> ContributionResult<u64> {
        self.store.update_language(sentence_id, lang).await
    }
}
