//! Language propagation
//!
//! `sentence_lang` is stored on every row so that language-filtered feeds
//! never join against sentences. When a sentence's language changes, every
//! historical row for it is relabelled: rows report the sentence's current
//! language, not the language at the time of the event.
//!
//! Propagation is a single `UPDATE` and is not coupled with concurrent
//! inserts. A row appended with the old language while propagation runs
//! keeps it until the next propagation for that sentence.

use tracing::info;

use super::store::{ContributionResult, ContributionStore};

impl ContributionStore {
    /// Set `sentence_lang` on every existing entry for a sentence
    ///
    /// `lang` is not validated here; the sentence service validates it before
    /// calling. Returns the number of rows relabelled.
    pub async fn update_language(&self, sentence_id: i64, lang: &str) -> ContributionResult<u64> {
        let result = sqlx::query("UPDATE contributions SET sentence_lang = ? WHERE sentence_id = ?")
            .bind(lang)
            .bind(sentence_id)
            .execute(self.pool())
            .await?;

        let rows = result.rows_affected();
        info!(sentence_id, lang, rows, "propagated sentence language");
        Ok(rows)
    }
}
