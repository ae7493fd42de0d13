//! Attribution: who created a sentence, derived from the log

use super::store::{ContributionError, ContributionResult, ContributionStore};

impl ContributionStore {
    /// User credited with creating a sentence
    ///
    /// The original creator is the author of the *earliest* sentence insert
    /// entry. A sentence can carry several insert entries when it was
    /// re-inserted; later ones are not creations. Returns `None` when there is
    /// no insert entry or its author was anonymous.
    pub async fn original_creator_of(&self, sentence_id: i64) -> ContributionResult<Option<i64>> {
        self.bounded("original_creator_of", async {
            let creator: Option<Option<i64>> = sqlx::query_scalar(
                r#"
                SELECT user_id
                FROM contributions
                WHERE sentence_id = ?
                  AND type = 'sentence'
                  AND action = 'insert'
                ORDER BY datetime ASC, id ASC
                LIMIT 1
                "#,
            )
            .bind(sentence_id)
            .fetch_optional(self.pool())
            .await?;

            Ok::<_, ContributionError>(creator.flatten())
        })
        .await
    }
}
