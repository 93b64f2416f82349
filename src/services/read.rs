use crate::error::AppError;
use sqlx::PgPool;
use uuid::Uuid;

/// Bulk read-marking. One UPDATE flips every message in the conversation not
/// authored by the reader; re-invoking matches zero rows.
#[derive(Clone)]
pub struct ReadService {
    db: PgPool,
}

impl ReadService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Returns the number of messages newly marked read.
    pub async fn mark_read(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE messages SET is_read = TRUE \
             WHERE conversation_id = $1 AND author_id <> $2 AND is_read = FALSE",
        )
        .bind(conversation_id)
        .bind(reader_id)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected())
    }
}
