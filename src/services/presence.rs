use crate::error::AppError;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Owns the presence columns on the user row. Nothing else writes them.
#[derive(Clone)]
pub struct PresenceService {
    db: PgPool,
}

impl PresenceService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Called on connect, before the connection is considered live. A user
    /// row that no longer exists means the identity is stale; the caller
    /// must terminate the connection.
    pub async fn mark_online(&self, user_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET is_online = TRUE WHERE id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Called on disconnect. Returns the recorded last-seen timestamp for
    /// the offline broadcast.
    pub async fn mark_offline(&self, user_id: Uuid) -> Result<DateTime<Utc>, AppError> {
        let last_seen: Option<DateTime<Utc>> = sqlx::query_scalar(
            "UPDATE users SET is_online = FALSE, last_seen = NOW() WHERE id = $1 RETURNING last_seen",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        last_seen.ok_or(AppError::NotFound)
    }
}
