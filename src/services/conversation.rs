use crate::error::AppError;
use crate::models::conversation::{normalize_pair, Conversation};
use sqlx::PgPool;
use uuid::Uuid;

/// Resolves the unique two-party conversation for a pair of users.
#[derive(Clone)]
pub struct ConversationService {
    db: PgPool,
}

impl ConversationService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Look up the conversation for {a, b}, creating it on first contact.
    ///
    /// The pair is normalized before lookup, so the argument order never
    /// matters. Two racing creates are serialized by the unique constraint
    /// on the pair: the loser's insert returns no row and re-fetches the
    /// winner's.
    pub async fn resolve_or_create(&self, a: Uuid, b: Uuid) -> Result<Conversation, AppError> {
        if a == b {
            return Err(AppError::BadRequest(
                "cannot start a conversation with yourself".into(),
            ));
        }
        let (lo, hi) = normalize_pair(a, b);

        if let Some(existing) = self.find_by_pair(lo, hi).await? {
            return Ok(existing);
        }

        let inserted = sqlx::query_as::<_, Conversation>(
            "INSERT INTO conversations (id, user_a, user_b) VALUES ($1, $2, $3) \
             ON CONFLICT (user_a, user_b) DO NOTHING \
             RETURNING id, user_a, user_b, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(lo)
        .bind(hi)
        .fetch_optional(&self.db)
        .await?;

        match inserted {
            Some(conversation) => {
                tracing::info!(conversation_id = %conversation.id, "conversation created");
                Ok(conversation)
            }
            // Lost the race; the winner's row exists now.
            None => self.find_by_pair(lo, hi).await?.ok_or(AppError::Internal),
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Conversation, AppError> {
        sqlx::query_as::<_, Conversation>(
            "SELECT id, user_a, user_b, created_at, updated_at FROM conversations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::NotFound)
    }

    pub async fn is_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, AppError> {
        let row = sqlx::query(
            "SELECT 1 FROM conversations WHERE id = $1 AND (user_a = $2 OR user_b = $2) LIMIT 1",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.is_some())
    }

    async fn find_by_pair(&self, lo: Uuid, hi: Uuid) -> Result<Option<Conversation>, AppError> {
        let row = sqlx::query_as::<_, Conversation>(
            "SELECT id, user_a, user_b, created_at, updated_at FROM conversations \
             WHERE user_a = $1 AND user_b = $2",
        )
        .bind(lo)
        .bind(hi)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }
}
