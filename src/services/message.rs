use crate::error::AppError;
use crate::models::message::{display_content, MessageRecord, ReplySnippet, DELETED_PLACEHOLDER};
use chrono::{DateTime, SubsecRound, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Persists messages and formats them for the boundary. Message creation and
/// the conversation recency bump are one transaction; the sidebar never sees
/// a conversation marked active without its message, or the reverse.
#[derive(Clone)]
pub struct MessageService {
    db: PgPool,
}

impl MessageService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create_message(
        &self,
        author_id: Uuid,
        conversation_id: Uuid,
        content: &str,
        reply_to_id: Option<Uuid>,
    ) -> Result<MessageRecord, AppError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::BadRequest("message content cannot be empty".into()));
        }

        let conversation = sqlx::query(
            "SELECT user_a, user_b FROM conversations WHERE id = $1",
        )
        .bind(conversation_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::NotFound)?;
        let user_a: Uuid = conversation.get("user_a");
        let user_b: Uuid = conversation.get("user_b");
        if author_id != user_a && author_id != user_b {
            return Err(AppError::Forbidden);
        }

        let author = sqlx::query("SELECT username, avatar_url FROM users WHERE id = $1")
            .bind(author_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        let username: String = author.get("username");
        let avatar_url: Option<String> = author.get("avatar_url");

        // Resolve the reply target before writing; the snippet ships with
        // the response and a dangling/foreign target must fail the send.
        let reply_to = match reply_to_id {
            Some(target) => Some(self.reply_snippet(target, conversation_id).await?),
            None => None,
        };

        let id = Uuid::new_v4();
        // Truncate to microseconds: the timestamp must read back from
        // TIMESTAMPTZ exactly equal to what the record carries.
        let now = Utc::now().trunc_subsecs(6);

        let mut tx = self.db.begin().await?;
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, author_id, content, reply_to_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(conversation_id)
        .bind(author_id)
        .bind(content)
        .bind(reply_to_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        // Recency marker takes the message timestamp exactly.
        sqlx::query("UPDATE conversations SET updated_at = $2 WHERE id = $1")
            .bind(conversation_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(MessageRecord {
            id,
            conversation_id,
            author_id,
            username,
            avatar_url,
            content: content.to_string(),
            is_deleted: false,
            is_read: false,
            timestamp: now,
            reply_to,
        })
    }

    /// Soft delete: flag the row and overwrite the stored content with the
    /// placeholder. Only the author may delete; repeating the call is a
    /// no-op on content.
    pub async fn delete_message(
        &self,
        requester_id: Uuid,
        message_id: Uuid,
    ) -> Result<MessageRecord, AppError> {
        let row = sqlx::query("SELECT author_id FROM messages WHERE id = $1")
            .bind(message_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        let author_id: Uuid = row.get("author_id");
        if author_id != requester_id {
            return Err(AppError::Forbidden);
        }

        sqlx::query("UPDATE messages SET is_deleted = TRUE, content = $2 WHERE id = $1")
            .bind(message_id)
            .bind(DELETED_PLACEHOLDER)
            .execute(&self.db)
            .await?;

        self.fetch_record(message_id).await?.ok_or(AppError::NotFound)
    }

    /// Conversation backlog, oldest first, reply context resolved.
    pub async fn history(
        &self,
        conversation_id: Uuid,
        limit: i64,
    ) -> Result<Vec<MessageRecord>, AppError> {
        let rows = sqlx::query(&format!("{RECORD_SELECT} WHERE m.conversation_id = $1 ORDER BY m.created_at ASC LIMIT $2"))
            .bind(conversation_id)
            .bind(limit)
            .fetch_all(&self.db)
            .await?;
        Ok(rows.iter().map(record_from_row).collect())
    }

    pub async fn fetch_record(&self, message_id: Uuid) -> Result<Option<MessageRecord>, AppError> {
        let row = sqlx::query(&format!("{RECORD_SELECT} WHERE m.id = $1"))
            .bind(message_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.as_ref().map(record_from_row))
    }

    async fn reply_snippet(
        &self,
        target_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<ReplySnippet, AppError> {
        let row = sqlx::query(
            "SELECT m.id, m.content, m.is_deleted, u.username \
             FROM messages m JOIN users u ON u.id = m.author_id \
             WHERE m.id = $1 AND m.conversation_id = $2",
        )
        .bind(target_id)
        .bind(conversation_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::BadRequest("reply target is not in this conversation".into()))?;

        let content: String = row.get("content");
        let is_deleted: bool = row.get("is_deleted");
        Ok(ReplySnippet {
            id: row.get("id"),
            username: row.get("username"),
            content: display_content(&content, is_deleted),
        })
    }
}

const RECORD_SELECT: &str = "SELECT m.id, m.conversation_id, m.author_id, m.content, m.is_deleted, m.is_read, m.created_at, \
            u.username, u.avatar_url, \
            r.id AS reply_id, r.content AS reply_content, r.is_deleted AS reply_deleted, \
            ru.username AS reply_username \
     FROM messages m \
     JOIN users u ON u.id = m.author_id \
     LEFT JOIN messages r ON r.id = m.reply_to_id \
     LEFT JOIN users ru ON ru.id = r.author_id";

fn record_from_row(row: &PgRow) -> MessageRecord {
    let content: String = row.get("content");
    let is_deleted: bool = row.get("is_deleted");
    let created_at: DateTime<Utc> = row.get("created_at");

    let reply_to = row
        .get::<Option<Uuid>, _>("reply_id")
        .map(|reply_id| {
            let reply_content: String = row.get::<Option<String>, _>("reply_content").unwrap_or_default();
            let reply_deleted: bool = row.get::<Option<bool>, _>("reply_deleted").unwrap_or(false);
            let reply_username: String =
                row.get::<Option<String>, _>("reply_username").unwrap_or_default();
            ReplySnippet {
                id: reply_id,
                username: reply_username,
                content: display_content(&reply_content, reply_deleted),
            }
        });

    MessageRecord {
        id: row.get("id"),
        conversation_id: row.get("conversation_id"),
        author_id: row.get("author_id"),
        username: row.get("username"),
        avatar_url: row.get("avatar_url"),
        content: display_content(&content, is_deleted),
        is_deleted,
        is_read: row.get("is_read"),
        timestamp: created_at,
        reply_to,
    }
}
