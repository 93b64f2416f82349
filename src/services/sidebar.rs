use crate::error::AppError;
use crate::models::message::DELETED_PLACEHOLDER;
use crate::models::UserProfile;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub const SUGGESTION_LIMIT: i64 = 10;
pub const SEARCH_LIMIT: i64 = 20;

/// One sidebar row: the other participant annotated with conversation
/// recency, preview, and the requester's unread count.
#[derive(Debug, Clone, Serialize)]
pub struct SidebarEntry {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub is_private: bool,
    pub is_online: bool,
    pub last_seen: Option<DateTime<Utc>>,
    pub conversation_id: Option<Uuid>,
    pub last_message: Option<String>,
    pub last_activity: Option<DateTime<Utc>>,
    pub unread_count: i64,
}

impl SidebarEntry {
    fn strip_private(mut self) -> Self {
        if self.is_private {
            self.bio = None;
        }
        self
    }
}

/// Preview rules, in priority order: deleted, own, raw.
pub fn preview(viewer: Uuid, author: Uuid, content: &str, is_deleted: bool) -> String {
    if is_deleted {
        DELETED_PLACEHOLDER.to_string()
    } else if author == viewer {
        format!("You: {content}")
    } else {
        content.to_string()
    }
}

// One conversation-centric query: the other participant plus two LATERAL
// probes (latest message, unread count). No per-row follow-up queries.
const FEED_SQL: &str = "\
    SELECT c.id          AS conversation_id, \
           c.updated_at  AS last_activity, \
           u.id          AS user_id, \
           u.username, u.avatar_url, u.bio, u.is_private, u.is_online, u.last_seen, \
           lm.content    AS last_content, \
           lm.is_deleted AS last_deleted, \
           lm.author_id  AS last_author_id, \
           un.unread     AS unread_count \
    FROM conversations c \
    JOIN users u ON u.id = CASE WHEN c.user_a = $1 THEN c.user_b ELSE c.user_a END \
    LEFT JOIN LATERAL ( \
        SELECT m.content, m.is_deleted, m.author_id \
        FROM messages m \
        WHERE m.conversation_id = c.id \
        ORDER BY m.created_at DESC \
        LIMIT 1 \
    ) lm ON TRUE \
    LEFT JOIN LATERAL ( \
        SELECT COUNT(*) AS unread \
        FROM messages m \
        WHERE m.conversation_id = c.id AND m.author_id <> $1 AND m.is_read = FALSE \
    ) un ON TRUE \
    WHERE c.user_a = $1 OR c.user_b = $1 \
    ORDER BY c.updated_at DESC";

/// Builds the ranked conversation list for the sidebar, with a cold-start
/// fallback of conversation-starter suggestions.
#[derive(Clone)]
pub struct SidebarService {
    db: PgPool,
}

impl SidebarService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn feed(&self, user_id: Uuid) -> Result<Vec<SidebarEntry>, AppError> {
        let rows = sqlx::query(FEED_SQL)
            .bind(user_id)
            .fetch_all(&self.db)
            .await?;

        if rows.is_empty() {
            return self.suggestions(user_id).await;
        }

        let entries = rows
            .iter()
            .map(|row| {
                let last_content: Option<String> = row.get("last_content");
                let last_deleted: Option<bool> = row.get("last_deleted");
                let last_author: Option<Uuid> = row.get("last_author_id");
                let last_message = last_content.map(|content| {
                    preview(
                        user_id,
                        last_author.unwrap_or(user_id),
                        &content,
                        last_deleted.unwrap_or(false),
                    )
                });

                SidebarEntry {
                    id: row.get("user_id"),
                    username: row.get("username"),
                    avatar_url: row.get("avatar_url"),
                    bio: row.get("bio"),
                    is_private: row.get("is_private"),
                    is_online: row.get("is_online"),
                    last_seen: row.get("last_seen"),
                    conversation_id: Some(row.get("conversation_id")),
                    last_message,
                    last_activity: Some(row.get("last_activity")),
                    unread_count: row.get("unread_count"),
                }
                .strip_private()
            })
            .collect();
        Ok(entries)
    }

    /// Cold start: no conversations yet, offer a bounded sample of other
    /// users to start one with.
    async fn suggestions(&self, user_id: Uuid) -> Result<Vec<SidebarEntry>, AppError> {
        let profiles = sqlx::query_as::<_, UserProfile>(
            "SELECT id, username, avatar_url, bio, is_private, is_online, last_seen \
             FROM users WHERE id <> $1 ORDER BY username ASC LIMIT $2",
        )
        .bind(user_id)
        .bind(SUGGESTION_LIMIT)
        .fetch_all(&self.db)
        .await?;

        Ok(profiles
            .into_iter()
            .map(|profile| {
                let profile = profile.strip_private();
                SidebarEntry {
                    id: profile.id,
                    username: profile.username,
                    avatar_url: profile.avatar_url,
                    bio: profile.bio,
                    is_private: profile.is_private,
                    is_online: profile.is_online,
                    last_seen: profile.last_seen,
                    conversation_id: None,
                    last_message: None,
                    last_activity: None,
                    unread_count: 0,
                }
            })
            .collect())
    }

    /// Username substring search, excluding the requester, privacy-stripped.
    pub async fn search(&self, query: &str, user_id: Uuid) -> Result<Vec<UserProfile>, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let pattern = format!(
            "%{}%",
            query
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_")
        );
        let profiles = sqlx::query_as::<_, UserProfile>(
            "SELECT id, username, avatar_url, bio, is_private, is_online, last_seen \
             FROM users WHERE id <> $1 AND username ILIKE $2 ORDER BY username ASC LIMIT $3",
        )
        .bind(user_id)
        .bind(pattern)
        .bind(SEARCH_LIMIT)
        .fetch_all(&self.db)
        .await?;

        Ok(profiles.into_iter().map(UserProfile::strip_private).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deleted_preview_wins_over_ownership() {
        let me = Uuid::new_v4();
        assert_eq!(preview(me, me, "secret", true), DELETED_PLACEHOLDER);
    }

    #[test]
    fn own_message_gets_you_prefix() {
        let me = Uuid::new_v4();
        assert_eq!(preview(me, me, "on my way", false), "You: on my way");
    }

    #[test]
    fn other_message_is_raw() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        assert_eq!(preview(me, other, "hello", false), "hello");
    }

    #[test]
    fn private_entry_loses_bio_but_keeps_presence() {
        let entry = SidebarEntry {
            id: Uuid::new_v4(),
            username: "ada".into(),
            avatar_url: Some("a.png".into()),
            bio: Some("secret bio".into()),
            is_private: true,
            is_online: true,
            last_seen: None,
            conversation_id: None,
            last_message: None,
            last_activity: None,
            unread_count: 3,
        }
        .strip_private();
        assert_eq!(entry.bio, None);
        assert!(entry.is_online);
        assert_eq!(entry.unread_count, 3);
    }
}
