use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Public view of a user row. Credential fields never leave the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub is_private: bool,
    pub is_online: bool,
    pub last_seen: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Private users expose identity and presence but nothing personal.
    /// Applied on every path that hands a profile to another user.
    pub fn strip_private(mut self) -> Self {
        if self.is_private {
            self.bio = None;
        }
        self
    }
}
