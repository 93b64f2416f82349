use crate::error::AppError;
use crate::models::UserProfile;
use sqlx::PgPool;
use uuid::Uuid;

const PROFILE_COLUMNS: &str =
    "id, username, avatar_url, bio, is_private, is_online, last_seen";

#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub is_private: Option<bool>,
}

/// Lookup/update interface over the user record. The core does not own the
/// registration flow; it only reads profiles and applies profile edits that
/// must be re-broadcast to connected clients.
#[derive(Clone)]
pub struct ProfileService {
    db: PgPool,
}

impl ProfileService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn get(&self, user_id: Uuid) -> Result<UserProfile, AppError> {
        sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::NotFound)
    }

    /// Read-receipt suppression hinges on this flag.
    pub async fn is_private(&self, user_id: Uuid) -> Result<bool, AppError> {
        let flag: Option<bool> = sqlx::query_scalar("SELECT is_private FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;
        flag.ok_or(AppError::NotFound)
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        changes: ProfileChanges,
    ) -> Result<UserProfile, AppError> {
        sqlx::query_as::<_, UserProfile>(&format!(
            "UPDATE users SET \
                bio = COALESCE($2, bio), \
                avatar_url = COALESCE($3, avatar_url), \
                is_private = COALESCE($4, is_private) \
             WHERE id = $1 \
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(changes.bio)
        .bind(changes.avatar_url)
        .bind(changes.is_private)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::NotFound)
    }
}
