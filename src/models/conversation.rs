use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A two-party conversation. The pair is stored normalized (user_a < user_b)
/// so that {A,B} and {B,A} map to the same row.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub user_a: Uuid,
    pub user_b: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn other_participant(&self, user_id: Uuid) -> Uuid {
        if self.user_a == user_id {
            self.user_b
        } else {
            self.user_a
        }
    }

    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.user_a == user_id || self.user_b == user_id
    }
}

/// Sort a pair of user ids into storage order.
pub fn normalize_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}
