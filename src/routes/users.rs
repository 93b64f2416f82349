use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::UserProfile;
use crate::services::profile::ProfileChanges;
use crate::services::sidebar::SidebarEntry;
use crate::state::AppState;
use crate::websocket::events::ServerEvent;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct SidebarResponse {
    pub users: Vec<SidebarEntry>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub users: Vec<UserProfile>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub is_private: Option<bool>,
}

/// The sidebar feed: active conversations ranked by recency, or starter
/// suggestions for a user with no conversations yet.
pub async fn get_sidebar(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<SidebarResponse>, AppError> {
    let users = state.sidebar.feed(user.id).await?;
    Ok(Json(SidebarResponse { users }))
}

pub async fn search_users(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    let users = state.sidebar.search(&params.q, user.id).await?;
    Ok(Json(SearchResponse { users }))
}

/// Profile edits land over REST but must reach connected clients
/// immediately, so the update is followed by a broadcast.
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfile>, AppError> {
    let updated = state
        .profiles
        .update(
            user.id,
            ProfileChanges {
                bio: body.bio,
                avatar_url: body.avatar_url,
                is_private: body.is_private,
            },
        )
        .await?;

    state
        .router
        .broadcast_all(&ServerEvent::UserUpdate {
            user_id: updated.id,
            username: updated.username.clone(),
            avatar_url: updated.avatar_url.clone(),
            is_private: updated.is_private,
            // A user who just went private stops exposing their bio.
            bio: if updated.is_private {
                None
            } else {
                updated.bio.clone()
            },
        })
        .await;

    Ok(Json(updated))
}
