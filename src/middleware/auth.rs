use crate::error::AppError;
use crate::state::AppState;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub exp: i64,
}

/// Verified identity attached to a connection or request. Immutable after
/// authentication; handlers receive it by value.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

/// Validate an HS256 bearer token and extract the identity it asserts.
pub fn verify_token(secret: &str, token: &str) -> Result<AuthUser, AppError> {
    let validation = Validation::new(Algorithm::HS256);
    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| AppError::InvalidCredential)?;

    let id = Uuid::parse_str(&data.claims.sub).map_err(|_| AppError::InvalidCredential)?;
    Ok(AuthUser {
        id,
        username: data.claims.username,
    })
}

/// Pull a bearer token out of an Authorization header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AppError> {
    let header = header.ok_or(AppError::Unauthenticated)?;
    header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthenticated)
}

/// Middleware: verify the bearer token and stash the identity in request
/// extensions for the `AuthUser` extractor.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());
    let token = bearer_token(header)?;
    let user = verify_token(&state.config.jwt_secret, token)?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AppError::Unauthenticated)
    }
}
