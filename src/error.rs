use crate::middleware::error_handling;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error_handling::into_response(self).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    /// No credential was presented at all.
    #[error("authentication required")]
    Unauthenticated,

    /// A credential was presented but failed verification (malformed,
    /// bad signature, or expired).
    #[error("invalid credential")]
    InvalidCredential,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal server error")]
    Internal,
}

impl AppError {
    /// Retryable means the client may resend the same request verbatim.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Database(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ),
            AppError::Internal => true,
            _ => false,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            AppError::BadRequest(_) => 400,
            AppError::Unauthenticated | AppError::InvalidCredential => 401,
            AppError::Forbidden => 403,
            AppError::NotFound => 404,
            AppError::Config(_)
            | AppError::StartServer(_)
            | AppError::Database(_)
            | AppError::Internal => 500,
        }
    }
}
