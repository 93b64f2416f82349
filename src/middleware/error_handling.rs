use crate::error::AppError;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    pub status: u16,
}

pub fn map_error(err: &AppError) -> (StatusCode, ErrorBody) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let error = match err {
        AppError::BadRequest(_) => "bad_request",
        AppError::Unauthenticated | AppError::InvalidCredential => "unauthorized",
        AppError::Forbidden => "forbidden",
        AppError::NotFound => "not_found",
        AppError::Database(_) => "database_error",
        AppError::Config(_) | AppError::StartServer(_) | AppError::Internal => "server_error",
    };

    // Internal error details stay in the logs, not in the response body.
    let message = if status.is_server_error() {
        "internal server error".to_string()
    } else {
        err.to_string()
    };

    (status, ErrorBody {
        error,
        message,
        status: status.as_u16(),
    })
}

pub fn into_response(err: AppError) -> impl IntoResponse {
    if err.status_code() >= 500 {
        tracing::error!(error = %err, "request failed");
    }
    let (status, body) = map_error(&err);
    (status, Json(body))
}
