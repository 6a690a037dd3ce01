use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Cross-cutting failures raised outside the cells. The scheduling
/// domain carries its own richer error type; this one covers the
/// shared middleware layer.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),
}

impl AppError {
    /// Stable machine-readable code so clients can branch on the
    /// failure kind instead of parsing messages.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "auth_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg),
        };

        tracing::error!("Error: {}: {}", status, message);

        let body = Json(json!({
            "error": message,
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}
