use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Reasons a request is rejected before it reaches a training log handler.
/// All of them answer 401.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Missing authorization header")]
    MissingAuthHeader,
    #[error("Invalid authorization header format")]
    InvalidAuthHeaderFormat,
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl AuthError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::TokenExpired => "token_expired",
            AuthError::MissingAuthHeader | AuthError::InvalidAuthHeaderFormat => "missing_credentials",
            AuthError::InvalidToken | AuthError::Jwt(_) => "invalid_token",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::Jwt(e) = &self {
            tracing::warn!(error = %e, "failed to issue or read access token");
        }

        let body = Json(json!({
            "error": self.error_code(),
            "message": self.to_string(),
        }));

        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}
