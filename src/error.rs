use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::TrainingLogStatus;
use crate::services::training_log_store::StoreError;

#[derive(Error, Debug)]
pub enum TrainingLogError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Training log is {status}, expected in-progress")]
    InvalidState { status: TrainingLogStatus },
    #[error("Set {set_index} of exercise {exercise_id} is already completed")]
    AlreadyCompleted { exercise_id: Uuid, set_index: usize },
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl TrainingLogError {
    pub fn not_found(what: &str) -> Self {
        TrainingLogError::NotFound(what.to_string())
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            TrainingLogError::InvalidInput(_) => "invalid_input",
            TrainingLogError::NotFound(_) => "not_found",
            TrainingLogError::InvalidState { .. } => "invalid_state",
            TrainingLogError::AlreadyCompleted { .. } => "already_completed",
            TrainingLogError::Storage(_) | TrainingLogError::Internal(_) => "internal_error",
        }
    }
}

// Extractor rejections are reported like any other invalid input
impl From<PathRejection> for TrainingLogError {
    fn from(rejection: PathRejection) -> Self {
        TrainingLogError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for TrainingLogError {
    fn from(rejection: QueryRejection) -> Self {
        TrainingLogError::InvalidInput(rejection.body_text())
    }
}

impl From<JsonRejection> for TrainingLogError {
    fn from(rejection: JsonRejection) -> Self {
        TrainingLogError::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for TrainingLogError {
    fn into_response(self) -> Response {
        let status = match &self {
            TrainingLogError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            TrainingLogError::NotFound(_) => StatusCode::NOT_FOUND,
            TrainingLogError::InvalidState { .. } => StatusCode::CONFLICT,
            TrainingLogError::AlreadyCompleted { .. } => StatusCode::CONFLICT,
            TrainingLogError::Storage(_) | TrainingLogError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // Collaborator failures are logged here and never echoed to the client
        let message = match &self {
            TrainingLogError::Storage(e) => {
                tracing::error!(error = %e, "training log storage failure");
                "Internal server error".to_string()
            }
            TrainingLogError::Internal(e) => {
                tracing::error!(error = %e, "training log internal failure");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": self.error_code(),
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T, E = TrainingLogError> = std::result::Result<T, E>;
