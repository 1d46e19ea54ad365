//! Error types for the server

use crate::error::ExoError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Classification(#[from] ExoError),
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServerError::Internal(format!("worker task failed: {}", err))
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred".to_string())
            }
            ServerError::Classification(e) => classification_status(e),
        };

        let body = Json(json!({
            "error": true,
            "message": message,
        }));

        (status, body).into_response()
    }
}

fn classification_status(err: &ExoError) -> (StatusCode, String) {
    let status = match err {
        ExoError::UnknownMission(_) | ExoError::DataExhausted(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ExoError::ModelUnavailable(_) => StatusCode::NOT_FOUND,
        ExoError::SchemaMismatch { .. }
        | ExoError::DataError(_)
        | ExoError::FeatureNotFound(_)
        | ExoError::InvalidInput(_)
        | ExoError::ShapeError { .. }
        | ExoError::SerializationError(_) => StatusCode::BAD_REQUEST,
        ExoError::ExplanationError(_) => StatusCode::BAD_GATEWAY,
        ExoError::InferenceError(_) | ExoError::ConfigError(_) | ExoError::IoError(_) => {
            tracing::error!(detail = %err, "Classification failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Classification failed. Check server logs for details.".to_string(),
            );
        }
    };
    (status, err.to_string())
}

pub type Result<T> = std::result::Result<T, ServerError>;
