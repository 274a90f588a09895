use std::path::PathBuf;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use detect_common::CommonError;
use serde_json::json;
use thiserror::Error;
use yolo::YoloError;

/// Errors a handler can return; each maps to a JSON `{"error": ...}` body
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Detection ran but output image not found.")]
    MissingOutput { expected: PathBuf, hint: String },

    #[error("{0}")]
    Internal(String),
}

impl From<YoloError> for AppError {
    fn from(err: YoloError) -> Self {
        match err {
            YoloError::MissingOutput { expected, hint } => Self::MissingOutput { expected, hint },
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<CommonError> for AppError {
    fn from(err: CommonError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("Detection task failed: {}", err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            Self::MissingOutput { expected, hint } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": self.to_string(),
                    "expected": expected.display().to_string(),
                    "hint": hint,
                }),
            ),
            Self::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": message }))
            }
        };

        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }

        (status, Json(body)).into_response()
    }
}

/// Failures while building the application state
#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] CommonError),
    #[error(transparent)]
    Yolo(#[from] YoloError),
    #[error("Cannot prepare data directory: {0}")]
    Io(#[from] std::io::Error),
}
