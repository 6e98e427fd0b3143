//! Mapping of handler failures onto HTTP responses

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ValidationError;

/// Body of every error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing, mismatched or malformed request data
    #[error("{0}")]
    Validation(String),

    #[error("Item `{0}` not found")]
    ItemNotFound(String),

    #[error("Not Found")]
    RouteNotFound,

    /// Store failure; details are logged, never returned to the caller
    #[error("Internal server error")]
    Store(#[from] crate::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::ItemNotFound(_) | ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.0)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Store(err) => tracing::error!(error = %err, "Store operation failed"),
            ApiError::Validation(message) => tracing::warn!(%message, "Rejected request"),
            ApiError::ItemNotFound(id) => tracing::debug!(%id, "Item not found"),
            ApiError::RouteNotFound => {}
        }

        let body = ErrorResponse {
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
