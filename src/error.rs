use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failures that abort a feed refresh.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("No list named {0} found")]
    ListNotFound(String),

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ListNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        error!("Error generating feed: {}", self);

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
