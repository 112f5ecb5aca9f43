use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::report::RenderError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("committeeType is required")]
    MissingCommitteeType,

    #[error("Not authorized")]
    Unauthorized,

    #[error("Store error: {0:#}")]
    Store(#[from] anyhow::Error),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Render task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::MissingCommitteeType => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Store(_) | AppError::Render(_) | AppError::Task(_) => {
                error!("Error generating report: {self}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to generate report".to_string(),
                )
            }
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}
