use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use afisha_stats_client::datetime;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("database error")]
    Database(#[from] sqlx::Error),
}

#[derive(Serialize)]
struct ApiError {
    status: String,
    reason: String,
    message: String,
    timestamp: String,
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::Database(err) => {
                tracing::error!(error = ?err, "database error");
                "A database error occurred.".to_string()
            }
            other => {
                tracing::warn!(error = %other, "request rejected");
                other.to_string()
            }
        };

        let reason = if status == StatusCode::BAD_REQUEST {
            "Incorrectly made request."
        } else {
            "An unexpected error occurred."
        };
        let body = Json(ApiError {
            status: status.to_string(),
            reason: reason.to_string(),
            message,
            timestamp: datetime::format(&chrono::Utc::now().naive_utc()),
        });

        (status, body).into_response()
    }
}
