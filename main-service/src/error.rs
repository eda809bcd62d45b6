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
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("database error")]
    Database(#[from] sqlx::Error),
}

impl AppError {
    pub fn not_found(entity: &str, id: i64) -> Self {
        AppError::NotFound(format!("{entity} with id={id} was not found"))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            // Unique-key races surface from sqlx; they are business conflicts
            // (duplicate email, category name, participation request).
            AppError::Database(err) => match err {
                sqlx::Error::Database(db) if db.is_unique_violation() => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

#[derive(Serialize)]
struct ApiError {
    status: String,
    reason: String,
    message: String,
    timestamp: String,
}

fn reason_for(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "Incorrectly made request.",
        StatusCode::NOT_FOUND => "The required object was not found.",
        StatusCode::CONFLICT => "Integrity constraint has been violated.",
        _ => "An unexpected error occurred.",
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::Database(err) => {
                if status == StatusCode::CONFLICT {
                    tracing::warn!(error = ?err, "unique constraint violated");
                    "A uniqueness constraint was violated.".to_string()
                } else {
                    tracing::error!(error = ?err, "database error");
                    "A database error occurred.".to_string()
                }
            }
            other => {
                tracing::warn!(status = %status, error = %other, "request rejected");
                other.to_string()
            }
        };

        let body = Json(ApiError {
            status: status.to_string(),
            reason: reason_for(status).to_string(),
            message,
            timestamp: datetime::format(&chrono::Utc::now().naive_utc()),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_variants_to_statuses() {
        assert_eq!(
            AppError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::not_found("event", 1).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Database(sqlx::Error::PoolClosed).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_message_carries_entity_and_id() {
        assert_eq!(
            AppError::not_found("category", 42).to_string(),
            "category with id=42 was not found"
        );
    }
}
