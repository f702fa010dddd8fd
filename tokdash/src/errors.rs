use crate::db::errors::DbError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use utoipa::ToSchema;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Query parameters failed validation
    #[error("Invalid query parameters: {}", summarize(details))]
    Validation { details: Vec<FieldError> },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Usage source failure
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// One invalid field of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    /// Path to the field, e.g. `["from"]`
    pub path: Vec<String>,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            path: vec![field.to_string()],
            message: message.into(),
        }
    }
}

fn summarize(details: &[FieldError]) -> String {
    details
        .iter()
        .map(|detail| format!("{}: {}", detail.path.join("."), detail.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// JSON error body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::Internal { .. } | Error::Database(_) | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation { .. } => "Invalid query parameters".to_string(),
            Error::Database(_) => "Failed to fetch dashboard data".to_string(),
            Error::Internal { .. } | Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::SchemaMismatch { .. }) => {
                tracing::error!("Usage data did not match the expected shape: {:#}", self);
            }
            Error::Database(_) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Validation { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        let body = ErrorBody {
            error: self.user_message(),
            details: match self {
                Error::Validation { details } => Some(details),
                _ => None,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(error: Error) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_error_body() {
        let (status, body) = body_of(Error::Validation {
            details: vec![FieldError::new("from", "Invalid date")],
        })
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            serde_json::json!({
                "error": "Invalid query parameters",
                "details": [{"path": ["from"], "message": "Invalid date"}]
            })
        );
    }

    #[tokio::test]
    async fn test_database_error_is_generic() {
        let (status, body) = body_of(Error::Database(DbError::Other(anyhow::anyhow!("password authentication failed")))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, serde_json::json!({"error": "Failed to fetch dashboard data"}));
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_generic() {
        let error = Error::Database(DbError::SchemaMismatch {
            column: "tokens".to_string(),
            message: "negative sum".to_string(),
        });
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let (_, body) = body_of(error).await;
        assert!(body.get("details").is_none());
    }

    #[test]
    fn test_validation_display_lists_fields() {
        let error = Error::Validation {
            details: vec![FieldError::new("range", "bad"), FieldError::new("to", "Invalid date")],
        };
        assert_eq!(error.to_string(), "Invalid query parameters: range: bad; to: Invalid date");
    }
}
