//! HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request body or parameters.
    #[error("{0}")]
    Validation(String),

    #[error("Task not found")]
    TaskNotFound(String),

    #[error("File not found")]
    FileNotFound,

    #[error("Failed to start analysis")]
    Submit(String),

    #[error("Internal server error")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::TaskNotFound(_) | ApiError::FileNotFound => StatusCode::NOT_FOUND,
            ApiError::Submit(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Submit(m) | ApiError::Internal(m) => Some(m),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}: {}", self, self.detail().unwrap_or(""));
        }
        let body = ErrorBody { error: self.to_string(), message: self.detail() };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::TaskNotFound("t".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::FileNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Submit("boom".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_body_shape() {
        let err = ApiError::Submit("worker pool closed".into());
        let body = ErrorBody { error: err.to_string(), message: err.detail() };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], "Failed to start analysis");
        assert_eq!(json["message"], "worker pool closed");

        let err = ApiError::TaskNotFound("abc".into());
        let body = ErrorBody { error: err.to_string(), message: err.detail() };
        assert_eq!(serde_json::to_value(&body).unwrap(), serde_json::json!({"error": "Task not found"}));
    }
}
