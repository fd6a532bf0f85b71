//! API error types and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use procwarden_daemon::DaemonError;
use thiserror::Error;
use tracing::error;

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Unknown daemon key.
    #[error("not found")]
    NotFound,

    /// Malformed input or a state conflict.
    #[error("{0}")]
    BadRequest(String),

    /// Infrastructure failure. The detail is logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the response body.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::NotFound => "not found".to_string(),
            ApiError::BadRequest(message) => message.clone(),
            ApiError::Internal(_) => "internal error".to_string(),
        }
    }
}

impl From<DaemonError> for ApiError {
    fn from(e: DaemonError) -> Self {
        match e {
            DaemonError::NotFound(_) => ApiError::NotFound,
            DaemonError::KeyNotUnique(_) => ApiError::BadRequest("key already exists".to_string()),
            DaemonError::AlreadyStarted(_) => ApiError::BadRequest("already started".to_string()),
            DaemonError::NotStarted(_) => ApiError::BadRequest("not started".to_string()),
            DaemonError::InvalidDefinition(reason) => ApiError::BadRequest(reason),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            error!("Request failed: {}", detail);
        }
        let body = Json(serde_json::json!({ "error": self.public_message() }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daemon_error_mapping() {
        let cases = [
            (DaemonError::NotFound("web".into()), StatusCode::NOT_FOUND, "not found"),
            (
                DaemonError::KeyNotUnique("web".into()),
                StatusCode::BAD_REQUEST,
                "key already exists",
            ),
            (
                DaemonError::AlreadyStarted("web".into()),
                StatusCode::BAD_REQUEST,
                "already started",
            ),
            (
                DaemonError::NotStarted("web".into()),
                StatusCode::BAD_REQUEST,
                "not started",
            ),
            (
                DaemonError::Storage("disk full".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error",
            ),
            (
                DaemonError::Signal {
                    pid: 42,
                    reason: "gone".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error",
            ),
        ];

        for (daemon_error, status, message) in cases {
            let err = ApiError::from(daemon_error);
            assert_eq!(err.status(), status);
            assert_eq!(err.public_message(), message);
        }
    }

    #[test]
    fn test_invalid_definition_keeps_reason() {
        let err = ApiError::from(DaemonError::InvalidDefinition("key too long".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "key too long");
    }

    #[test]
    fn test_internal_detail_not_exposed() {
        let err = ApiError::from(DaemonError::Spawn {
            command: "/bin/secret".into(),
            reason: "permission denied".into(),
        });
        assert!(err.to_string().contains("/bin/secret"));
        assert!(!err.public_message().contains("secret"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
