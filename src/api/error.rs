//! Structured error responses for the REST surface.
//!
//! Every failed request is serialized as
//! `{ "error": { "type", "message", "code", "details" }, "request_id",
//! "timestamp" }` with the HTTP status implied by the error kind.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::MemoryError;

/// Error kinds surfaced at the REST boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Unauthorized,
    RateLimited,
    ServiceUnavailable,
    Storage,
    Internal,
}

impl ErrorKind {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::ServiceUnavailable | Self::Storage => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The `error.type` discriminator in response bodies.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Validation => "ValidationError",
            Self::Unauthorized => "Unauthorized",
            Self::RateLimited => "RateLimited",
            Self::ServiceUnavailable => "ServiceUnavailable",
            Self::Storage => "StorageError",
            Self::Internal => "InternalError",
        }
    }

    /// Machine-readable `error.code`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation => "validation_error",
            Self::Unauthorized => "unauthorized",
            Self::RateLimited => "rate_limited",
            Self::ServiceUnavailable => "service_unavailable",
            Self::Storage => "storage_error",
            Self::Internal => "internal_error",
        }
    }
}

/// An API-level error carrying everything needed to build the envelope.
#[derive(Debug)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub details: Option<serde_json::Value>,
    /// Seconds until the caller may retry; rendered as a `Retry-After` header.
    pub retry_after: Option<u64>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
            retry_after: None,
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(ErrorKind::Unauthorized, "Invalid or missing API key")
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        let mut err = Self::new(ErrorKind::RateLimited, "Rate limit exceeded");
        err.retry_after = Some(retry_after);
        err
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl From<MemoryError> for ApiError {
    fn from(err: MemoryError) -> Self {
        let kind = match &err {
            MemoryError::Validation(_) => ErrorKind::Validation,
            MemoryError::ServiceUnavailable(_) => ErrorKind::ServiceUnavailable,
            MemoryError::Storage(_) => ErrorKind::Storage,
            MemoryError::Internal(_) => ErrorKind::Internal,
        };
        Self::new(kind, err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    error_type: &'static str,
    message: String,
    code: &'static str,
    details: serde_json::Value,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
    request_id: String,
    timestamp: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::new_v4().to_string();
        let status = self.kind.status_code();

        if status.is_server_error() {
            tracing::error!(request_id = %request_id, message = %self.message, "request failed");
        } else {
            tracing::debug!(request_id = %request_id, message = %self.message, "request rejected");
        }

        let envelope = ErrorEnvelope {
            error: ErrorBody {
                error_type: self.kind.type_name(),
                message: self.message,
                code: self.kind.code(),
                details: self.details.unwrap_or_else(|| serde_json::json!({})),
            },
            request_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let mut response = (status, Json(envelope)).into_response();
        if let Some(secs) = self.retry_after {
            response.headers_mut().insert(
                axum::http::header::RETRY_AFTER,
                HeaderValue::from_str(&secs.to_string())
                    .unwrap_or_else(|_| HeaderValue::from_static("60")),
            );
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_errors_map_to_expected_statuses() {
        let cases = [
            (MemoryError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (
                MemoryError::ServiceUnavailable("down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                MemoryError::Storage(rusqlite::Error::QueryReturnedNoRows),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                MemoryError::Internal("oops".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).kind.status_code(), status);
        }
    }

    #[test]
    fn validation_kind_uses_stable_names() {
        let err = ApiError::from(MemoryError::Validation("bad".into()));
        assert_eq!(err.kind.type_name(), "ValidationError");
        assert_eq!(err.kind.code(), "validation_error");
    }

    #[test]
    fn rate_limited_carries_retry_after() {
        let err = ApiError::rate_limited(30);
        assert_eq!(err.retry_after, Some(30));
        assert_eq!(err.kind.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }
}
