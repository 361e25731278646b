//! API error types and handling.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use auth::SignedUrlError;

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// API error type.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Invalid JSON: {0}")]
    JsonRejection(String),
}

impl ApiError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::JsonRejection(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Get the error code string.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::JsonRejection(_) => "INVALID_JSON",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::warn!(error = %rejection, "JSON parsing failed");
        ApiError::JsonRejection(rejection.body_text())
    }
}

impl From<fulfillment_core::Error> for ApiError {
    fn from(err: fulfillment_core::Error) -> Self {
        use fulfillment_core::Error;

        match err {
            Error::BadSignature => ApiError::Unauthorized(err.to_string()),
            Error::MalformedPayload(_) | Error::MissingField(_) => {
                ApiError::BadRequest(err.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<SignedUrlError> for ApiError {
    fn from(err: SignedUrlError) -> Self {
        match err {
            SignedUrlError::InvalidResource(_) => ApiError::BadRequest(err.to_string()),
            SignedUrlError::InvalidBase(_)
            | SignedUrlError::ExpiryOverflow
            | SignedUrlError::Signing(_) => {
                ApiError::Internal(err.to_string())
            }
            SignedUrlError::MissingParameter(_)
            | SignedUrlError::MalformedExpiry(_)
            | SignedUrlError::Expired { .. }
            | SignedUrlError::InvalidSignature => ApiError::Unauthorized(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Log 500 errors for debugging (these indicate bugs or infrastructure issues)
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(
                error_code = self.error_code(),
                error = %self,
                "Internal server error"
            );
        }

        let body = ErrorResponse::new(self.error_code(), self.to_string());

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fulfillment_error_mapping() {
        use fulfillment_core::Error;

        let cases = [
            (Error::BadSignature, StatusCode::UNAUTHORIZED),
            (Error::MalformedPayload("eof".into()), StatusCode::BAD_REQUEST),
            (Error::MissingField("customerEmail"), StatusCode::BAD_REQUEST),
            (
                Error::TemplateNotFound("templates/x.pdf".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                Error::TemplateLoad("no pages".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_signed_url_error_mapping() {
        assert_eq!(
            ApiError::from(SignedUrlError::Expired { expires_at_ms: 1 }).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(SignedUrlError::MissingParameter("signature")).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(SignedUrlError::InvalidResource("../x".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(SignedUrlError::ExpiryOverflow).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ApiError::NotFound("x".into()).error_code(), "NOT_FOUND");
        assert_eq!(ApiError::Unauthorized("x".into()).error_code(), "UNAUTHORIZED");
    }
}
