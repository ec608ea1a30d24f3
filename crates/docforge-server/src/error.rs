//! Error-to-envelope mapping
//!
//! Every failure leaves the process as the uniform JSON envelope; nothing
//! answers with a bare message or a stack trace.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use docforge_artifact::ArtifactError;
use docforge_auth::AuthError;
use docforge_core::ServiceResponse;
use docforge_database_tools::NotionError;
use docforge_mail::MailError;
use docforge_web_tools::WebToolError;

#[derive(Debug)]
pub enum AppError {
    /// Malformed or missing request fields; message carries the
    /// `[Validation Error]` marker, hint is a user-facing pointer.
    Validation {
        message: String,
        hint: Option<String>,
    },

    /// Token missing, mis-signed, or expired.
    Auth(AuthError),

    /// Resolved path escapes the store root.
    Forbidden(String),

    /// Requested artifact absent (expired, swept, or never existed).
    NotFound(String),

    /// Rendering or storing a generated document failed.
    Generation { detail: String, apology: String },

    /// An outbound integration failed; the upstream message stays intact.
    Upstream(String),

    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: format!("[Validation Error] {}", message.into()),
            hint: None,
        }
    }

    pub fn validation_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        AppError::Validation {
            message: format!("[Validation Error] {}", message.into()),
            hint: Some(hint.into()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Encoding(detail) => AppError::Internal(detail),
            other => AppError::Auth(other),
        }
    }
}

impl From<ArtifactError> for AppError {
    fn from(error: ArtifactError) -> Self {
        match error {
            ArtifactError::NotFound(_) => AppError::NotFound("File not found".to_string()),
            ArtifactError::PathTraversal(_) => AppError::Forbidden("Access denied".to_string()),
            ArtifactError::Io(io) => AppError::Internal(io.to_string()),
        }
    }
}

impl From<WebToolError> for AppError {
    fn from(error: WebToolError) -> Self {
        match error {
            WebToolError::InvalidInput(detail) => AppError::validation(detail),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl From<NotionError> for AppError {
    fn from(error: NotionError) -> Self {
        match error {
            NotionError::InvalidInput(detail) => AppError::validation(detail),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl From<MailError> for AppError {
    fn from(error: MailError) -> Self {
        match error {
            MailError::InvalidRequest(detail) => AppError::validation(detail),
            MailError::Smtp(detail) => AppError::Upstream(detail),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, payload): (StatusCode, String, Option<Value>) = match self {
            AppError::Validation { message, hint } => (
                StatusCode::BAD_REQUEST,
                message,
                hint.map(Value::String),
            ),
            AppError::Auth(error) => (StatusCode::UNAUTHORIZED, error.to_string(), None),
            AppError::Forbidden(message) => (StatusCode::FORBIDDEN, message, None),
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message, None),
            AppError::Generation { detail, apology } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error {detail}"),
                Some(Value::String(apology)),
            ),
            AppError::Upstream(detail) => {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Error {detail}"), None)
            }
            AppError::Internal(detail) => {
                tracing::error!(%detail, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, detail, None)
            }
        };

        let envelope = match payload {
            Some(payload) => {
                ServiceResponse::<Value>::failure_with(message, payload, status.as_u16())
            }
            None => ServiceResponse::<Value>::failure(message, status.as_u16()),
        };

        (status, Json(envelope)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_carries_marker() {
        let error = AppError::validation("Sheets data is required!");
        match error {
            AppError::Validation { message, hint } => {
                assert_eq!(message, "[Validation Error] Sheets data is required!");
                assert!(hint.is_none());
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_artifact_errors_map_to_statuses() {
        let not_found: AppError = ArtifactError::NotFound("x".to_string()).into();
        assert!(matches!(not_found, AppError::NotFound(_)));

        let traversal: AppError = ArtifactError::PathTraversal("x".to_string()).into();
        assert!(matches!(traversal, AppError::Forbidden(_)));
    }

    #[test]
    fn test_auth_error_messages_stay_distinct() {
        let expired: AppError = AuthError::Expired.into();
        let invalid: AppError = AuthError::Invalid.into();
        match (expired, invalid) {
            (AppError::Auth(a), AppError::Auth(b)) => {
                assert_eq!(a.to_string(), "Token expired");
                assert_eq!(b.to_string(), "Invalid token signature");
            }
            other => panic!("unexpected variants: {other:?}"),
        }
    }
}
