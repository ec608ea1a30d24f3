//! The uniform response envelope.
//!
//! Every endpoint, success or failure, answers with the same four-field
//! shape so clients can branch on `success` and `message` without caring
//! which route they called.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse<T> {
    pub success: bool,
    pub message: String,
    pub response_object: Option<T>,
    pub status_code: u16,
}

impl<T> ServiceResponse<T> {
    pub fn success(message: impl Into<String>, response_object: T, status_code: u16) -> Self {
        Self {
            success: true,
            message: message.into(),
            response_object: Some(response_object),
            status_code,
        }
    }

    pub fn failure(message: impl Into<String>, status_code: u16) -> Self {
        Self {
            success: false,
            message: message.into(),
            response_object: None,
            status_code,
        }
    }

    /// Failure carrying a payload, used where the original behavior returns
    /// a user-facing hint alongside the error message.
    pub fn failure_with(
        message: impl Into<String>,
        response_object: T,
        status_code: u16,
    ) -> Self {
        Self {
            success: false,
            message: message.into(),
            response_object: Some(response_object),
            status_code,
        }
    }
}
