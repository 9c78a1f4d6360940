//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error variants.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lookalike_core::LookalikeError;
use thiserror::Error;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Payload too large - uploaded file exceeds the configured limit
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Conflict - resource already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Not found - requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error - unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Service unavailable - required service is not configured or available
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Matching engine error
    #[error("Lookalike error: {0}")]
    Lookalike(#[from] LookalikeError),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create a payload too large error
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::PayloadTooLarge(message.into())
    }

    /// Create a conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a service unavailable error
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Lookalike(ref e) => match e {
                // Undecodable query or upload → 422 Unprocessable Entity
                LookalikeError::ImageDecode(_) => StatusCode::UNPROCESSABLE_ENTITY,

                LookalikeError::DuplicateHash(_) => StatusCode::CONFLICT,

                LookalikeError::InvalidHash(_) => StatusCode::BAD_REQUEST,

                // Catalog unavailable → 503
                LookalikeError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,

                LookalikeError::EntryUnavailable { .. }
                | LookalikeError::HashLengthMismatch { .. }
                | LookalikeError::InvalidConfig(_)
                | LookalikeError::Io(_)
                | LookalikeError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Get the error code for programmatic error handling
    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::PayloadTooLarge(_) => "FILE_TOO_LARGE",
            Self::Conflict(_) => "CONFLICT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Lookalike(ref e) => match e {
                LookalikeError::ImageDecode(_) => "IMAGE_DECODE_ERROR",
                LookalikeError::DuplicateHash(_) => "DUPLICATE_IMAGE",
                LookalikeError::InvalidHash(_) => "INVALID_HASH",
                LookalikeError::Storage(_) => "STORAGE_UNAVAILABLE",
                LookalikeError::EntryUnavailable { .. } => "ENTRY_UNAVAILABLE",
                LookalikeError::HashLengthMismatch { .. } => "HASH_LENGTH_MISMATCH",
                LookalikeError::InvalidConfig(_) => "INVALID_CONFIG",
                LookalikeError::Io(_) => "IO_ERROR",
                LookalikeError::Task(_) => "TASK_FAILED",
            },
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            // For engine errors, sanitize internal details
            Self::Lookalike(ref e) => match e {
                LookalikeError::ImageDecode(_) => {
                    "Uploaded file is not a decodable image".to_string()
                }
                LookalikeError::DuplicateHash(_) => "This image already exists".to_string(),
                LookalikeError::InvalidHash(_) => "Invalid image hash".to_string(),
                LookalikeError::Storage(_) => "Image catalog is unavailable".to_string(),
                LookalikeError::EntryUnavailable { .. }
                | LookalikeError::HashLengthMismatch { .. }
                | LookalikeError::InvalidConfig(_)
                | LookalikeError::Io(_)
                | LookalikeError::Task(_) => "Could not complete the comparison".to_string(),
            },
            Self::Conflict(message) => message.clone(),
            // For other errors, use the Display message
            _ => self.to_string(),
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::Conflict(_) => "conflict",
            Self::NotFound(_) => "not_found",
            Self::Internal(_) => "internal",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::Lookalike(_) => "lookalike",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        // Log based on severity, always including internal details
        if status.is_server_error() {
            tracing::error!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                client_message = %client_message,
                "Server error"
            );
        } else {
            tracing::warn!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                "Client error"
            );
        }

        // All error responses include a `code` field for programmatic error handling
        let body = serde_json::json!({
            "error": client_message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}
