//! Error types for the RecBlend engine
//!
//! One hierarchy for the whole crate:
//! - `thiserror` for the error definitions
//! - variants split by how they are recovered (locally vs. surfaced to the caller)
//! - HTTP status code mapping for API responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::borrow::Cow;
use thiserror::Error;

/// Result type alias for RecBlend operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the RecBlend engine
#[derive(Debug, Error)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    #[error("Configuration error: {message}")]
    Config {
        message: Cow<'static, str>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidConfig {
        key: &'static str,
        message: Cow<'static, str>,
    },

    // ========================================================================
    // Lookup Errors
    // ========================================================================
    /// Recovered by the offline store through the default list.
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    #[error("Snapshot error for {path}: {message}")]
    Snapshot {
        path: String,
        message: Cow<'static, str>,
    },

    // ========================================================================
    // Collaborator Errors
    // ========================================================================
    /// Recovered by the online expander as an empty or partial source.
    #[error("Collaborator unavailable: {service}: {message}")]
    CollaboratorUnavailable {
        service: &'static str,
        message: Cow<'static, str>,
    },

    #[error("Operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ========================================================================
    // Request Errors
    // ========================================================================
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: Cow<'static, str> },

    #[error("Internal server error")]
    Internal {
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // ========================================================================
    // IO Errors
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    // ========================================================================
    // Constructors for common error patterns
    // ========================================================================

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Create a collaborator error
    pub fn collaborator(service: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self::CollaboratorUnavailable {
            service,
            message: message.into(),
        }
    }

    /// Create a snapshot loading error
    pub fn snapshot(path: impl Into<String>, message: impl Into<Cow<'static, str>>) -> Self {
        Self::Snapshot {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Internal {
            source: Some(Box::new(source)),
        }
    }

    // ========================================================================
    // Error Classification
    // ========================================================================

    /// Returns true if the caller sent a bad request
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::CollaboratorUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } | Error::InvalidConfig { .. } => "CONFIG_ERROR",
            Error::NotFound { .. } => "NOT_FOUND",
            Error::Snapshot { .. } => "SNAPSHOT_ERROR",
            Error::CollaboratorUnavailable { .. } => "COLLABORATOR_UNAVAILABLE",
            Error::Timeout { .. } => "TIMEOUT",
            Error::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Error::Io(_) | Error::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

// ============================================================================
// Error Response for API
// ============================================================================

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        // Don't expose internal error details
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}
