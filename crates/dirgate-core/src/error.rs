//! Error types for directory operations.
//!
//! One enum covers every caller-visible failure class: configuration and
//! validation problems, transport failures, and the distinct outcomes of the
//! authentication sequence (missing user, ambiguous match, bad credentials,
//! failed rebind).

use thiserror::Error;

/// Main error type for directory operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid endpoint URL
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Could not establish a connection to the directory server
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Operation timed out
    #[error("Timeout waiting for directory: {0}")]
    Timeout(String),

    /// Credentials were missing or rejected
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// No directory entry matched
    #[error("Not found: {0}")]
    NotFound(String),

    /// More than one directory entry matched
    #[error("Ambiguous match: {0}")]
    AmbiguousMatch(String),

    /// Restoring the service-account session after verification failed
    #[error("Rebind failed: {0}")]
    RebindFailed(String),

    /// The user authenticated but is not in any allowed group
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Directory protocol error, surfaced verbatim
    #[error("Directory error: {operation}: {message}")]
    Directory {
        /// Protocol operation that failed
        operation: String,
        /// Error message from the protocol layer
        message: String,
    },
}

/// Specialized result type for directory operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::ConnectionFailed(_) => "CONNECTION_FAILED",
            Self::Timeout(_) => "TIMEOUT",
            Self::InvalidCredentials(_) => "INVALID_CREDENTIALS",
            Self::NotFound(_) => "NOT_FOUND",
            Self::AmbiguousMatch(_) => "AMBIGUOUS_MATCH",
            Self::RebindFailed(_) => "REBIND_FAILED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Directory { .. } => "DIRECTORY_ERROR",
        }
    }

    /// Returns true if this error should be logged as a serious error.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(
            self,
            Self::ConfigError(_)
                | Self::ConnectionFailed(_)
                | Self::RebindFailed(_)
                | Self::Directory { .. }
        )
    }
}

// Conversions from external error types
impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(err.to_string())
    }
}
