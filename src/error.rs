//! Error types for storage, dispatch, and configuration.
//!
//! Storage errors pass through the context layer unchanged. The dispatcher
//! wraps only a failed state read, tagging it with the endpoint that was
//! being dispatched; handler errors are returned as-is.

use crate::handlers::Endpoint;
use thiserror::Error;

// ============================================================================
// Storage Errors
// ============================================================================

/// Errors returned by [`Storage`](crate::Storage) and [`Context`](crate::Context) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// The session has no data under this field.
    #[error("data field {field:?} not found")]
    NotFound {
        /// Requested field.
        field: String,
    },

    /// The stored value cannot be decoded as the requested type.
    #[error("data field {field:?} holds {found}, cannot read it as {expected}")]
    TypeMismatch {
        /// Requested field.
        field: String,
        /// Rust type the caller asked for.
        expected: &'static str,
        /// Kind of the stored value.
        found: &'static str,
    },

    /// The value cannot be encoded for storage.
    #[error("invalid value for data field {field:?}: {reason}")]
    InvalidValue {
        /// Field being written.
        field: String,
        /// Encoder message.
        reason: String,
    },

    /// The storage was closed.
    #[error("storage is closed")]
    Closed,

    /// Failure inside a storage backend.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::InvalidValue { .. } => "invalid_value",
            Self::Closed => "closed",
            Self::Backend(_) => "backend",
        }
    }

    /// Whether the error means "no value", which callers usually treat as a default.
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// ============================================================================
// Handler Errors (dispatch)
// ============================================================================

/// Errors that can occur while dispatching an event or inside a handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The current state could not be read before selecting a handler.
    #[error("get state at handler {endpoint}: {source}")]
    State {
        /// Endpoint being dispatched.
        endpoint: Endpoint,
        /// Underlying storage failure.
        #[source]
        source: StorageError,
    },

    /// A storage call made by a handler failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A handler was registered with incomplete configuration.
    #[error("invalid handler config: {0}")]
    Config(String),

    /// Unexpected failure inside the library or a handler.
    #[error("internal error: {0}")]
    Internal(String),

    /// Application error reported by a handler.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HandlerError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::State { .. } => "handler_state",
            Self::Storage(e) => e.error_code(),
            Self::Config(_) => "config",
            Self::Internal(_) => "internal_error",
            Self::Other(_) => "handler",
        }
    }
}

/// Result type for handlers and dispatch.
pub type HandlerResult = Result<(), HandlerError>;

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid TOML or does not match the schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// The file parsed but failed validation.
    #[error("invalid config: {}", join_errors(.0))]
    Invalid(Vec<crate::config::ValidationError>),
}

fn join_errors(errors: &[crate::config::ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
