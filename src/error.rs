//! Error handling for Segue
//!
//! Errors are split by how a caller is expected to react: contract violations
//! (`IllegalState`, `InvalidArgument`), arbitration rejections
//! (`UnsupportedOperation`), platform faults that the application controller
//! converts into notifications (`Platform`, `MetadataUnavailable`), and the
//! fatal `InvariantViolation`.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Segue operations
pub type Result<T> = std::result::Result<T, SegueError>;

/// Main error type for Segue operations
#[derive(Error, Debug)]
pub enum SegueError {
    // Contract Errors
    #[error("Illegal state: cannot {operation} while {state}")]
    IllegalState { operation: String, state: String },

    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    // Arbitration Errors
    #[error("Unsupported operation: {operation} ({reason})")]
    UnsupportedOperation { operation: String, reason: String },

    // Platform Errors
    #[error("Platform failure during {operation}: {reason}")]
    Platform { operation: String, reason: String },

    #[error("Metadata unavailable for '{uri}': {reason}")]
    MetadataUnavailable {
        uri: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Fatal Errors
    #[error("Invariant violation: {reason}")]
    InvariantViolation { reason: String },

    // Persistence Errors
    #[error("Failed to read {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot checksum mismatch (expected {expected}, found {actual})")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Unsupported snapshot schema version: {version}")]
    UnsupportedSchema { version: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SegueError {
    /// Shorthand for an [`SegueError::IllegalState`].
    pub fn illegal_state(operation: impl Into<String>, state: impl ToString) -> Self {
        SegueError::IllegalState {
            operation: operation.into(),
            state: state.to_string(),
        }
    }

    /// Shorthand for an [`SegueError::InvalidArgument`].
    pub fn invalid_argument(name: impl Into<String>, reason: impl Into<String>) -> Self {
        SegueError::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an [`SegueError::Platform`].
    pub fn platform(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        SegueError::Platform {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            SegueError::IllegalState { .. } => "ILLEGAL_STATE",
            SegueError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            SegueError::UnsupportedOperation { .. } => "UNSUPPORTED_OPERATION",
            SegueError::Platform { .. } => "PLATFORM_FAILURE",
            SegueError::MetadataUnavailable { .. } => "METADATA_UNAVAILABLE",
            SegueError::InvariantViolation { .. } => "INVARIANT_VIOLATION",
            SegueError::FileReadError { .. } => "FILE_READ_ERROR",
            SegueError::FileWriteError { .. } => "FILE_WRITE_ERROR",
            SegueError::ChecksumMismatch { .. } => "CHECKSUM_MISMATCH",
            SegueError::UnsupportedSchema { .. } => "UNSUPPORTED_SCHEMA",
            SegueError::Io(_) => "IO_ERROR",
            SegueError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors leave every piece of shared state untouched, so the
    /// caller may retry later (for example once the controlling effect handle
    /// has been released).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SegueError::UnsupportedOperation { .. }
                | SegueError::Platform { .. }
                | SegueError::MetadataUnavailable { .. }
                | SegueError::FileReadError { .. }
        )
    }

    /// Whether the error must never be downgraded to a notification.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SegueError::InvariantViolation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = SegueError::illegal_state("start", "End");
        assert_eq!(err.error_code(), "ILLEGAL_STATE");
        assert_eq!(err.to_string(), "Illegal state: cannot start while End");
    }

    #[test]
    fn test_recoverability() {
        let err = SegueError::UnsupportedOperation {
            operation: "set_strength".to_string(),
            reason: "handle does not have control".to_string(),
        };
        assert!(err.is_recoverable());
        assert!(!err.is_fatal());

        let err = SegueError::illegal_state("release", "End");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_invariant_violation_is_fatal() {
        let err = SegueError::InvariantViolation {
            reason: "active slot started without metadata".to_string(),
        };
        assert!(err.is_fatal());
        assert!(!err.is_recoverable());
        assert_eq!(err.error_code(), "INVARIANT_VIOLATION");
    }
}
