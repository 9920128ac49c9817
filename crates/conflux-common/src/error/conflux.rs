//! Execution error types.
//!
//! Every failure surfaced by the execution core falls into one of three
//! kinds: processing failures (user or business-rule related, including
//! cancellation), component failures (system or infrastructure faults) and
//! unsupported operations (caller misuse). "Not ready" is deliberately absent:
//! it is a retry signal carried in the `Ok` branch, never an error.

use std::fmt;
use thiserror::Error;

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling and
/// are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // General errors (0x0000 - 0x00FF)
    /// Internal error (bug).
    Internal = 0x0001,
    /// Operation not supported.
    NotSupported = 0x0002,
    /// Invalid argument provided.
    InvalidArgument = 0x0003,
    /// Invalid configuration.
    InvalidConfig = 0x0004,

    // Processing errors (0x0100 - 0x01FF)
    /// Query processing failed.
    ProcessingFailed = 0x0100,
    /// Request was cancelled.
    Cancelled = 0x0101,

    // Component errors (0x0200 - 0x02FF)
    /// A system component failed.
    ComponentFailed = 0x0200,
    /// An error raised outside the execution core.
    External = 0x0201,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x00 => "General",
            0x01 => "Processing",
            0x02 => "Component",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The failure taxonomy callers match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// User or business-rule related; includes cancellation.
    Processing,
    /// System or infrastructure related.
    Component,
    /// A programming-contract violation by the caller. Never retried.
    Unsupported,
}

/// The main error type for conflux.
///
/// # Example
///
/// ```rust
/// use conflux_common::error::{ConfluxError, ErrorKind};
///
/// let err = ConfluxError::not_supported("reset without a backing buffer");
/// assert_eq!(err.kind(), ErrorKind::Unsupported);
/// ```
#[derive(Debug, Error)]
pub enum ConfluxError {
    // ==========================================================================
    // Processing Errors
    // ==========================================================================
    /// Query processing failed for a data or business-rule reason.
    #[error("processing failed: {message}")]
    Processing {
        /// Error message.
        message: String,
    },

    /// The request was cancelled.
    #[error("request {request} was cancelled")]
    Cancelled {
        /// Identifier of the cancelled request.
        request: String,
    },

    // ==========================================================================
    // Component Errors
    // ==========================================================================
    /// A system component failed.
    #[error("component failure: {message}")]
    Component {
        /// Error message.
        message: String,
    },

    /// An error raised by code outside the execution core.
    #[error("external error: {source}")]
    External {
        /// The underlying error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // ==========================================================================
    // Contract Errors
    // ==========================================================================
    /// Operation not supported.
    #[error("operation not supported: {operation}")]
    NotSupported {
        /// The unsupported operation.
        operation: String,
    },

    /// Invalid argument provided.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Error message.
        message: String,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Error message.
        message: String,
    },

    /// Internal error - this indicates a bug.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl ConfluxError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Processing { .. } => ErrorCode::ProcessingFailed,
            Self::Cancelled { .. } => ErrorCode::Cancelled,
            Self::Component { .. } => ErrorCode::ComponentFailed,
            Self::External { .. } => ErrorCode::External,
            Self::NotSupported { .. } => ErrorCode::NotSupported,
            Self::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            Self::InvalidConfig { .. } => ErrorCode::InvalidConfig,
            Self::Internal { .. } => ErrorCode::Internal,
        }
    }

    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Processing { .. } | Self::Cancelled { .. } | Self::InvalidArgument { .. } => {
                ErrorKind::Processing
            }
            Self::NotSupported { .. } => ErrorKind::Unsupported,
            Self::Component { .. }
            | Self::External { .. }
            | Self::InvalidConfig { .. }
            | Self::Internal { .. } => ErrorKind::Component,
        }
    }

    /// Returns true if this is a processing failure.
    #[must_use]
    pub const fn is_processing(&self) -> bool {
        matches!(self.kind(), ErrorKind::Processing)
    }

    /// Returns true if this is a component failure.
    #[must_use]
    pub const fn is_component(&self) -> bool {
        matches!(self.kind(), ErrorKind::Component)
    }

    /// Returns true if this error reports a cancelled request.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Converts uncategorized failures into a generic component failure.
    ///
    /// Applied where errors leave the query processor so that callers only
    /// ever see the stable variants.
    #[must_use]
    pub fn into_boundary(self) -> Self {
        match self {
            Self::External { source } => Self::Component {
                message: source.to_string(),
            },
            Self::Internal { message } => Self::Component { message },
            other => other,
        }
    }

    /// Creates a processing error.
    #[must_use]
    pub fn processing(message: impl Into<String>) -> Self {
        Self::Processing {
            message: message.into(),
        }
    }

    /// Creates a component error.
    #[must_use]
    pub fn component(message: impl Into<String>) -> Self {
        Self::Component {
            message: message.into(),
        }
    }

    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled(request: impl fmt::Display) -> Self {
        Self::Cancelled {
            request: request.to_string(),
        }
    }

    /// Creates an unsupported-operation error.
    #[must_use]
    pub fn not_supported(operation: impl Into<String>) -> Self {
        Self::NotSupported {
            operation: operation.into(),
        }
    }

    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Wraps a foreign error.
    #[must_use]
    pub fn external(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::External {
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = ConfluxError::cancelled("proc-1");
        assert_eq!(err.code(), ErrorCode::Cancelled);
        assert_eq!(err.code().category(), "Processing");
        assert_eq!(ErrorCode::ComponentFailed.category(), "Component");
        assert_eq!(ErrorCode::NotSupported.as_u16(), 2);
    }

    #[test]
    fn test_error_display() {
        let err = ConfluxError::cancelled("proc-7");
        assert_eq!(err.to_string(), "request proc-7 was cancelled");

        let err = ConfluxError::not_supported("backward positioning");
        assert_eq!(err.to_string(), "operation not supported: backward positioning");
    }

    #[test]
    fn test_kind() {
        assert_eq!(ConfluxError::processing("x").kind(), ErrorKind::Processing);
        assert!(ConfluxError::cancelled("p").is_processing());
        assert!(ConfluxError::component("x").is_component());
        assert!(ConfluxError::internal("x").is_component());
        assert_eq!(
            ConfluxError::not_supported("x").kind(),
            ErrorKind::Unsupported
        );
    }

    #[test]
    fn test_into_boundary() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = ConfluxError::external(io_err).into_boundary();
        assert!(matches!(err, ConfluxError::Component { ref message } if message == "disk gone"));

        let err = ConfluxError::internal("bug").into_boundary();
        assert_eq!(err.code(), ErrorCode::ComponentFailed);

        let err = ConfluxError::processing("bad row").into_boundary();
        assert_eq!(err.code(), ErrorCode::ProcessingFailed);
    }
}
