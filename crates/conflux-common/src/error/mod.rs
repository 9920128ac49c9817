//! Error handling for conflux.
//!
//! This module provides a unified error type and result alias used
//! across all conflux components.

mod conflux;

pub use conflux::{ConfluxError, ErrorCode, ErrorKind};

/// Result type alias for conflux operations.
pub type ConfluxResult<T> = std::result::Result<T, ConfluxError>;
