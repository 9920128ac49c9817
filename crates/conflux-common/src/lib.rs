//! # conflux-common
//!
//! Common types, errors, and utilities for conflux.
//!
//! This crate provides the foundational types shared by the buffer and
//! execution crates. It includes:
//!
//! - **Types**: Identifiers (`ProcessId`, `ConnectionId`, `BufferId`), runtime
//!   values, rows, schemas and the `TupleBatch` unit of transfer
//! - **Errors**: Unified error handling with `ConfluxError`
//! - **Config**: Engine configuration structures
//! - **Logging**: `tracing` subscriber bootstrap
//!
//! ## Example
//!
//! ```rust
//! use conflux_common::types::{Row, TupleBatch, Value};
//!
//! let batch = TupleBatch::new(1, vec![Row::new(vec![Value::int(1)])], true);
//! assert_eq!(batch.end_row(), 1);
//! assert!(batch.is_terminal());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used items at the crate root
pub use error::{ConfluxError, ConfluxResult, ErrorCode, ErrorKind};
pub use types::{BufferId, ConnectionId, ProcessId, Row, Schema, TupleBatch, Value};
