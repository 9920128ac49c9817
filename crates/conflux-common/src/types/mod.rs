//! Type definitions for conflux.
//!
//! This module contains the core data types that flow between producers,
//! buffers and consumers.

mod batch;
mod ids;
mod row;
mod schema;
mod value;

pub use batch::TupleBatch;
pub use ids::{BufferId, ConnectionId, ProcessId};
pub use row::Row;
pub use schema::{Column, DataType, Schema};
pub use value::Value;
