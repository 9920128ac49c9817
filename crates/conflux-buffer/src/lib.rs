//! # conflux-buffer
//!
//! Tuple buffers for conflux.
//!
//! A tuple buffer is an append-only, row-indexed store that can be read back
//! by position. The execution core writes produced batches into buffers,
//! and readers open independent cursors over them.
//!
//! ```text
//!   producer ──batches──▶ TupleBuffer (Open) ──seal──▶ Sealed ──remove──▶ Removed
//!                              │
//!                              └──▶ TupleCursor, TupleCursor, ... (independent readers)
//! ```
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use conflux_buffer::{
//!     BufferKind, BufferManager, MemoryBufferManager, TupleBuffer, TupleBufferExt,
//! };
//! use conflux_common::config::BufferConfig;
//! use conflux_common::types::{Row, Schema, TupleBatch, Value};
//!
//! let manager = MemoryBufferManager::new(BufferConfig::default());
//! let buffer = manager
//!     .create_tuple_buffer(Arc::new(Schema::empty()), BufferKind::Final)
//!     .unwrap();
//!
//! let batch = TupleBatch::new(1, vec![Row::new(vec![Value::int(1)])], true);
//! buffer.append_batch(&batch, true).unwrap();
//! buffer.seal().unwrap();
//!
//! let mut cursor = buffer.create_cursor();
//! assert_eq!(cursor.next_tuple().unwrap(), Some(Row::new(vec![Value::int(1)])));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod cursor;
mod error;
mod manager;
mod memory;
mod seal;

use std::fmt;
use std::sync::Arc;

use conflux_common::types::{BufferId, Row, Schema, TupleBatch};

pub use cursor::TupleCursor;
pub use error::{BufferError, BufferResult};
pub use manager::{BufferManager, BufferStats, MemoryBufferManager};
pub use memory::MemoryTupleBuffer;
pub use seal::SealOnce;

/// Shared handle to a tuple buffer.
pub type TupleBufferRef = Arc<dyn TupleBuffer>;

/// Lifecycle state of a buffer. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BufferState {
    /// Accepting appends.
    Open,
    /// No further appends; still readable.
    Sealed,
    /// Storage released; must not be read.
    Removed,
}

impl fmt::Display for BufferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferState::Open => write!(f, "open"),
            BufferState::Sealed => write!(f, "sealed"),
            BufferState::Removed => write!(f, "removed"),
        }
    }
}

/// What a buffer is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Final results of a query.
    Final,
    /// Intermediate results of a nested execution or an iterator's replay
    /// window.
    Processor,
}

/// An append-only, row-indexed store.
///
/// Row numbers are 1-based and contiguous. Implementations own the decision
/// of what stays resident; callers only see positional reads.
pub trait TupleBuffer: Send + Sync + fmt::Debug {
    /// Returns the buffer's handle id.
    fn id(&self) -> BufferId;

    /// Returns the row shape stored in this buffer.
    fn schema(&self) -> &Arc<Schema>;

    /// Appends every row of `batch`.
    ///
    /// A non-empty batch must begin right after the current last row. When
    /// `mark_boundary` is set the batch's end is recorded as a batch
    /// boundary.
    fn append_batch(&self, batch: &TupleBatch, mark_boundary: bool) -> BufferResult<()>;

    /// Appends a single row that must become row `row_number`.
    fn append_tuple(&self, row: Row, row_number: u64) -> BufferResult<()>;

    /// Reads the row with the given row number.
    fn row(&self, row_number: u64) -> BufferResult<Row>;

    /// Returns the number of rows currently stored.
    fn row_count(&self) -> u64;

    /// Discards all rows. The buffer stays open.
    fn purge(&self) -> BufferResult<()>;

    /// Seals the buffer against further appends.
    ///
    /// Returns true only for the call that performed the transition; sealing
    /// an already sealed buffer is a no-op.
    fn seal(&self) -> BufferResult<bool>;

    /// Releases all storage. Returns false if the buffer was already removed.
    fn remove(&self) -> bool;

    /// Returns the current lifecycle state.
    fn state(&self) -> BufferState;
}

/// Convenience operations on shared buffer handles.
pub trait TupleBufferExt {
    /// Creates a fresh read cursor positioned before the first row.
    fn create_cursor(&self) -> TupleCursor;
}

impl TupleBufferExt for TupleBufferRef {
    fn create_cursor(&self) -> TupleCursor {
        TupleCursor::new(Arc::clone(self))
    }
}
