//! In-memory tuple buffer.

use std::sync::Arc;

use conflux_common::types::{BufferId, Row, Schema, TupleBatch};
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::error::{BufferError, BufferResult};
use crate::manager::PoolShared;
use crate::{BufferKind, BufferState, TupleBuffer};

/// A tuple buffer that keeps every row resident.
///
/// Buffers created by a [`MemoryBufferManager`](crate::MemoryBufferManager)
/// draw rows from the manager's shared budget and return them on purge,
/// removal or drop. Standalone buffers are unbounded.
#[derive(Debug)]
pub struct MemoryTupleBuffer {
    id: BufferId,
    kind: BufferKind,
    schema: Arc<Schema>,
    inner: RwLock<Inner>,
    pool: Option<Arc<PoolShared>>,
}

#[derive(Debug)]
struct Inner {
    state: BufferState,
    rows: Vec<Row>,
    /// Row numbers that close a batch appended with `mark_boundary`.
    boundaries: Vec<u64>,
}

impl MemoryTupleBuffer {
    /// Creates a standalone buffer with no row budget.
    pub fn new(id: BufferId, schema: Arc<Schema>, kind: BufferKind) -> Self {
        Self::with_pool(id, schema, kind, None)
    }

    pub(crate) fn with_pool(
        id: BufferId,
        schema: Arc<Schema>,
        kind: BufferKind,
        pool: Option<Arc<PoolShared>>,
    ) -> Self {
        Self {
            id,
            kind,
            schema,
            inner: RwLock::new(Inner {
                state: BufferState::Open,
                rows: Vec::new(),
                boundaries: Vec::new(),
            }),
            pool,
        }
    }

    /// Returns what this buffer is used for.
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Returns the row numbers that close each boundary-marked batch.
    pub fn batch_boundaries(&self) -> Vec<u64> {
        self.inner.read().boundaries.clone()
    }

    fn check_writable(&self, inner: &Inner) -> BufferResult<()> {
        match inner.state {
            BufferState::Open => Ok(()),
            BufferState::Sealed => Err(BufferError::sealed(self.id)),
            BufferState::Removed => Err(BufferError::removed(self.id)),
        }
    }

    fn reserve(&self, rows: usize) -> BufferResult<()> {
        match &self.pool {
            Some(pool) => pool.reserve_rows(self.id, rows),
            None => Ok(()),
        }
    }

    fn release(&self, rows: usize) {
        if let Some(pool) = &self.pool {
            pool.release_rows(rows);
        }
    }
}

impl TupleBuffer for MemoryTupleBuffer {
    fn id(&self) -> BufferId {
        self.id
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn append_batch(&self, batch: &TupleBatch, mark_boundary: bool) -> BufferResult<()> {
        let mut inner = self.inner.write();
        self.check_writable(&inner)?;
        if batch.is_empty() {
            return Ok(());
        }

        let expected = inner.rows.len() as u64 + 1;
        if batch.begin_row() != expected {
            return Err(BufferError::NonContiguousAppend {
                buffer_id: self.id,
                expected,
                actual: batch.begin_row(),
            });
        }

        self.reserve(batch.row_count())?;
        inner.rows.extend(batch.rows().iter().cloned());
        if mark_boundary {
            inner.boundaries.push(batch.end_row());
        }
        trace!(buffer = %self.id, batch = %batch, "appended batch");
        Ok(())
    }

    fn append_tuple(&self, row: Row, row_number: u64) -> BufferResult<()> {
        let mut inner = self.inner.write();
        self.check_writable(&inner)?;

        let expected = inner.rows.len() as u64 + 1;
        if row_number != expected {
            return Err(BufferError::NonContiguousAppend {
                buffer_id: self.id,
                expected,
                actual: row_number,
            });
        }

        self.reserve(1)?;
        inner.rows.push(row);
        Ok(())
    }

    fn row(&self, row_number: u64) -> BufferResult<Row> {
        let inner = self.inner.read();
        if inner.state == BufferState::Removed {
            return Err(BufferError::removed(self.id));
        }
        let row_count = inner.rows.len() as u64;
        if row_number == 0 || row_number > row_count {
            return Err(BufferError::RowOutOfRange {
                buffer_id: self.id,
                row_number,
                row_count,
            });
        }
        Ok(inner.rows[(row_number - 1) as usize].clone())
    }

    fn row_count(&self) -> u64 {
        self.inner.read().rows.len() as u64
    }

    fn purge(&self) -> BufferResult<()> {
        let mut inner = self.inner.write();
        self.check_writable(&inner)?;
        let released = inner.rows.len();
        inner.rows.clear();
        inner.boundaries.clear();
        self.release(released);
        trace!(buffer = %self.id, released, "purged buffer");
        Ok(())
    }

    fn seal(&self) -> BufferResult<bool> {
        let mut inner = self.inner.write();
        match inner.state {
            BufferState::Open => {
                inner.state = BufferState::Sealed;
                debug!(buffer = %self.id, rows = inner.rows.len(), "sealed buffer");
                Ok(true)
            }
            BufferState::Sealed => Ok(false),
            BufferState::Removed => Err(BufferError::removed(self.id)),
        }
    }

    fn remove(&self) -> bool {
        let mut inner = self.inner.write();
        if inner.state == BufferState::Removed {
            return false;
        }
        let released = inner.rows.len();
        inner.rows = Vec::new();
        inner.boundaries = Vec::new();
        inner.state = BufferState::Removed;
        self.release(released);
        if let Some(pool) = &self.pool {
            pool.buffer_removed();
        }
        debug!(buffer = %self.id, released, "removed buffer");
        true
    }

    fn state(&self) -> BufferState {
        self.inner.read().state
    }
}

impl Drop for MemoryTupleBuffer {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conflux_common::types::Value;

    fn buffer() -> MemoryTupleBuffer {
        MemoryTupleBuffer::new(BufferId::new(1), Arc::new(Schema::empty()), BufferKind::Final)
    }

    fn row(i: i32) -> Row {
        Row::new(vec![Value::int(i)])
    }

    fn batch(begin: i32, end: i32, terminal: bool) -> TupleBatch {
        TupleBatch::new(begin as u64, (begin..=end).map(row).collect(), terminal)
    }

    #[test]
    fn test_append_and_read() {
        let buffer = buffer();
        buffer.append_batch(&batch(1, 3, false), true).unwrap();
        buffer.append_tuple(row(4), 4).unwrap();

        assert_eq!(buffer.row_count(), 4);
        assert_eq!(buffer.row(1).unwrap(), row(1));
        assert_eq!(buffer.row(4).unwrap(), row(4));
        assert_eq!(buffer.batch_boundaries(), vec![3]);
        assert!(matches!(
            buffer.row(5),
            Err(BufferError::RowOutOfRange { row_count: 4, .. })
        ));
        assert!(buffer.row(0).is_err());
    }

    #[test]
    fn test_non_contiguous_append_rejected() {
        let buffer = buffer();
        buffer.append_batch(&batch(1, 2, false), false).unwrap();

        let err = buffer.append_batch(&batch(4, 5, false), false).unwrap_err();
        assert!(matches!(
            err,
            BufferError::NonContiguousAppend { expected: 3, actual: 4, .. }
        ));
        assert!(buffer.append_tuple(row(2), 2).is_err());
        assert!(buffer.batch_boundaries().is_empty());
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let buffer = buffer();
        buffer.append_batch(&TupleBatch::terminal(7), true).unwrap();
        assert_eq!(buffer.row_count(), 0);
    }

    #[test]
    fn test_seal_is_idempotent() {
        let buffer = buffer();
        assert!(buffer.seal().unwrap());
        assert!(!buffer.seal().unwrap());
        assert_eq!(buffer.state(), BufferState::Sealed);
        assert!(matches!(
            buffer.append_tuple(row(1), 1),
            Err(BufferError::BufferSealed { .. })
        ));
        assert!(buffer.purge().is_err());
    }

    #[test]
    fn test_purge_keeps_buffer_open() {
        let buffer = buffer();
        buffer.append_batch(&batch(1, 3, false), true).unwrap();
        buffer.purge().unwrap();
        assert_eq!(buffer.row_count(), 0);
        assert_eq!(buffer.state(), BufferState::Open);
        buffer.append_tuple(row(9), 1).unwrap();
        assert_eq!(buffer.row(1).unwrap(), row(9));
    }

    #[test]
    fn test_remove_is_final() {
        let buffer = buffer();
        buffer.append_tuple(row(1), 1).unwrap();
        buffer.seal().unwrap();
        assert!(buffer.remove());
        assert!(!buffer.remove());
        assert_eq!(buffer.state(), BufferState::Removed);
        assert_eq!(buffer.row_count(), 0);
        assert!(matches!(buffer.row(1), Err(BufferError::BufferRemoved { .. })));
        assert!(buffer.seal().is_err());
    }
}
