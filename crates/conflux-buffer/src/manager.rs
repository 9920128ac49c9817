//! Buffer managers hand out tuple buffers and account for their storage.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use conflux_common::config::BufferConfig;
use conflux_common::types::{BufferId, Schema};
use tracing::debug;

use crate::error::{BufferError, BufferResult};
use crate::memory::MemoryTupleBuffer;
use crate::{BufferKind, TupleBufferRef};

/// Source of tuple buffers.
pub trait BufferManager: Send + Sync {
    /// Allocates a new open buffer for rows of `schema`.
    fn create_tuple_buffer(&self, schema: Arc<Schema>, kind: BufferKind)
        -> BufferResult<TupleBufferRef>;

    /// Nominal number of rows a producer should put in one batch.
    fn batch_size(&self) -> usize;

    /// Returns a snapshot of allocation statistics.
    fn stats(&self) -> BufferStats;
}

/// Buffer manager statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStats {
    /// Buffers created since startup.
    pub created: u64,
    /// Buffers removed since startup.
    pub removed: u64,
    /// Buffers currently live.
    pub live_buffers: usize,
    /// Rows currently held by live buffers.
    pub rows_in_use: usize,
    /// Allocations refused for lack of a free buffer.
    pub refused: u64,
}

/// State shared between a manager and the buffers it created.
///
/// Buffers keep this alive, so accounting stays correct when a buffer
/// outlives its manager.
#[derive(Debug)]
pub(crate) struct PoolShared {
    max_buffers: usize,
    max_rows: usize,
    live_buffers: AtomicUsize,
    rows_in_use: AtomicUsize,
    created: AtomicU64,
    removed: AtomicU64,
    refused: AtomicU64,
}

impl PoolShared {
    fn new(config: &BufferConfig) -> Self {
        Self {
            max_buffers: config.max_buffers,
            max_rows: config.max_rows,
            live_buffers: AtomicUsize::new(0),
            rows_in_use: AtomicUsize::new(0),
            created: AtomicU64::new(0),
            removed: AtomicU64::new(0),
            refused: AtomicU64::new(0),
        }
    }

    fn acquire_buffer(&self) -> BufferResult<()> {
        let max = self.max_buffers;
        self.live_buffers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                (live < max).then_some(live + 1)
            })
            .map(|_| {
                self.created.fetch_add(1, Ordering::Relaxed);
            })
            .map_err(|live| {
                self.refused.fetch_add(1, Ordering::Relaxed);
                BufferError::NoFreeBuffers { live, max }
            })
    }

    pub(crate) fn buffer_removed(&self) {
        self.live_buffers.fetch_sub(1, Ordering::AcqRel);
        self.removed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn reserve_rows(&self, buffer_id: BufferId, requested: usize) -> BufferResult<()> {
        let max = self.max_rows;
        self.rows_in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                used.checked_add(requested).filter(|total| *total <= max)
            })
            .map(|_| ())
            .map_err(|used| BufferError::CapacityExceeded {
                buffer_id,
                requested,
                available: max.saturating_sub(used),
            })
    }

    pub(crate) fn release_rows(&self, rows: usize) {
        if rows > 0 {
            self.rows_in_use.fetch_sub(rows, Ordering::AcqRel);
        }
    }
}

/// A [`BufferManager`] that keeps every buffer in memory.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use conflux_buffer::{BufferKind, BufferManager, MemoryBufferManager, TupleBuffer};
/// use conflux_common::config::BufferConfig;
/// use conflux_common::types::Schema;
///
/// let manager = MemoryBufferManager::new(BufferConfig::default());
/// let buffer = manager
///     .create_tuple_buffer(Arc::new(Schema::empty()), BufferKind::Processor)
///     .unwrap();
/// assert_eq!(manager.stats().live_buffers, 1);
/// buffer.remove();
/// assert_eq!(manager.stats().live_buffers, 0);
/// ```
#[derive(Debug)]
pub struct MemoryBufferManager {
    batch_size: usize,
    next_id: AtomicU64,
    shared: Arc<PoolShared>,
}

impl MemoryBufferManager {
    /// Creates a manager with the given limits.
    pub fn new(config: BufferConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            next_id: AtomicU64::new(BufferId::FIRST.as_u64()),
            shared: Arc::new(PoolShared::new(&config)),
        }
    }
}

impl Default for MemoryBufferManager {
    fn default() -> Self {
        Self::new(BufferConfig::default())
    }
}

impl BufferManager for MemoryBufferManager {
    fn create_tuple_buffer(
        &self,
        schema: Arc<Schema>,
        kind: BufferKind,
    ) -> BufferResult<TupleBufferRef> {
        self.shared.acquire_buffer()?;
        let id = BufferId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(buffer = %id, ?kind, columns = schema.len(), "created tuple buffer");
        Ok(Arc::new(MemoryTupleBuffer::with_pool(
            id,
            schema,
            kind,
            Some(Arc::clone(&self.shared)),
        )))
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn stats(&self) -> BufferStats {
        BufferStats {
            created: self.shared.created.load(Ordering::Relaxed),
            removed: self.shared.removed.load(Ordering::Relaxed),
            live_buffers: self.shared.live_buffers.load(Ordering::Acquire),
            rows_in_use: self.shared.rows_in_use.load(Ordering::Acquire),
            refused: self.shared.refused.load(Ordering::Relaxed),
        }
    }
}
