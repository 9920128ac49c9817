//! Tuple buffer errors.

use conflux_common::error::ConfluxError;
use conflux_common::types::BufferId;
use thiserror::Error;

/// Result type for tuple buffer operations.
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during tuple buffer operations.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum BufferError {
    /// The manager has no room for another buffer.
    #[error("no free buffers, {live} of {max} in use")]
    NoFreeBuffers { live: usize, max: usize },

    /// The shared row budget would be exceeded.
    #[error("buffer {buffer_id} cannot hold {requested} more rows, {available} available")]
    CapacityExceeded {
        buffer_id: BufferId,
        requested: usize,
        available: usize,
    },

    /// Append attempted on a sealed buffer.
    #[error("buffer {buffer_id} is sealed")]
    BufferSealed { buffer_id: BufferId },

    /// Access attempted on a removed buffer.
    #[error("buffer {buffer_id} has been removed")]
    BufferRemoved { buffer_id: BufferId },

    /// Append would leave a gap or overwrite existing rows.
    #[error("buffer {buffer_id} expected row {expected}, got {actual}")]
    NonContiguousAppend {
        buffer_id: BufferId,
        expected: u64,
        actual: u64,
    },

    /// Read of a row that is not stored.
    #[error("row {row_number} out of range for buffer {buffer_id} with {row_count} rows")]
    RowOutOfRange {
        buffer_id: BufferId,
        row_number: u64,
        row_count: u64,
    },
}

impl BufferError {
    /// Creates a sealed-buffer error.
    pub fn sealed(buffer_id: BufferId) -> Self {
        Self::BufferSealed { buffer_id }
    }

    /// Creates a removed-buffer error.
    pub fn removed(buffer_id: BufferId) -> Self {
        Self::BufferRemoved { buffer_id }
    }

    /// Returns true if this is a transient error that can be retried once
    /// other buffers release storage.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NoFreeBuffers { .. } | Self::CapacityExceeded { .. }
        )
    }

    /// Returns true if the error reports a lifecycle violation by the caller.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::BufferRemoved { .. } | Self::NonContiguousAppend { .. }
        )
    }
}

impl From<BufferError> for ConfluxError {
    fn from(err: BufferError) -> Self {
        ConfluxError::component(err.to_string())
    }
}
