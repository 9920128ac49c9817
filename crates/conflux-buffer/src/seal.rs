//! Seal-once guard for destination buffers.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

use crate::error::BufferResult;
use crate::{BufferState, TupleBufferRef};

/// Owns the obligation to seal a destination buffer.
///
/// [`seal`](Self::seal) may be called any number of times; the buffer is
/// sealed by the first call only. If the guard is dropped while the buffer
/// is still open, it seals it on the way out.
#[derive(Debug)]
pub struct SealOnce {
    buffer: TupleBufferRef,
    sealed: AtomicBool,
}

impl SealOnce {
    /// Creates a guard over an open buffer.
    pub fn new(buffer: TupleBufferRef) -> Self {
        Self {
            buffer,
            sealed: AtomicBool::new(false),
        }
    }

    /// Returns the guarded buffer.
    pub fn buffer(&self) -> &TupleBufferRef {
        &self.buffer
    }

    /// Returns true once the guard has sealed the buffer.
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Seals the buffer unless this guard already did.
    ///
    /// A buffer that was removed by its owner counts as sealed.
    pub fn seal(&self) -> BufferResult<()> {
        if self.sealed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if self.buffer.state() == BufferState::Removed {
            return Ok(());
        }
        self.buffer.seal().map(|_| ())
    }
}

impl Drop for SealOnce {
    fn drop(&mut self) {
        if let Err(e) = self.seal() {
            warn!(buffer = %self.buffer.id(), error = %e, "failed to seal buffer on drop");
        }
    }
}
