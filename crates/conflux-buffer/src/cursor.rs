//! Indexed read cursor over a tuple buffer.

use conflux_common::types::Row;

use crate::error::BufferResult;
use crate::TupleBufferRef;

/// An independent positional reader.
///
/// The cursor only tracks its own position; rows appended after it was
/// created become visible to it.
#[derive(Debug, Clone)]
pub struct TupleCursor {
    buffer: TupleBufferRef,
    /// Row number of the last row returned, 0 before the first.
    current: u64,
}

impl TupleCursor {
    /// Creates a cursor positioned before the first row.
    pub fn new(buffer: TupleBufferRef) -> Self {
        Self { buffer, current: 0 }
    }

    /// Returns the buffer being read.
    pub fn buffer(&self) -> &TupleBufferRef {
        &self.buffer
    }

    /// Row number of the last row returned, or 0.
    #[inline]
    pub fn current_index(&self) -> u64 {
        self.current
    }

    /// Returns true if another row is stored past the cursor.
    pub fn has_next(&self) -> bool {
        self.current < self.buffer.row_count()
    }

    /// Reads the next row, or `None` at the end of the stored rows.
    pub fn next_tuple(&mut self) -> BufferResult<Option<Row>> {
        if !self.has_next() {
            return Ok(None);
        }
        let row = self.buffer.row(self.current + 1)?;
        self.current += 1;
        Ok(Some(row))
    }

    /// Positions the cursor so the next row read is `row_number`.
    pub fn set_position(&mut self, row_number: u64) {
        self.current = row_number.saturating_sub(1);
    }

    /// Number of stored rows not yet read.
    pub fn available(&self) -> u64 {
        self.buffer.row_count().saturating_sub(self.current)
    }
}
