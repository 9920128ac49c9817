//! Row-at-a-time iteration over a producer with optional replay.
//!
//! [`BatchIterator`] turns a batch stream into a row cursor. Without a
//! backing buffer it only moves forward, except within the batch it
//! currently holds. With a backing buffer attached it captures rows so that
//! [`reset`](BatchIterator::reset) can return to the last
//! [`mark`](BatchIterator::mark):
//!
//! - continuous mode mirrors every batch as it arrives, so the whole
//!   stream since attachment can be replayed;
//! - save-on-mark mode stores only rows consumed after the most recent
//!   mark, which bounds the buffer to the replay window.

use std::sync::Arc;

use conflux_buffer::TupleBufferRef;
use conflux_common::types::{Row, Schema, TupleBatch};
use conflux_common::{ConfluxError, ConfluxResult};
use tracing::{debug, trace};

use crate::producer::BatchProducer;
use crate::progress::Progress;
use crate::ready;
use crate::source::TupleSource;

/// The buffer an iterator replays from.
#[derive(Debug)]
struct Backing {
    buffer: TupleBufferRef,
    save_on_mark: bool,
    /// Stream row number stored just before the buffer's first row.
    base: u64,
}

impl Backing {
    /// Last stream row held by the buffer.
    fn high_water(&self) -> u64 {
        self.base + self.buffer.row_count()
    }

    fn covers(&self, row_number: u64) -> bool {
        row_number > self.base && row_number <= self.high_water()
    }

    fn row(&self, row_number: u64) -> ConfluxResult<Row> {
        Ok(self.buffer.row(row_number - self.base)?)
    }

    /// Discards the buffered rows; capture resumes at `row_number`.
    fn restart_at(&mut self, row_number: u64) -> ConfluxResult<()> {
        self.buffer.purge()?;
        self.base = row_number - 1;
        Ok(())
    }

    /// Stores the rows starting at `first_row` that extend past the high
    /// water mark. A gap restarts the buffer at `first_row`.
    fn capture(&mut self, first_row: u64, rows: &[Row]) -> ConfluxResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let last_row = first_row + rows.len() as u64 - 1;
        if last_row <= self.high_water() {
            return Ok(());
        }
        if first_row > self.high_water() + 1 {
            self.restart_at(first_row)?;
        }
        let start = self.high_water() + 1;
        let skip = (start - first_row) as usize;
        let batch = TupleBatch::new(start - self.base, rows[skip..].to_vec(), false);
        self.buffer.append_batch(&batch, true)?;
        Ok(())
    }
}

/// A repositionable row cursor over a [`BatchProducer`].
pub struct BatchIterator<P> {
    producer: P,
    /// Row number of the next row to return.
    current_row: u64,
    /// Furthest position the cursor has reached.
    furthest_row: u64,
    batch: Option<TupleBatch>,
    /// Row `current_row`, fetched by `has_next` and not yet returned.
    pending: Option<Row>,
    /// The terminal batch has been consumed.
    done: bool,
    backing: Option<Backing>,
    mark_row: u64,
    mark_active: bool,
}

impl<P: BatchProducer> BatchIterator<P> {
    /// Creates an iterator positioned at row 1.
    pub fn new(producer: P) -> Self {
        Self {
            producer,
            current_row: 1,
            furthest_row: 1,
            batch: None,
            pending: None,
            done: false,
            backing: None,
            mark_row: 1,
            mark_active: false,
        }
    }

    /// Returns whether another row is available, fetching batches from the
    /// producer as needed.
    pub fn has_next(&mut self) -> ConfluxResult<Progress<bool>> {
        if self.pending.is_some() {
            return Ok(Progress::Ready(true));
        }
        loop {
            if let Some(backing) = &self.backing {
                if backing.covers(self.current_row) {
                    self.pending = Some(backing.row(self.current_row)?);
                    return Ok(Progress::Ready(true));
                }
            }

            if let Some(batch) = &self.batch {
                if let Some(row) = batch.row(self.current_row) {
                    self.pending = Some(row.clone());
                    return Ok(Progress::Ready(true));
                }
                if self.current_row < batch.begin_row() {
                    // Replay ran off the buffered window; the rows up to the
                    // furthest position were skipped by a forward move.
                    let resume = self.furthest_row.max(batch.begin_row());
                    trace!(row = self.current_row, resume, "replay resumes past skipped rows");
                    self.current_row = resume;
                    continue;
                }
                if batch.is_terminal() {
                    self.done = true;
                }
                self.batch = None;
            }

            if self.done {
                return Ok(Progress::Ready(false));
            }

            let batch = ready!(self.producer.next_batch()?);
            trace!(batch = %batch, row = self.current_row, "iterator fetched batch");
            if let Some(backing) = self.backing.as_mut().filter(|b| !b.save_on_mark) {
                backing.capture(batch.begin_row(), batch.rows())?;
            }
            self.batch = Some(batch);
        }
    }

    /// Returns the next row, or `None` at the end of the stream.
    pub fn next_tuple(&mut self) -> ConfluxResult<Progress<Option<Row>>> {
        if !ready!(self.has_next()?) {
            return Ok(Progress::Ready(None));
        }
        let Some(row) = self.pending.take() else {
            return Err(ConfluxError::internal("has_next reported a row but none is pending"));
        };

        let row_number = self.current_row;
        if self.mark_active {
            if let Some(backing) = self.backing.as_mut().filter(|b| b.save_on_mark) {
                if let Err(e) = backing.capture(row_number, std::slice::from_ref(&row)) {
                    self.pending = Some(row);
                    return Err(e);
                }
            }
        }
        self.current_row += 1;
        self.furthest_row = self.furthest_row.max(self.current_row);
        Ok(Progress::Ready(Some(row)))
    }

    /// Attaches an empty buffer to capture rows for replay.
    ///
    /// In continuous mode a batch already held is captured at once.
    pub fn set_buffer(
        &mut self,
        buffer: TupleBufferRef,
        save_on_mark: bool,
    ) -> ConfluxResult<()> {
        if self.backing.is_some() {
            return Err(ConfluxError::invalid_argument(
                "a backing buffer is already attached",
            ));
        }
        if buffer.row_count() != 0 {
            return Err(ConfluxError::invalid_argument(format!(
                "backing buffer {} is not empty",
                buffer.id()
            )));
        }

        let mut backing = Backing {
            buffer,
            save_on_mark,
            base: self.current_row - 1,
        };
        if !save_on_mark {
            if let Some(batch) = &self.batch {
                backing.base = batch.begin_row() - 1;
                backing.capture(batch.begin_row(), batch.rows())?;
            }
        }
        debug!(buffer = %backing.buffer.id(), save_on_mark, "attached backing buffer");
        self.backing = Some(backing);
        Ok(())
    }

    /// Records the current row as the point [`reset`](Self::reset) returns to.
    ///
    /// In save-on-mark mode, marking past the buffered rows discards them
    /// and capture restarts here.
    pub fn mark(&mut self) -> ConfluxResult<()> {
        self.mark_row = self.current_row;
        self.mark_active = true;
        if let Some(backing) = self.backing.as_mut() {
            if backing.save_on_mark && self.current_row > backing.high_water() {
                backing.restart_at(self.current_row)?;
            }
        }
        trace!(row = self.mark_row, "marked iterator");
        Ok(())
    }

    /// Returns to the last marked row, or row 1 if never marked.
    ///
    /// Fails with an unsupported-operation error when no backing buffer is
    /// attached, and when the marked row is no longer held.
    pub fn reset(&mut self) -> ConfluxResult<()> {
        if self.backing.is_none() {
            return Err(ConfluxError::not_supported("reset without a backing buffer"));
        }
        debug!(row = self.mark_row, "resetting iterator to mark");
        self.set_position(self.mark_row)
    }

    /// Moves so that the next row returned is `row_number`.
    ///
    /// Forward moves always succeed. Backward moves must land in the held
    /// batch or in the buffered rows.
    pub fn set_position(&mut self, row_number: u64) -> ConfluxResult<()> {
        if row_number == 0 {
            return Err(ConfluxError::invalid_argument("row numbers are 1-based"));
        }
        if row_number == self.current_row {
            return Ok(());
        }
        if row_number < self.current_row {
            let in_batch = self.batch.as_ref().is_some_and(|b| b.contains(row_number));
            let buffered = self.backing.as_ref().is_some_and(|b| b.covers(row_number));
            if !in_batch && !buffered {
                return Err(ConfluxError::not_supported(format!(
                    "moving back to row {} without a buffer covering it",
                    row_number
                )));
            }
        }
        self.pending = None;
        self.current_row = row_number;
        self.furthest_row = self.furthest_row.max(row_number);
        Ok(())
    }

    /// Number of rows that can be returned without asking the producer.
    pub fn available(&self) -> u64 {
        if let Some(backing) = self.backing.as_ref().filter(|b| b.covers(self.current_row)) {
            return backing.high_water() - self.current_row + 1;
        }
        match &self.batch {
            Some(batch) if batch.contains(self.current_row) => {
                batch.end_row() - self.current_row + 1
            }
            _ => 0,
        }
    }

    /// Removes the backing buffer, if any, and ends iteration.
    pub fn close_source(&mut self) {
        if let Some(backing) = self.backing.take() {
            backing.buffer.remove();
            debug!(buffer = %backing.buffer.id(), "removed backing buffer");
        }
        self.batch = None;
        self.pending = None;
        self.done = true;
    }

    /// Row number of the next row to return.
    pub fn current_row(&self) -> u64 {
        self.current_row
    }

    /// Row number [`reset`](Self::reset) returns to.
    pub fn mark_row(&self) -> u64 {
        self.mark_row
    }

    /// Returns the backing buffer, if attached.
    pub fn buffer(&self) -> Option<&TupleBufferRef> {
        self.backing.as_ref().map(|b| &b.buffer)
    }
}

impl<P: BatchProducer> TupleSource for BatchIterator<P> {
    fn schema(&self) -> &Arc<Schema> {
        self.producer.output_schema()
    }

    fn next_tuple(&mut self) -> ConfluxResult<Progress<Option<Row>>> {
        BatchIterator::next_tuple(self)
    }

    fn close_source(&mut self) {
        BatchIterator::close_source(self)
    }
}

impl<P> std::fmt::Debug for BatchIterator<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchIterator")
            .field("current_row", &self.current_row)
            .field("batch", &self.batch.as_ref().map(ToString::to_string))
            .field("done", &self.done)
            .field("mark_row", &self.mark_row)
            .field("backing", &self.backing)
            .finish()
    }
}
