//! Row-at-a-time sources.

use std::sync::Arc;

use conflux_buffer::{BufferError, BufferState, TupleBufferExt, TupleBufferRef, TupleCursor};
use conflux_common::types::{Row, Schema, TupleBatch};
use conflux_common::ConfluxResult;

use crate::producer::BatchProducer;
use crate::progress::Progress;
use crate::ready;

/// A pull-style source of rows.
pub trait TupleSource: Send {
    /// Returns the shape of the rows.
    fn schema(&self) -> &Arc<Schema>;

    /// Returns the next row, `None` at the end of the stream.
    fn next_tuple(&mut self) -> ConfluxResult<Progress<Option<Row>>>;

    /// Releases the source. Safe to call more than once.
    fn close_source(&mut self);
}

impl<S: TupleSource + ?Sized> TupleSource for Box<S> {
    fn schema(&self) -> &Arc<Schema> {
        (**self).schema()
    }

    fn next_tuple(&mut self) -> ConfluxResult<Progress<Option<Row>>> {
        (**self).next_tuple()
    }

    fn close_source(&mut self) {
        (**self).close_source()
    }
}

/// Reads the rows of a buffer.
///
/// While the buffer is still open, running out of rows is reported as
/// not ready; once it is sealed the stream ends.
#[derive(Debug)]
pub struct BufferTupleSource {
    schema: Arc<Schema>,
    cursor: TupleCursor,
    closed: bool,
}

impl BufferTupleSource {
    /// Creates a source positioned before the buffer's first row.
    pub fn new(buffer: &TupleBufferRef) -> Self {
        Self {
            schema: Arc::clone(buffer.schema()),
            cursor: buffer.create_cursor(),
            closed: false,
        }
    }
}

impl TupleSource for BufferTupleSource {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn next_tuple(&mut self) -> ConfluxResult<Progress<Option<Row>>> {
        if self.closed {
            return Ok(Progress::Ready(None));
        }
        let buffer = self.cursor.buffer();
        match buffer.state() {
            BufferState::Removed => return Err(BufferError::removed(buffer.id()).into()),
            BufferState::Open if !self.cursor.has_next() => return Ok(Progress::NotReady),
            _ => {}
        }
        Ok(Progress::Ready(self.cursor.next_tuple()?))
    }

    fn close_source(&mut self) {
        self.closed = true;
    }
}

/// Reads the rows of a producer one at a time, without buffering.
pub struct ProducerTupleSource<P> {
    producer: P,
    batch: Option<TupleBatch>,
    next_row: u64,
    done: bool,
}

impl<P: BatchProducer> ProducerTupleSource<P> {
    /// Wraps a producer positioned at its first row.
    pub fn new(producer: P) -> Self {
        Self {
            producer,
            batch: None,
            next_row: 1,
            done: false,
        }
    }

    /// Returns the wrapped producer.
    pub fn into_inner(self) -> P {
        self.producer
    }
}

impl<P: BatchProducer> TupleSource for ProducerTupleSource<P> {
    fn schema(&self) -> &Arc<Schema> {
        self.producer.output_schema()
    }

    fn next_tuple(&mut self) -> ConfluxResult<Progress<Option<Row>>> {
        loop {
            if let Some(batch) = &self.batch {
                if let Some(row) = batch.row(self.next_row) {
                    let row = row.clone();
                    self.next_row += 1;
                    return Ok(Progress::Ready(Some(row)));
                }
                if batch.is_terminal() {
                    self.done = true;
                }
                self.batch = None;
            }
            if self.done {
                return Ok(Progress::Ready(None));
            }
            let batch = ready!(self.producer.next_batch()?);
            self.batch = Some(batch);
        }
    }

    fn close_source(&mut self) {
        self.batch = None;
        self.done = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conflux_buffer::{BufferKind, MemoryTupleBuffer};
    use conflux_common::types::{BufferId, Value};

    use crate::producer::VecProducer;

    fn row(i: i32) -> Row {
        Row::new(vec![Value::int(i)])
    }

    fn collect(source: &mut dyn TupleSource) -> Vec<Row> {
        let mut rows = Vec::new();
        while let Progress::Ready(Some(row)) = source.next_tuple().unwrap() {
            rows.push(row);
        }
        rows
    }

    #[test]
    fn test_buffer_source_waits_for_seal() {
        let buffer: TupleBufferRef = Arc::new(MemoryTupleBuffer::new(
            BufferId::new(1),
            Arc::new(Schema::empty()),
            BufferKind::Processor,
        ));
        buffer.append_tuple(row(1), 1).unwrap();

        let mut source = BufferTupleSource::new(&buffer);
        assert_eq!(source.next_tuple().unwrap(), Progress::Ready(Some(row(1))));
        assert_eq!(source.next_tuple().unwrap(), Progress::NotReady);

        buffer.append_tuple(row(2), 2).unwrap();
        buffer.seal().unwrap();
        assert_eq!(source.next_tuple().unwrap(), Progress::Ready(Some(row(2))));
        assert_eq!(source.next_tuple().unwrap(), Progress::Ready(None));

        buffer.remove();
        assert!(source.next_tuple().unwrap_err().is_component());
        source.close_source();
        assert_eq!(source.next_tuple().unwrap(), Progress::Ready(None));
    }

    #[test]
    fn test_producer_source() {
        let rows: Vec<Row> = (1..=5).map(row).collect();
        let producer = VecProducer::new(Arc::new(Schema::empty()), rows.clone(), 2);
        let mut source = ProducerTupleSource::new(producer);
        assert_eq!(collect(&mut source), rows);
        assert_eq!(source.next_tuple().unwrap(), Progress::Ready(None));
    }

    #[test]
    fn test_producer_source_close() {
        let producer = VecProducer::new(Arc::new(Schema::empty()), vec![row(1), row(2)], 1);
        let mut source = ProducerTupleSource::new(producer);
        assert_eq!(source.next_tuple().unwrap(), Progress::Ready(Some(row(1))));
        source.close_source();
        source.close_source();
        assert_eq!(source.next_tuple().unwrap(), Progress::Ready(None));
    }
}
