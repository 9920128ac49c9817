//! Full materialization of a producer into a buffer.

use std::sync::Arc;

use conflux_buffer::{BufferKind, BufferManager, TupleBufferRef};
use conflux_common::types::TupleBatch;
use conflux_common::ConfluxResult;
use tracing::{debug, trace};

use crate::producer::{BatchHandler, BatchProducer};
use crate::progress::Progress;
use crate::ready;

/// Drains a producer into a destination buffer.
///
/// Used for nested executions that need their complete result before the
/// caller can continue. The destination is sealed when the terminal batch
/// has been flushed.
pub struct BatchCollector<P> {
    producer: P,
    buffer: TupleBufferRef,
    handler: Option<Box<dyn BatchHandler>>,
    row_count: u64,
    collected: bool,
    done: bool,
}

impl<P: BatchProducer> BatchCollector<P> {
    /// Creates a collector writing into `buffer`, which must be empty.
    pub fn new(producer: P, buffer: TupleBufferRef) -> Self {
        Self {
            producer,
            buffer,
            handler: None,
            row_count: 0,
            collected: false,
            done: false,
        }
    }

    /// Creates a collector writing into a fresh buffer from `manager`.
    pub fn with_manager(producer: P, manager: &dyn BufferManager) -> ConfluxResult<Self> {
        let schema = Arc::clone(producer.output_schema());
        let buffer = manager.create_tuple_buffer(schema, BufferKind::Processor)?;
        Ok(Self::new(producer, buffer))
    }

    /// Sets a callback invoked for every non-empty or terminal batch.
    #[must_use]
    pub fn with_handler(mut self, handler: impl BatchHandler + 'static) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Pulls batches until the terminal batch and returns the sealed buffer.
    ///
    /// Not-ready results from the producer are passed through; every batch
    /// received before one is already in the buffer, so the call can simply
    /// be repeated.
    pub fn collect_tuples(&mut self) -> ConfluxResult<Progress<TupleBufferRef>> {
        while !self.done {
            let batch = ready!(self.producer.next_batch()?);
            self.flush_batch(&batch)?;
            if batch.is_terminal() {
                self.buffer.seal()?;
                self.done = true;
                debug!(buffer = %self.buffer.id(), rows = self.row_count, "collected all tuples");
            }
        }
        Ok(Progress::Ready(Arc::clone(&self.buffer)))
    }

    fn flush_batch(&mut self, batch: &TupleBatch) -> ConfluxResult<()> {
        trace!(batch = %batch, "collecting batch");
        if !batch.is_empty() {
            for (row_number, row) in batch.numbered_rows() {
                self.buffer.append_tuple(row.clone(), row_number)?;
            }
            self.row_count = batch.end_row();
            self.collected = true;
        }
        if !batch.is_empty() || batch.is_terminal() {
            if let Some(handler) = self.handler.as_mut() {
                handler.on_batch(batch)?;
            }
        }
        Ok(())
    }

    /// Returns whether any row was collected since the last call, and
    /// clears the flag.
    pub fn collected_any(&mut self) -> bool {
        std::mem::take(&mut self.collected)
    }

    /// Returns the number of rows collected so far.
    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    /// Returns true once the terminal batch was collected.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Returns the destination buffer.
    pub fn buffer(&self) -> &TupleBufferRef {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conflux_buffer::{BufferState, MemoryBufferManager, TupleBufferExt};
    use conflux_common::config::BufferConfig;
    use conflux_common::types::{Row, Schema, Value};

    use crate::testing::{rows, ScriptedProducer, Step};

    #[test]
    fn test_collect_two_batches() {
        let producer = ScriptedProducer::new(vec![
            Step::batch(1, 3, false),
            Step::batch(4, 4, true),
        ]);
        let manager = MemoryBufferManager::default();
        let mut collector = BatchCollector::with_manager(producer, &manager).unwrap();

        let buffer = collector.collect_tuples().unwrap().ready().unwrap();
        assert_eq!(buffer.state(), BufferState::Sealed);
        assert_eq!(buffer.row_count(), 4);
        assert_eq!(collector.row_count(), 4);
        assert!(collector.is_done());

        let mut cursor = buffer.create_cursor();
        for expected in rows(1, 4) {
            assert_eq!(cursor.next_tuple().unwrap(), Some(expected));
        }
    }

    #[test]
    fn test_not_ready_keeps_flushed_rows() {
        let producer = ScriptedProducer::new(vec![
            Step::batch(1, 2, false),
            Step::NotReady,
            Step::batch(3, 3, true),
        ]);
        let manager = MemoryBufferManager::default();
        let mut collector = BatchCollector::with_manager(producer, &manager).unwrap();

        assert!(collector.collect_tuples().unwrap().is_not_ready());
        assert!(collector.collected_any());
        assert!(!collector.collected_any());
        assert_eq!(collector.buffer().row_count(), 2);
        assert!(!collector.is_done());

        let buffer = collector.collect_tuples().unwrap().ready().unwrap();
        assert_eq!(buffer.row_count(), 3);
        assert!(collector.collected_any());

        // Already done: no further producer calls.
        assert!(collector.collect_tuples().unwrap().is_ready());
    }

    #[test]
    fn test_handler_sees_terminal_empty_batch() {
        let producer = ScriptedProducer::new(vec![
            Step::batch(1, 2, false),
            Step::Batch(TupleBatch::new(3, Vec::new(), false)),
            Step::Batch(TupleBatch::terminal(2)),
        ]);
        let manager = MemoryBufferManager::new(BufferConfig::default());
        let (tx, rx) = std::sync::mpsc::channel();
        let mut collector = BatchCollector::with_manager(producer, &manager)
            .unwrap()
            .with_handler(move |batch: &TupleBatch| -> ConfluxResult<()> {
                tx.send((batch.begin_row(), batch.row_count(), batch.is_terminal()))
                    .ok();
                Ok(())
            });

        collector.collect_tuples().unwrap();
        let seen: Vec<_> = rx.try_iter().collect();
        assert_eq!(seen, vec![(1, 2, false), (3, 0, true)]);
    }

    #[test]
    fn test_failure_propagates() {
        let producer = ScriptedProducer::new(vec![
            Step::batch(1, 1, false),
            Step::Fail("source offline"),
        ]);
        let manager = MemoryBufferManager::default();
        let mut collector = BatchCollector::with_manager(producer, &manager).unwrap();
        let err = collector.collect_tuples().err().unwrap();
        assert!(err.to_string().contains("source offline"));
        assert!(!collector.is_done());
    }

    #[test]
    fn test_caller_supplied_buffer() {
        let manager = MemoryBufferManager::default();
        let buffer = manager
            .create_tuple_buffer(Arc::new(Schema::empty()), BufferKind::Processor)
            .unwrap();
        let producer = ScriptedProducer::new(vec![Step::Batch(TupleBatch::new(
            1,
            vec![Row::new(vec![Value::string("a")])],
            true,
        ))]);
        let mut collector = BatchCollector::new(producer, Arc::clone(&buffer));
        collector.collect_tuples().unwrap();
        assert_eq!(buffer.row(1).unwrap(), Row::new(vec![Value::string("a")]));
    }
}
