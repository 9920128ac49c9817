//! Producer and plan contracts.

use std::fmt;
use std::sync::Arc;

use conflux_buffer::BufferManager;
use conflux_common::types::{Row, Schema, TupleBatch};
use conflux_common::{ConfluxError, ConfluxResult};

use crate::context::CommandContext;
use crate::data_manager::ProcessorDataManager;
use crate::progress::Progress;

/// Supplies the batches of one result stream.
///
/// Batches are contiguous and start at row 1. Exactly one batch is
/// terminal and nothing is requested after it. A producer that returns
/// [`Progress::NotReady`] must return the same batch when asked again.
pub trait BatchProducer: Send {
    /// Produces the next batch.
    fn next_batch(&mut self) -> ConfluxResult<Progress<TupleBatch>>;

    /// Returns the row shape, fixed for the producer's lifetime.
    fn output_schema(&self) -> &Arc<Schema>;
}

impl<P: BatchProducer + ?Sized> BatchProducer for Box<P> {
    fn next_batch(&mut self) -> ConfluxResult<Progress<TupleBatch>> {
        (**self).next_batch()
    }

    fn output_schema(&self) -> &Arc<Schema> {
        (**self).output_schema()
    }
}

/// A non-fatal annotation reported by a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Component that raised the warning.
    pub source: String,
    /// Human-readable message.
    pub message: String,
}

impl Warning {
    /// Creates a warning.
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.message)
    }
}

/// A top-level plan driven by a [`QueryProcessor`](crate::QueryProcessor).
///
/// Lifecycle: `initialize` once, `open` until ready, `next_batch` until
/// the terminal batch, then `close`. `close` may be called without a prior
/// `open` and must tolerate being the only call after `initialize`.
pub trait ProcessorPlan: BatchProducer {
    /// Wires the plan to the resources of its execution.
    fn initialize(
        &mut self,
        _context: Arc<CommandContext>,
        _data_manager: Arc<dyn ProcessorDataManager>,
        _buffer_manager: Arc<dyn BufferManager>,
    ) -> ConfluxResult<()> {
        Ok(())
    }

    /// Opens the plan. Retried while it returns `NotReady`.
    fn open(&mut self) -> ConfluxResult<Progress<()>> {
        Ok(Progress::Ready(()))
    }

    /// Releases the plan's resources.
    fn close(&mut self) -> ConfluxResult<()> {
        Ok(())
    }

    /// Returns and clears the warnings collected so far.
    fn take_warnings(&mut self) -> Vec<Warning> {
        Vec::new()
    }
}

impl<P: ProcessorPlan + ?Sized> ProcessorPlan for Box<P> {
    fn initialize(
        &mut self,
        context: Arc<CommandContext>,
        data_manager: Arc<dyn ProcessorDataManager>,
        buffer_manager: Arc<dyn BufferManager>,
    ) -> ConfluxResult<()> {
        (**self).initialize(context, data_manager, buffer_manager)
    }

    fn open(&mut self) -> ConfluxResult<Progress<()>> {
        (**self).open()
    }

    fn close(&mut self) -> ConfluxResult<()> {
        (**self).close()
    }

    fn take_warnings(&mut self) -> Vec<Warning> {
        (**self).take_warnings()
    }
}

/// Receives every non-empty or terminal batch as it is flushed.
pub trait BatchHandler: Send {
    /// Called synchronously with the flushed batch.
    fn on_batch(&mut self, batch: &TupleBatch) -> ConfluxResult<()>;
}

impl<F> BatchHandler for F
where
    F: FnMut(&TupleBatch) -> ConfluxResult<()> + Send,
{
    fn on_batch(&mut self, batch: &TupleBatch) -> ConfluxResult<()> {
        self(batch)
    }
}

/// Serves a fixed set of rows in batches of `batch_size`.
///
/// Used for constant results and for replaying rows that are already
/// materialized.
#[derive(Debug)]
pub struct VecProducer {
    schema: Arc<Schema>,
    rows: std::vec::IntoIter<Row>,
    batch_size: usize,
    next_row: u64,
    finished: bool,
}

impl VecProducer {
    /// Creates a producer over `rows`.
    pub fn new(schema: Arc<Schema>, rows: Vec<Row>, batch_size: usize) -> Self {
        Self {
            schema,
            rows: rows.into_iter(),
            batch_size: batch_size.max(1),
            next_row: 1,
            finished: false,
        }
    }

    /// Creates a producer over `rows` using the batch size of `manager`.
    pub fn with_manager(
        schema: Arc<Schema>,
        rows: Vec<Row>,
        manager: &dyn BufferManager,
    ) -> Self {
        Self::new(schema, rows, manager.batch_size())
    }
}

impl BatchProducer for VecProducer {
    fn next_batch(&mut self) -> ConfluxResult<Progress<TupleBatch>> {
        if self.finished {
            return Err(ConfluxError::internal(
                "batch requested after the terminal batch",
            ));
        }
        let rows: Vec<Row> = self.rows.by_ref().take(self.batch_size).collect();
        let terminal = self.rows.as_slice().is_empty();
        let batch = TupleBatch::new(self.next_row, rows, terminal);
        self.next_row += batch.row_count() as u64;
        self.finished = terminal;
        Ok(Progress::Ready(batch))
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}

impl ProcessorPlan for VecProducer {}
