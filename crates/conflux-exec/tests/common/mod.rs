//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use conflux_buffer::{BufferManager, MemoryBufferManager, TupleBufferExt, TupleBufferRef};
use conflux_common::types::{
    Column, ConnectionId, DataType, ProcessId, Row, Schema, TupleBatch, Value,
};
use conflux_common::{ConfluxError, ConfluxResult};
use conflux_exec::{
    BatchProducer, CommandContext, NullDataManager, ProcessorDataManager, ProcessorPlan, Progress,
    QueryProcessor,
};

/// Row `n` of every test stream: `(n, "row-n")`.
pub fn row(n: u64) -> Row {
    Row::new(vec![Value::bigint(n as i64), Value::string(format!("row-{}", n))])
}

pub fn rows(begin: u64, end: u64) -> Vec<Row> {
    (begin..=end).map(row).collect()
}

pub fn schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Column::new("id", DataType::BigInt),
        Column::new("label", DataType::Text),
    ]))
}

pub fn context(process: u64) -> Arc<CommandContext> {
    Arc::new(
        CommandContext::new(ProcessId::new(process), ConnectionId::new(1))
            .with_user("tester")
            .with_vdb("integration"),
    )
}

/// A producer that replays a fixed batch layout.
///
/// Batch `i` holds `sizes[i]` rows; the last batch is terminal. Before every
/// batch whose index is in `stalls`, one `NotReady` is returned first.
pub struct ScriptedPlan {
    schema: Arc<Schema>,
    batches: VecDeque<TupleBatch>,
    stalls: BTreeSet<usize>,
    next_index: usize,
    stalled: bool,
    pub calls: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
}

impl ScriptedPlan {
    pub fn new(sizes: &[usize]) -> Self {
        let mut batches = VecDeque::new();
        let mut begin = 1u64;
        for (i, size) in sizes.iter().enumerate() {
            let size = *size as u64;
            let terminal = i + 1 == sizes.len();
            batches.push_back(TupleBatch::new(begin, rows(begin, begin + size - 1), terminal));
            begin += size;
        }
        if batches.is_empty() {
            batches.push_back(TupleBatch::terminal(0));
        }
        Self {
            schema: schema(),
            batches,
            stalls: BTreeSet::new(),
            next_index: 0,
            stalled: false,
            calls: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns `NotReady` once before each batch index in `stalls`.
    pub fn with_stalls(mut self, stalls: impl IntoIterator<Item = usize>) -> Self {
        self.stalls = stalls.into_iter().collect();
        self
    }

    pub fn total_rows(sizes: &[usize]) -> u64 {
        sizes.iter().map(|s| *s as u64).sum()
    }
}

impl BatchProducer for ScriptedPlan {
    fn next_batch(&mut self) -> ConfluxResult<Progress<TupleBatch>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.stalled && self.stalls.contains(&self.next_index) {
            self.stalled = true;
            return Ok(Progress::NotReady);
        }
        let Some(batch) = self.batches.pop_front() else {
            return Err(ConfluxError::internal(
                "batch requested after the terminal batch",
            ));
        };
        self.next_index += 1;
        self.stalled = false;
        Ok(Progress::Ready(batch))
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}

impl ProcessorPlan for ScriptedPlan {
    fn close(&mut self) -> ConfluxResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Builds a processor over `plan` with in-memory buffers and no data tier.
pub fn processor(plan: impl ProcessorPlan + 'static) -> QueryProcessor {
    processor_with(plan, Arc::new(NullDataManager))
}

pub fn processor_with(
    plan: impl ProcessorPlan + 'static,
    data_manager: Arc<dyn ProcessorDataManager>,
) -> QueryProcessor {
    let buffers: Arc<dyn BufferManager> = Arc::new(MemoryBufferManager::default());
    QueryProcessor::new(Box::new(plan), context(7), buffers, data_manager)
        .expect("processor should be created")
}

/// Reads every row of a buffer in order.
pub fn buffer_rows(buffer: &TupleBufferRef) -> Vec<Row> {
    let mut cursor = buffer.create_cursor();
    let mut out = Vec::with_capacity(buffer.row_count() as usize);
    while let Some(row) = cursor.next_tuple().expect("buffer should be readable") {
        out.push(row);
    }
    out
}
