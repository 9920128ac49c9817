//! Scripted producers for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use conflux_common::types::{Column, DataType, Row, Schema, TupleBatch, Value};
use conflux_common::{ConfluxError, ConfluxResult};

use crate::producer::{BatchProducer, ProcessorPlan, Warning};
use crate::progress::Progress;

pub(crate) fn rows(begin: u64, end: u64) -> Vec<Row> {
    (begin..=end)
        .map(|i| Row::new(vec![Value::bigint(i as i64)]))
        .collect()
}

pub(crate) fn schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![Column::new("n", DataType::BigInt)]))
}

pub(crate) enum Step {
    Batch(TupleBatch),
    NotReady,
    /// Fails with a processing error.
    Fail(&'static str),
    /// Fails with an internal error.
    Crash(&'static str),
}

impl Step {
    pub(crate) fn batch(begin: u64, end: u64, terminal: bool) -> Self {
        Step::Batch(TupleBatch::new(begin, rows(begin, end), terminal))
    }
}

pub(crate) struct ScriptedProducer {
    schema: Arc<Schema>,
    steps: VecDeque<Step>,
    pub(crate) open_not_ready: usize,
    pub(crate) fail_close: bool,
    pub(crate) warnings: Vec<Warning>,
    pub(crate) closes: Arc<AtomicUsize>,
    pub(crate) calls: Arc<AtomicUsize>,
}

impl ScriptedProducer {
    pub(crate) fn new(steps: Vec<Step>) -> Self {
        Self {
            schema: schema(),
            steps: steps.into(),
            open_not_ready: 0,
            fail_close: false,
            warnings: Vec::new(),
            closes: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A producer of `total` rows in batches of `size`.
    pub(crate) fn sequential(total: u64, size: u64) -> Self {
        let mut steps = Vec::new();
        let mut begin = 1;
        while begin + size <= total {
            steps.push(Step::batch(begin, begin + size - 1, false));
            begin += size;
        }
        steps.push(Step::batch(begin, total, true));
        Self::new(steps)
    }
}

impl BatchProducer for ScriptedProducer {
    fn next_batch(&mut self) -> ConfluxResult<Progress<TupleBatch>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.steps.pop_front() {
            Some(Step::Batch(batch)) => Ok(Progress::Ready(batch)),
            Some(Step::NotReady) => Ok(Progress::NotReady),
            Some(Step::Fail(message)) => Err(ConfluxError::processing(message)),
            Some(Step::Crash(message)) => Err(ConfluxError::internal(message)),
            None => Err(ConfluxError::internal("script exhausted")),
        }
    }

    fn output_schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}

impl ProcessorPlan for ScriptedProducer {
    fn open(&mut self) -> ConfluxResult<Progress<()>> {
        if self.open_not_ready > 0 {
            self.open_not_ready -= 1;
            return Ok(Progress::NotReady);
        }
        Ok(Progress::Ready(()))
    }

    fn close(&mut self) -> ConfluxResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(ConfluxError::component("close failed"));
        }
        Ok(())
    }

    fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }
}
