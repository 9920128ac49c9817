//! Top-level query driver.
//!
//! A [`QueryProcessor`] owns one plan and one destination buffer. Each call
//! to [`process`](QueryProcessor::process) runs the plan for at most one
//! time slice, flushing every batch into the destination as it arrives. The
//! destination is sealed exactly once, whether the plan completes, is
//! closed early, is cancelled or fails.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use conflux_buffer::{BufferKind, BufferManager, SealOnce, TupleBufferRef};
use conflux_common::config::{ProcessorConfig, RetryPolicy};
use conflux_common::types::{ProcessId, Schema, TupleBatch};
use conflux_common::{ConfluxError, ConfluxResult};
use tracing::{debug, trace, warn};

use crate::context::CommandContext;
use crate::data_manager::ProcessorDataManager;
use crate::producer::{BatchHandler, ProcessorPlan, Warning};
use crate::progress::Progress;
use crate::ready;

/// Thread-safe handle for signalling a running processor.
#[derive(Debug, Clone)]
pub struct ProcessorHandle {
    process_id: ProcessId,
    canceled: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl ProcessorHandle {
    fn new(process_id: ProcessId) -> Self {
        Self {
            process_id,
            canceled: Arc::new(AtomicBool::new(false)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the process id of the processor.
    pub fn process_id(&self) -> ProcessId {
        self.process_id
    }

    /// Asks the processor to fail with a cancellation error at its next
    /// state check.
    pub fn request_canceled(&self) {
        self.canceled.store(true, Ordering::Release);
    }

    /// Asks the processor to stop as if the plan had completed.
    pub fn request_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Returns true if cancellation was requested.
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }

    /// Returns true if an early close was requested.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Counters describing a processor's work so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessorMetrics {
    /// Batches flushed.
    pub batches: u64,
    /// Rows flushed.
    pub rows: u64,
    /// Calls to `process`.
    pub slices: u64,
    /// Slices that ended because the plan was not ready.
    pub not_ready: u64,
    /// Wall time spent inside `process`.
    pub elapsed: Duration,
}

/// Drives one plan to completion in time-boxed slices.
pub struct QueryProcessor {
    plan: Box<dyn ProcessorPlan>,
    context: Arc<CommandContext>,
    destination: SealOnce,
    handle: ProcessorHandle,
    handler: Option<Box<dyn BatchHandler>>,
    retry_policy: RetryPolicy,
    time_slice: Duration,
    opened: bool,
    plan_closed: bool,
    done: bool,
    high_row: u64,
    metrics: ProcessorMetrics,
}

impl QueryProcessor {
    /// Wires `plan` to its resources and allocates the destination buffer.
    ///
    /// Fails with a component error if the buffer cannot be allocated.
    pub fn new(
        mut plan: Box<dyn ProcessorPlan>,
        context: Arc<CommandContext>,
        buffer_manager: Arc<dyn BufferManager>,
        data_manager: Arc<dyn ProcessorDataManager>,
    ) -> ConfluxResult<Self> {
        plan.initialize(Arc::clone(&context), data_manager, Arc::clone(&buffer_manager))
            .map_err(ConfluxError::into_boundary)?;

        let schema = Arc::clone(plan.output_schema());
        let buffer = buffer_manager.create_tuple_buffer(schema, BufferKind::Final)?;
        debug!(process = %context.process_id(), buffer = %buffer.id(), "created query processor");

        let config = ProcessorConfig::default();
        Ok(Self {
            plan,
            handle: ProcessorHandle::new(context.process_id()),
            context,
            destination: SealOnce::new(buffer),
            handler: None,
            retry_policy: config.retry_policy(),
            time_slice: config.time_slice(),
            opened: false,
            plan_closed: false,
            done: false,
            high_row: 0,
            metrics: ProcessorMetrics::default(),
        })
    }

    /// Applies the time slice and retry policy from `config`.
    #[must_use]
    pub fn with_config(mut self, config: &ProcessorConfig) -> Self {
        self.retry_policy = config.retry_policy();
        self.time_slice = config.time_slice();
        self
    }

    /// Sets the policy used by [`process_blocking`](Self::process_blocking).
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Sets a callback invoked for every non-empty or terminal batch.
    #[must_use]
    pub fn with_batch_handler(mut self, handler: impl BatchHandler + 'static) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Runs the plan for one slice of the configured length.
    pub fn process_slice(&mut self) -> ConfluxResult<Progress<bool>> {
        self.process(self.time_slice)
    }

    /// Runs the plan until it completes, `time_slice` elapses or the plan
    /// is not ready.
    ///
    /// Returns `Ready(true)` when the plan finished or was closed,
    /// `Ready(false)` when the slice ran out. `NotReady` leaves all state in
    /// place; call again later. On error the plan is closed and the
    /// destination sealed before the error is returned.
    pub fn process(&mut self, time_slice: Duration) -> ConfluxResult<Progress<bool>> {
        if self.done {
            return Ok(Progress::Ready(true));
        }
        let started = Instant::now();
        self.metrics.slices += 1;
        let result = self.run_slice(started, time_slice);
        self.metrics.elapsed += started.elapsed();

        match result {
            Ok(Progress::NotReady) => {
                self.metrics.not_ready += 1;
                trace!(process = %self.handle.process_id, "plan not ready");
                Ok(Progress::NotReady)
            }
            Ok(ready) => Ok(ready),
            Err(e) => {
                let e = e.into_boundary();
                debug!(process = %self.handle.process_id, error = %e, "processing failed");
                self.close_processing();
                Err(e)
            }
        }
    }

    fn run_slice(
        &mut self,
        started: Instant,
        time_slice: Duration,
    ) -> ConfluxResult<Progress<bool>> {
        if !self.opened {
            ready!(self.plan.open()?);
            self.opened = true;
            debug!(process = %self.handle.process_id, "opened plan");
        }

        loop {
            if self.handle.is_canceled() {
                return Err(ConfluxError::cancelled(self.handle.process_id));
            }
            if self.handle.is_closed() {
                debug!(process = %self.handle.process_id, "closed on request");
                self.close_processing();
                return Ok(Progress::Ready(true));
            }

            let batch = ready!(self.plan.next_batch()?);
            self.flush_batch(&batch)?;

            if batch.is_terminal() {
                self.close_processing();
                return Ok(Progress::Ready(true));
            }
            if started.elapsed() >= time_slice {
                return Ok(Progress::Ready(false));
            }
        }
    }

    fn flush_batch(&mut self, batch: &TupleBatch) -> ConfluxResult<()> {
        trace!(process = %self.handle.process_id, batch = %batch, "flushing batch");
        if !batch.is_empty() {
            self.destination.buffer().append_batch(batch, true)?;
            self.high_row = batch.end_row();
            self.metrics.rows += batch.row_count() as u64;
        }
        self.metrics.batches += 1;
        if !batch.is_empty() || batch.is_terminal() {
            if let Some(handler) = self.handler.as_mut() {
                handler.on_batch(batch)?;
            }
        }
        Ok(())
    }

    /// Runs the plan to completion, sleeping between not-ready results as
    /// the retry policy prescribes.
    pub fn process_blocking(&mut self) -> ConfluxResult<()> {
        let mut attempt = 0u32;
        loop {
            let rows_before = self.metrics.rows;
            match self.process(Duration::MAX)? {
                Progress::Ready(true) => return Ok(()),
                Progress::Ready(false) => attempt = 0,
                Progress::NotReady => {
                    if self.metrics.rows != rows_before {
                        attempt = 0;
                    }
                    let delay = self.retry_policy.delay(attempt);
                    trace!(process = %self.handle.process_id, ?delay, "waiting for plan");
                    thread::sleep(delay);
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }

    /// Closes the plan and seals the destination.
    ///
    /// Idempotent. The destination is sealed even if closing the plan fails.
    pub fn close_processing(&mut self) {
        self.done = true;
        if !self.plan_closed {
            self.plan_closed = true;
            match self.plan.close() {
                Ok(()) => debug!(process = %self.handle.process_id, "closed plan"),
                Err(e) => {
                    warn!(process = %self.handle.process_id, error = %e, "failed to close plan")
                }
            }
        }
        if let Err(e) = self.destination.seal() {
            warn!(process = %self.handle.process_id, error = %e, "failed to seal results");
        }
    }

    /// Requests cancellation. See [`ProcessorHandle::request_canceled`].
    pub fn request_canceled(&self) {
        self.handle.request_canceled();
    }

    /// Requests an early close. See [`ProcessorHandle::request_closed`].
    pub fn request_closed(&self) {
        self.handle.request_closed();
    }

    /// Returns a handle that can signal this processor from another thread.
    pub fn handle(&self) -> ProcessorHandle {
        self.handle.clone()
    }

    /// Returns the destination buffer.
    pub fn buffer(&self) -> &TupleBufferRef {
        self.destination.buffer()
    }

    /// Returns the highest row number flushed so far.
    pub fn high_row(&self) -> u64 {
        self.high_row
    }

    /// Returns and clears the plan's warnings.
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        self.plan.take_warnings()
    }

    /// Returns the shape of the result rows.
    pub fn schema(&self) -> &Arc<Schema> {
        self.plan.output_schema()
    }

    /// Returns the execution context.
    pub fn context(&self) -> &Arc<CommandContext> {
        &self.context
    }

    /// Returns true once processing has ended for any reason.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Returns the work counters.
    pub fn metrics(&self) -> ProcessorMetrics {
        self.metrics
    }
}

impl Drop for QueryProcessor {
    fn drop(&mut self) {
        self.close_processing();
    }
}

impl std::fmt::Debug for QueryProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryProcessor")
            .field("process_id", &self.handle.process_id)
            .field("buffer", &self.destination.buffer().id())
            .field("high_row", &self.high_row)
            .field("done", &self.done)
            .finish()
    }
}
