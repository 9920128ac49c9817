//! # conflux-exec
//!
//! Batch-driven query processing for conflux.
//!
//! Plans produce [`TupleBatch`](conflux_common::types::TupleBatch)es: runs
//! of contiguously numbered rows, the last of which is flagged terminal. A
//! producer that cannot make progress without blocking returns
//! [`Progress::NotReady`] instead, and the caller retries later.
//!
//! ```text
//!                 ┌────────────────────┐
//!   plan ──────▶  │   QueryProcessor   │ ──▶ destination buffer (Final)
//!                 └────────────────────┘
//!   nested plan ─▶ BatchCollector ──────────▶ sealed buffer (Processor)
//!   child plan ──▶ BatchIterator ───────────▶ row cursor, mark / reset
//! ```
//!
//! The [`TempTableDataManager`] sits in front of the caller's data manager
//! and serves requests against materialized temporary groups from their
//! buffers.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use conflux_buffer::{MemoryBufferManager, TupleBuffer};
//! use conflux_common::types::{ConnectionId, ProcessId, Row, Schema, Value};
//! use conflux_exec::{CommandContext, NullDataManager, Progress, QueryProcessor, VecProducer};
//!
//! let rows: Vec<Row> = (1..=10).map(|i| Row::new(vec![Value::int(i)])).collect();
//! let plan = VecProducer::new(Arc::new(Schema::empty()), rows, 4);
//! let context = CommandContext::new(ProcessId::new(1), ConnectionId::new(1));
//!
//! let mut processor = QueryProcessor::new(
//!     Box::new(plan),
//!     Arc::new(context),
//!     Arc::new(MemoryBufferManager::default()),
//!     Arc::new(NullDataManager),
//! )
//! .unwrap();
//!
//! assert_eq!(processor.process(Duration::from_secs(5)).unwrap(), Progress::Ready(true));
//! assert_eq!(processor.buffer().row_count(), 10);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod collector;
mod context;
mod data_manager;
mod iterator;
mod processor;
mod producer;
mod progress;
mod source;
mod temp_table;

#[cfg(test)]
mod testing;

pub use collector::BatchCollector;
pub use context::CommandContext;
pub use data_manager::{Command, NullDataManager, ProcessorDataManager};
pub use iterator::BatchIterator;
pub use processor::{ProcessorHandle, ProcessorMetrics, QueryProcessor};
pub use producer::{BatchHandler, BatchProducer, ProcessorPlan, VecProducer, Warning};
pub use progress::Progress;
pub use source::{BufferTupleSource, ProducerTupleSource, TupleSource};
pub use temp_table::{TempTableDataManager, TempTableStore};
