//! Configuration for conflux.
//!
//! This module provides configuration structures for the processor and the
//! buffer manager.

mod engine;

pub use engine::{BufferConfig, EngineConfig, ProcessorConfig, RetryPolicy};
