//! Engine configuration structures.
//!
//! These structures define the tunable aspects of query processing and
//! tuple buffering.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfluxError, ConfluxResult};

/// Main engine configuration.
///
/// # Example
///
/// ```rust
/// use conflux_common::config::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert_eq!(config.processor.retry_interval_ms, 50);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Query processor configuration.
    #[serde(default)]
    pub processor: ProcessorConfig,

    /// Tuple buffer configuration.
    #[serde(default)]
    pub buffer: BufferConfig,
}

impl EngineConfig {
    /// Creates a small configuration for testing.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            processor: ProcessorConfig {
                time_slice_ms: 100,
                retry_interval_ms: 1,
                ..Default::default()
            },
            buffer: BufferConfig {
                max_buffers: 64,
                max_rows: 100_000,
                batch_size: 16,
            },
        }
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> ConfluxResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfluxError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> ConfluxResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            warn!(path = %path.display(), error = %e, "cannot read engine configuration");
            ConfluxError::invalid_config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        debug!(
            path = %path.display(),
            batch_size = config.buffer.batch_size,
            time_slice_ms = config.processor.time_slice_ms,
            "loaded engine configuration"
        );
        Ok(config)
    }

    /// Converts configuration to a TOML string.
    pub fn to_toml(&self) -> ConfluxResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfluxError::invalid_config(e.to_string()))
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> ConfluxResult<()> {
        self.processor.validate()?;
        self.buffer.validate()
    }
}

/// Query processor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Time budget of one cooperative processing slice, in milliseconds.
    /// Default: 2000
    #[serde(default = "default_time_slice_ms")]
    pub time_slice_ms: u64,

    /// Initial wait before retrying a plan that was not ready, in
    /// milliseconds. Default: 50
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// Growth factor applied to the retry wait after every consecutive
    /// not-ready result. 1.0 keeps the interval fixed.
    /// Default: 1.0
    #[serde(default = "default_retry_backoff_factor")]
    pub retry_backoff_factor: f64,

    /// Upper bound for the retry wait, in milliseconds.
    /// Default: 1000
    #[serde(default = "default_max_retry_interval_ms")]
    pub max_retry_interval_ms: u64,
}

fn default_time_slice_ms() -> u64 {
    2000
}

fn default_retry_interval_ms() -> u64 {
    50
}

fn default_retry_backoff_factor() -> f64 {
    1.0
}

fn default_max_retry_interval_ms() -> u64 {
    1000
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            time_slice_ms: default_time_slice_ms(),
            retry_interval_ms: default_retry_interval_ms(),
            retry_backoff_factor: default_retry_backoff_factor(),
            max_retry_interval_ms: default_max_retry_interval_ms(),
        }
    }
}

impl ProcessorConfig {
    /// Returns the time slice as a duration.
    pub fn time_slice(&self) -> Duration {
        Duration::from_millis(self.time_slice_ms)
    }

    /// Returns the retry policy described by this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial: Duration::from_millis(self.retry_interval_ms),
            backoff_factor: self.retry_backoff_factor,
            max: Duration::from_millis(self.max_retry_interval_ms),
        }
    }

    fn validate(&self) -> ConfluxResult<()> {
        if self.time_slice_ms == 0 {
            return Err(ConfluxError::invalid_config(
                "processor.time_slice_ms must be positive",
            ));
        }
        if self.retry_backoff_factor.is_nan() || self.retry_backoff_factor < 1.0 {
            return Err(ConfluxError::invalid_config(
                "processor.retry_backoff_factor must be at least 1.0",
            ));
        }
        if self.max_retry_interval_ms < self.retry_interval_ms {
            return Err(ConfluxError::invalid_config(
                "processor.max_retry_interval_ms must not be below retry_interval_ms",
            ));
        }
        Ok(())
    }
}

/// How long a blocking caller waits before retrying a plan that was not ready.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Wait after the first not-ready result.
    pub initial: Duration,
    /// Growth factor per consecutive not-ready result.
    pub backoff_factor: f64,
    /// Upper bound of the wait.
    pub max: Duration,
}

impl RetryPolicy {
    /// A fixed interval with no growth.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            initial: interval,
            backoff_factor: 1.0,
            max: interval,
        }
    }

    /// Returns the wait before retry number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.powi(attempt.min(64) as i32);
        let millis = self.initial.as_secs_f64() * 1000.0 * factor;
        let max_millis = self.max.as_secs_f64() * 1000.0;
        if !millis.is_finite() || millis >= max_millis {
            return self.max.max(self.initial);
        }
        Duration::from_micros((millis * 1000.0).round() as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        ProcessorConfig::default().retry_policy()
    }
}

/// Tuple buffer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Maximum number of live buffers.
    /// Default: 1024
    #[serde(default = "default_max_buffers")]
    pub max_buffers: usize,

    /// Row budget shared by all live buffers.
    /// Default: 10000000
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,

    /// Nominal number of rows per processor batch.
    /// Default: 256
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_max_buffers() -> usize {
    1024
}

fn default_max_rows() -> usize {
    10_000_000
}

fn default_batch_size() -> usize {
    256
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            max_buffers: default_max_buffers(),
            max_rows: default_max_rows(),
            batch_size: default_batch_size(),
        }
    }
}

impl BufferConfig {
    fn validate(&self) -> ConfluxResult<()> {
        if self.max_buffers == 0 {
            return Err(ConfluxError::invalid_config(
                "buffer.max_buffers must be positive",
            ));
        }
        if self.batch_size == 0 {
            return Err(ConfluxError::invalid_config(
                "buffer.batch_size must be positive",
            ));
        }
        if self.max_rows < self.batch_size {
            return Err(ConfluxError::invalid_config(
                "buffer.max_rows must hold at least one batch",
            ));
        }
        Ok(())
    }
}
