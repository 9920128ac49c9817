//! Logging bootstrap.
//!
//! The conflux crates emit `tracing` events; this module installs a
//! formatting subscriber for binaries and tests that want to see them.

use tracing_subscriber::EnvFilter;

/// Default filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "conflux_exec=info,conflux_buffer=info,conflux_common=info";

/// Installs a global fmt subscriber.
///
/// The filter is taken from `RUST_LOG` when present, otherwise from
/// `default_filter`. Returns false if a global subscriber was already
/// installed, which makes the call safe to repeat from every test.
pub fn init_logging(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_test_writer()
        .try_init()
        .is_ok()
}
