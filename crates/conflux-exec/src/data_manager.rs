//! Data access contract used by plans.

use std::fmt;

use conflux_common::types::{ProcessId, Value};
use conflux_common::{ConfluxError, ConfluxResult};

use crate::context::CommandContext;
use crate::progress::Progress;
use crate::source::TupleSource;

/// A request for data: command text plus the groups it reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    text: String,
    groups: Vec<String>,
}

impl Command {
    /// Creates a command that targets no groups.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            groups: Vec::new(),
        }
    }

    /// Adds a target group.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Returns the command text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the target groups in the order they were added.
    pub fn groups(&self) -> &[String] {
        &self.groups
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// The data tier as seen by a plan.
pub trait ProcessorDataManager: Send + Sync {
    /// Registers a request and returns the source of its results.
    fn register_request(
        &self,
        process_id: ProcessId,
        command: &Command,
        model_name: &str,
        connector_id: &str,
        node_id: u32,
    ) -> ConfluxResult<Box<dyn TupleSource>>;

    /// Looks up `return_element` in `code_table` for the row whose
    /// `key_element` equals `key_value`.
    fn lookup_code_value(
        &self,
        context: &CommandContext,
        code_table: &str,
        return_element: &str,
        key_element: &str,
        key_value: &Value,
    ) -> ConfluxResult<Progress<Value>>;

    /// Drops all cached code tables.
    fn clear_code_tables(&self);
}

/// A data manager for plans that never reach the data tier.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDataManager;

impl ProcessorDataManager for NullDataManager {
    fn register_request(
        &self,
        _process_id: ProcessId,
        command: &Command,
        _model_name: &str,
        _connector_id: &str,
        _node_id: u32,
    ) -> ConfluxResult<Box<dyn TupleSource>> {
        Err(ConfluxError::not_supported(format!(
            "data access for command '{}'",
            command
        )))
    }

    fn lookup_code_value(
        &self,
        _context: &CommandContext,
        code_table: &str,
        _return_element: &str,
        _key_element: &str,
        _key_value: &Value,
    ) -> ConfluxResult<Progress<Value>> {
        Err(ConfluxError::not_supported(format!(
            "code table lookup on {}",
            code_table
        )))
    }

    fn clear_code_tables(&self) {}
}
