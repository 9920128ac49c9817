//! Temporary tables answered from materialized buffers.
//!
//! A [`TempTableStore`] maps group names to sealed buffers. The
//! [`TempTableDataManager`] sits in front of the real data tier and answers
//! requests for those groups directly, without a round trip to a connector.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use conflux_buffer::{BufferState, TupleBufferRef};
use conflux_common::types::{ProcessId, Value};
use conflux_common::{ConfluxError, ConfluxResult};
use parking_lot::RwLock;
use tracing::debug;

use crate::context::CommandContext;
use crate::data_manager::{Command, ProcessorDataManager};
use crate::progress::Progress;
use crate::source::{BufferTupleSource, TupleSource};

#[derive(Debug)]
struct TempGroup {
    name: String,
    buffer: TupleBufferRef,
}

/// Registry of materialized temporary groups.
///
/// Group names are matched case-insensitively. The store owns the buffers
/// it holds and removes them when a group is dropped.
#[derive(Debug, Default)]
pub struct TempTableStore {
    groups: RwLock<HashMap<String, TempGroup>>,
}

impl TempTableStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `buffer` as the contents of `name`.
    ///
    /// Returns the buffer previously registered under the same name, which
    /// the caller now owns.
    pub fn add_group(
        &self,
        name: impl Into<String>,
        buffer: TupleBufferRef,
    ) -> Option<TupleBufferRef> {
        let name = name.into();
        debug!(group = %name, buffer = %buffer.id(), "registered temp group");
        self.groups
            .write()
            .insert(name.to_lowercase(), TempGroup { name, buffer })
            .map(|previous| previous.buffer)
    }

    /// Drops a group and releases its buffer. Returns false if unknown.
    pub fn remove_group(&self, name: &str) -> bool {
        let removed = self.groups.write().remove(&name.to_lowercase());
        match removed {
            Some(group) => {
                group.buffer.remove();
                debug!(group = %group.name, "removed temp group");
                true
            }
            None => false,
        }
    }

    /// Returns true if `name` is a temp group.
    pub fn contains(&self, name: &str) -> bool {
        self.groups.read().contains_key(&name.to_lowercase())
    }

    /// Returns the registered group names, sorted.
    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .groups
            .read()
            .values()
            .map(|group| group.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Returns the number of groups.
    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    /// Returns true if no group is registered.
    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }

    /// Drops every group and releases their buffers.
    pub fn clear(&self) {
        let groups = std::mem::take(&mut *self.groups.write());
        for group in groups.into_values() {
            group.buffer.remove();
        }
    }

    /// Answers `command` if it reads a temp group.
    ///
    /// Returns `Ok(None)` when the command targets no temp group. A command
    /// must target exactly one group to be answered, though it may name that
    /// group more than once; one that combines a temp group with anything
    /// else is rejected.
    pub fn source_for(
        &self,
        command: &Command,
    ) -> ConfluxResult<Option<Box<dyn TupleSource>>> {
        let groups = self.groups.read();
        let mut temp = command
            .groups()
            .iter()
            .filter_map(|name| groups.get(&name.to_lowercase()));

        let Some(group) = temp.next() else {
            return Ok(None);
        };
        let distinct: HashSet<String> =
            command.groups().iter().map(|name| name.to_lowercase()).collect();
        if distinct.len() > 1 {
            return Err(ConfluxError::processing(format!(
                "malformed command targeting a temp table: {}",
                command
            )));
        }

        match group.buffer.state() {
            BufferState::Sealed => {
                let source: Box<dyn TupleSource> = Box::new(BufferTupleSource::new(&group.buffer));
                Ok(Some(source))
            }
            BufferState::Open => Err(ConfluxError::processing(format!(
                "temp table {} is not materialized yet",
                group.name
            ))),
            BufferState::Removed => Err(ConfluxError::component(format!(
                "temp table {} lost its buffer {}",
                group.name,
                group.buffer.id()
            ))),
        }
    }
}

/// Routes requests for temp groups to a [`TempTableStore`] and everything
/// else to the wrapped data manager.
pub struct TempTableDataManager {
    delegate: Arc<dyn ProcessorDataManager>,
    store: Option<Arc<TempTableStore>>,
}

impl TempTableDataManager {
    /// Wraps `delegate`, answering temp groups from `store` if given.
    pub fn new(
        delegate: Arc<dyn ProcessorDataManager>,
        store: Option<Arc<TempTableStore>>,
    ) -> Self {
        Self { delegate, store }
    }

    /// Returns the temp-table store, if any.
    pub fn store(&self) -> Option<&Arc<TempTableStore>> {
        self.store.as_ref()
    }
}

impl ProcessorDataManager for TempTableDataManager {
    fn register_request(
        &self,
        process_id: ProcessId,
        command: &Command,
        model_name: &str,
        connector_id: &str,
        node_id: u32,
    ) -> ConfluxResult<Box<dyn TupleSource>> {
        if let Some(store) = &self.store {
            if let Some(source) = store.source_for(command)? {
                debug!(process = %process_id, command = %command, "answered from temp table");
                return Ok(source);
            }
        }
        debug!(process = %process_id, model = model_name, "delegating request");
        self.delegate
            .register_request(process_id, command, model_name, connector_id, node_id)
    }

    fn lookup_code_value(
        &self,
        context: &CommandContext,
        code_table: &str,
        return_element: &str,
        key_element: &str,
        key_value: &Value,
    ) -> ConfluxResult<Progress<Value>> {
        self.delegate
            .lookup_code_value(context, code_table, return_element, key_element, key_value)
    }

    fn clear_code_tables(&self) {
        self.delegate.clear_code_tables()
    }
}
