//! Per-execution identity.

use std::fmt;

use conflux_common::types::{ConnectionId, ProcessId};

/// Identity of one command execution.
///
/// Built by the caller and shared as `Arc<CommandContext>`; the execution
/// core reads it but never changes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandContext {
    process_id: ProcessId,
    connection_id: ConnectionId,
    user_name: String,
    vdb_name: String,
}

impl CommandContext {
    /// Creates a context for an anonymous user.
    pub fn new(process_id: ProcessId, connection_id: ConnectionId) -> Self {
        Self {
            process_id,
            connection_id,
            user_name: String::new(),
            vdb_name: String::new(),
        }
    }

    /// Sets the user the command runs as.
    #[must_use]
    pub fn with_user(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = user_name.into();
        self
    }

    /// Sets the virtual database the command runs against.
    #[must_use]
    pub fn with_vdb(mut self, vdb_name: impl Into<String>) -> Self {
        self.vdb_name = vdb_name.into();
        self
    }

    /// Returns the process id.
    pub fn process_id(&self) -> ProcessId {
        self.process_id
    }

    /// Returns the connection id.
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Returns the user name, empty if anonymous.
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// Returns the virtual database name.
    pub fn vdb_name(&self) -> &str {
        &self.vdb_name
    }
}

impl fmt::Display for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.process_id, self.connection_id)
    }
}
