//! Tool capabilities
//!
//! File and shell access for the specialists, confined to the workspace root
//! and gated per role by [`ScopedTools`].

mod files;
#[cfg(test)]
mod memory;
mod permissions;
mod shell;

pub use files::LocalTools;
#[cfg(test)]
pub(crate) use memory::MemoryTools;
pub use permissions::{permissions_for, ScopedTools};
pub use shell::run_command;

use crate::workflow::Role;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Tool errors
///
/// These never abort a run: specialists turn them into state fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("{role} is not permitted to {capability}")]
    NotPermitted { role: Role, capability: Capability },

    #[error("Path is outside the workspace: {0}")]
    OutsideWorkspace(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    #[error("Invalid pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Failed to start `{command}`: {message}")]
    Spawn { command: String, message: String },

    #[error("`{command}` timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },
}

impl ToolError {
    pub(crate) fn io(path: impl Into<String>, err: std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            ToolError::NotFound(path)
        } else {
            ToolError::Io {
                path,
                message: err.to_string(),
            }
        }
    }
}

/// What a tool call does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Read,
    Write,
    Find,
    Search,
    Run,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Read => "read files",
            Capability::Write => "write files",
            Capability::Find => "find files",
            Capability::Search => "search files",
            Capability::Run => "run commands",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Captured output of a shell command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout and stderr joined for display
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr.trim_end()),
            (false, true) => self.stdout.trim_end().to_string(),
            (true, false) => self.stderr.trim_end().to_string(),
            (true, true) => String::new(),
        }
    }
}

/// File system and shell access
///
/// Paths are workspace-relative. Implementations must refuse paths that resolve
/// outside [`ToolCapabilities::root`].
pub trait ToolCapabilities: Send + Sync {
    /// Workspace root every path is resolved against
    fn root(&self) -> &Path;

    fn read_file(&self, path: &str) -> Result<String, ToolError>;

    /// Create or overwrite a file, creating parent directories
    fn write_file(&self, path: &str, content: &str) -> Result<(), ToolError>;

    /// Files matching a glob pattern, sorted, workspace-relative
    fn find_files(&self, pattern: &str) -> Result<Vec<String>, ToolError>;

    /// Lines of one file matching a regex, as `"<line>: <text>"`
    fn search_pattern(&self, pattern: &str, path: &str) -> Result<Vec<String>, ToolError>;

    /// Run a shell command in the workspace root
    ///
    /// A non-zero exit is still `Ok`; only spawn failures and timeouts are errors.
    fn run_command(&self, command: &str, timeout: Duration) -> Result<CommandOutput, ToolError>;
}

/// Thread-safe shared tool handle
pub type SharedTools = Arc<dyn ToolCapabilities>;
