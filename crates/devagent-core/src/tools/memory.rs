//! In-memory tool double for deterministic workflow tests

use super::{CommandOutput, ToolCapabilities, ToolError};
use parking_lot::Mutex;
use regex::Regex;
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Files live in a map; commands answer from a queue
pub(crate) struct MemoryTools {
    root: PathBuf,
    files: Mutex<BTreeMap<String, String>>,
    command_results: Mutex<VecDeque<Result<CommandOutput, ToolError>>>,
    commands: Mutex<Vec<String>>,
    searched: Mutex<Vec<String>>,
}

impl MemoryTools {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/workspace"),
            files: Mutex::new(BTreeMap::new()),
            command_results: Mutex::new(VecDeque::new()),
            commands: Mutex::new(Vec::new()),
            searched: Mutex::new(Vec::new()),
        }
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.files.lock().insert(path.to_string(), content.to_string());
        self
    }

    /// Queue the result of the next command
    pub fn with_command(self, result: Result<CommandOutput, ToolError>) -> Self {
        self.command_results.lock().push_back(result);
        self
    }

    /// Queue a command that exits with `code`
    pub fn with_exit(self, code: i32, stdout: &str) -> Self {
        self.with_command(Ok(CommandOutput {
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_code: Some(code),
        }))
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.files.lock().get(path).cloned()
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    /// Paths passed to `search_pattern`, in call order
    pub fn searched(&self) -> Vec<String> {
        self.searched.lock().clone()
    }
}

impl ToolCapabilities for MemoryTools {
    fn root(&self) -> &Path {
        &self.root
    }

    fn read_file(&self, path: &str) -> Result<String, ToolError> {
        self.files
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| ToolError::NotFound(path.to_string()))
    }

    fn write_file(&self, path: &str, content: &str) -> Result<(), ToolError> {
        if path.starts_with('/') || path.split('/').any(|part| part == "..") {
            return Err(ToolError::OutsideWorkspace(path.to_string()));
        }
        self.files.lock().insert(path.to_string(), content.to_string());
        Ok(())
    }

    fn find_files(&self, pattern: &str) -> Result<Vec<String>, ToolError> {
        let pattern = glob::Pattern::new(pattern).map_err(|e| ToolError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(self
            .files
            .lock()
            .keys()
            .filter(|path| pattern.matches(path))
            .cloned()
            .collect())
    }

    fn search_pattern(&self, pattern: &str, path: &str) -> Result<Vec<String>, ToolError> {
        let regex = Regex::new(pattern).map_err(|e| ToolError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        self.searched.lock().push(path.to_string());
        let content = self.read_file(path)?;
        Ok(content
            .lines()
            .enumerate()
            .filter(|(_, line)| regex.is_match(line))
            .map(|(i, line)| format!("{}: {}", i + 1, line))
            .collect())
    }

    fn run_command(&self, command: &str, _timeout: Duration) -> Result<CommandOutput, ToolError> {
        self.commands.lock().push(command.to_string());
        self.command_results.lock().pop_front().unwrap_or_else(|| {
            Err(ToolError::Spawn {
                command: command.to_string(),
                message: "no scripted result".to_string(),
            })
        })
    }
}
