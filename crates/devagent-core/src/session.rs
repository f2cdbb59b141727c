//! Session persistence
//!
//! Saves the last [`WorkflowState`] as pretty JSON so a conversation can be
//! resumed in a later process.

use crate::error::{DevAgentError, Result};
use crate::workflow::WorkflowState;
use std::fs;
use std::path::{Path, PathBuf};

/// Per-workspace state directory
pub const STATE_DIR: &str = ".devagent";

const SESSION_FILE: &str = "session.json";

/// JSON snapshot store for one session file
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store at an explicit file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<workspace>/.devagent/session.json`
    pub fn for_workspace(workspace: &Path) -> Self {
        Self::new(workspace.join(STATE_DIR).join(SESSION_FILE))
    }

    /// `~/.devagent/session.json`, used when the workspace is not writable
    pub fn in_home() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| DevAgentError::not_found("Could not determine home directory"))?;
        Ok(Self::new(home.join(STATE_DIR).join(SESSION_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved snapshot, if any
    pub fn load(&self) -> Result<Option<WorkflowState>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            DevAgentError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read session {}: {}", self.path.display(), e),
            ))
        })?;

        let state = serde_json::from_str(&content).map_err(|e| {
            DevAgentError::Serialization(format!(
                "Failed to parse session {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(Some(state))
    }

    /// Save a snapshot
    pub fn save(&self, state: &WorkflowState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(state)?;

        // Write atomically using temp file
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &self.path)?;

        tracing::debug!(path = %self.path.display(), run_id = %state.run_id, "saved session");
        Ok(())
    }

    /// Remove the saved snapshot
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{Intent, Role, RoleCursor};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_missing_session_loads_none() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::for_workspace(dir.path());
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::for_workspace(dir.path());

        let mut state = WorkflowState::new("explain src/lib.rs");
        state.intent = Some(Intent::Explain);
        state.current_role = Role::End.into();
        state.response = Some("It exports the crate API.".to_string());
        store.save(&state).unwrap();

        assert!(dir.path().join(".devagent/session.json").exists());
        assert_eq!(store.load().unwrap(), Some(state));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_session_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.load(), Err(DevAgentError::Serialization(_))));
    }

    #[test]
    fn test_unknown_cursor_survives_reload() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let mut state = WorkflowState::new("x");
        state.current_role = RoleCursor::parse("archivist");
        store.save(&state).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(
            loaded.current_role,
            RoleCursor::Unrecognized("archivist".to_string())
        );
    }
}
