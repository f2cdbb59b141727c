//! Pull request publishing
//!
//! The pr_bot makes exactly one [`PullRequestPublisher::open_pull_request`]
//! call per run and stores the identifier it gets back.

use crate::config::PublisherKind;
use crate::session::STATE_DIR;
use crate::tools::{ScopedTools, ToolError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Title and body of a pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub run_id: String,
    pub title: String,
    pub body: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("`gh pr create` failed: {0}")]
    Rejected(String),

    #[error("Failed to write PR draft {path}: {message}")]
    Draft { path: String, message: String },
}

impl PublishError {
    pub fn remedy(&self) -> &'static str {
        match self {
            PublishError::Tool(_) | PublishError::Rejected(_) => {
                "Check that the GitHub CLI is installed and authenticated (`gh auth status`), \
                 or set `pr.publisher = \"draft\"`."
            }
            PublishError::Draft { .. } => "Check that the workspace directory is writable.",
        }
    }
}

/// Obtains a PR identifier for a finished change
pub trait PullRequestPublisher: Send + Sync {
    fn name(&self) -> &str;

    /// Open the pull request and return its identifier (usually a URL)
    fn open_pull_request(
        &self,
        request: &PullRequest,
        tools: &ScopedTools,
    ) -> Result<String, PublishError>;
}

pub type SharedPublisher = Arc<dyn PullRequestPublisher>;

/// Build the configured publisher for a workspace
pub fn publisher_for(kind: PublisherKind, workspace: &Path) -> SharedPublisher {
    match kind {
        PublisherKind::Draft => Arc::new(DraftPublisher::for_workspace(workspace)),
        PublisherKind::Gh => Arc::new(GhCliPublisher::default()),
    }
}

/// Opens a real PR with `gh pr create`
#[derive(Debug, Clone)]
pub struct GhCliPublisher {
    timeout: Duration,
}

impl GhCliPublisher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for GhCliPublisher {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

/// Quote a string for a POSIX shell
fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

impl PullRequestPublisher for GhCliPublisher {
    fn name(&self) -> &str {
        "gh"
    }

    fn open_pull_request(
        &self,
        request: &PullRequest,
        tools: &ScopedTools,
    ) -> Result<String, PublishError> {
        let command = format!(
            "gh pr create --title {} --body {}",
            shell_quote(&request.title),
            shell_quote(&request.body)
        );
        let output = tools.run_command(&command, self.timeout)?;

        if !output.success() {
            return Err(PublishError::Rejected(output.combined()));
        }

        output
            .stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| PublishError::Rejected("no PR URL in output".to_string()))
    }
}

/// Writes the PR as a markdown draft under `.devagent/pull_requests/`
#[derive(Debug, Clone)]
pub struct DraftPublisher {
    dir: PathBuf,
}

impl DraftPublisher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn for_workspace(workspace: &Path) -> Self {
        Self::new(workspace.join(STATE_DIR).join("pull_requests"))
    }
}

impl PullRequestPublisher for DraftPublisher {
    fn name(&self) -> &str {
        "draft"
    }

    fn open_pull_request(
        &self,
        request: &PullRequest,
        _tools: &ScopedTools,
    ) -> Result<String, PublishError> {
        let path = self.dir.join(format!("{}.md", request.run_id));
        let draft_error = |e: std::io::Error| PublishError::Draft {
            path: path.display().to_string(),
            message: e.to_string(),
        };

        std::fs::create_dir_all(&self.dir).map_err(draft_error)?;
        let content = format!("# {}\n\n{}\n", request.title, request.body);
        std::fs::write(&path, content).map_err(draft_error)?;

        tracing::info!(path = %path.display(), "wrote pull request draft");
        Ok(format!("draft://{}", request.run_id))
    }
}
