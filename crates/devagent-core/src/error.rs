//! Error types for DevAgent Core
//!
//! Provides a unified error type for all backend operations. Each subsystem keeps
//! its own error enum (`LlmError`, `ToolError`, `PlanningError`, `ConfigError`)
//! and converts into [`DevAgentError`] at the crate boundary.

use crate::config::ConfigError;
use crate::llm::LlmError;
use crate::tools::ToolError;
use thiserror::Error;

/// Result type for DevAgent Core operations
pub type Result<T> = std::result::Result<T, DevAgentError>;

/// Intent classification or planning failed; no workflow is started.
#[derive(Error, Debug, Clone)]
pub enum PlanningError {
    /// The capability provider could not be reached or failed the request
    #[error("intent classification failed: {0}")]
    Provider(#[from] LlmError),

    /// The provider answered with nothing usable
    #[error("intent classification returned an empty response")]
    EmptyClassification,
}

impl PlanningError {
    /// Suggested next step for the user
    pub fn remedy(&self) -> &'static str {
        match self {
            PlanningError::Provider(err) => err.remedy(),
            PlanningError::EmptyClassification => {
                "Try rephrasing the request, or switch to a more capable model."
            }
        }
    }
}

/// Unified error type for DevAgent Core
#[derive(Error, Debug)]
pub enum DevAgentError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Tool capability error
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Planning error
    #[error("Planning error: {0}")]
    Planning(#[from] PlanningError),

    /// The reflection loop ran out of attempts
    #[error("Iteration limit reached ({max_iterations} attempts)")]
    IterationExhausted { max_iterations: u32 },

    /// The routing cursor could not be resolved to a role
    #[error("Unroutable workflow state: {0}")]
    UnroutableState(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),
}

impl DevAgentError {
    /// Create an unroutable state error
    pub fn unroutable(msg: impl Into<String>) -> Self {
        DevAgentError::UnroutableState(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        DevAgentError::NotFound(msg.into())
    }
}

impl From<serde_json::Error> for DevAgentError {
    fn from(err: serde_json::Error) -> Self {
        DevAgentError::Serialization(err.to_string())
    }
}
