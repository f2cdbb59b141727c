//! DevAgent Core - Backend library for DevAgent
//!
//! This crate provides the UI-agnostic orchestration engine:
//! - Intent classification and planning
//! - Specialist roles (retriever, editor, executor, verifier, reflector, PR bot)
//! - Deterministic routing with bounded reflection
//! - LLM providers (Ollama, OpenAI-compatible)
//! - Role-scoped workspace tools
//! - Configuration loading and session persistence
//!
//! Any front end (CLI, editor plugin, server) drives it through the
//! [`Orchestrator`].
//!
//! # Architecture
//!
//! ```text
//!  goal ──→ dispatcher ──→ retriever ──→ editor ──→ executor ──→ verifier ──→ pr_bot ──→ end
//!               │              ↑                                    │
//!               └─→ end        └──────────── reflector ←────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use devagent_core::{load_config, publisher_for, LocalTools, Orchestrator, ProviderRegistry, RunSettings};
//! use std::sync::Arc;
//!
//! let config = load_config(&cwd)?;
//! let provider = ProviderRegistry::from_config(&config).active()?;
//! let orchestrator = Orchestrator::new(
//!     provider,
//!     Arc::new(LocalTools::new(&cwd)),
//!     publisher_for(config.pr.publisher, &cwd),
//!     RunSettings::from_config(&config, &cwd),
//! )?;
//!
//! let outcome = orchestrator.process_goal("fix the failing parser test", None);
//! println!("{}", outcome.response);
//! ```

pub mod config;
pub mod error;
pub mod llm;
pub mod publisher;
pub mod session;
pub mod tools;
pub mod workflow;

pub use config::{load_config, ConfigError, DevAgentConfig, PublisherKind};
pub use error::{DevAgentError, PlanningError, Result};

pub use llm::{
    ChatMessage, LlmError, LlmProvider, OllamaProvider, OpenAIProvider, ProviderRegistry,
    ProviderStatus, ScriptedProvider, SharedProvider,
};

pub use publisher::{
    publisher_for, DraftPublisher, GhCliPublisher, PublishError, PullRequest,
    PullRequestPublisher, SharedPublisher,
};
pub use session::SessionStore;
pub use tools::{Capability, LocalTools, ScopedTools, SharedTools, ToolCapabilities, ToolError};

pub use workflow::{
    CancellationToken, GoalOutcome, Intent, Orchestrator, Plan, Role, RoleCursor, RunResult,
    RunSettings, Verdict, WorkflowState,
};

/// Get the crate version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
