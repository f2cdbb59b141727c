//! Specialist invocation adapter
//!
//! Each role is wrapped as `(state) -> (state', proposed next role)`. The
//! proposal is untrusted: the orchestrator validates it against the router's
//! adjacency list before moving the cursor.

mod dispatcher;
mod editor;
mod executor;
mod pr_bot;
mod prompts;
mod reflector;
mod retriever;
mod verifier;

pub use dispatcher::Dispatcher;
pub use editor::{Editor, EditOperation, EditSet};
pub use executor::Executor;
pub use pr_bot::PrBot;
pub use reflector::{Reflector, Revision};
pub use retriever::Retriever;
pub use verifier::Verifier;

use super::state::{Role, WorkflowState};
use crate::llm::{strip_code_fences, LlmError, LlmProvider};
use crate::tools::ScopedTools;
use serde::de::DeserializeOwned;

/// Updated state plus the role the specialist wants next
#[derive(Debug, Clone)]
pub struct Handoff {
    pub state: WorkflowState,
    pub next: Role,
}

impl Handoff {
    pub fn new(state: WorkflowState, next: Role) -> Self {
        Self { state, next }
    }
}

/// Collaborators handed to a specialist for one invocation
pub struct SpecialistContext<'a> {
    pub provider: &'a dyn LlmProvider,
    /// Tools scoped to the invoked role
    pub tools: ScopedTools,
}

/// One role of the workflow
pub trait Specialist: Send + Sync {
    fn role(&self) -> Role;

    fn invoke(&self, state: WorkflowState, ctx: &SpecialistContext<'_>) -> Handoff;
}

/// Abort the run on a provider failure
///
/// Sets `error` and a response naming the failed step and a remedy.
pub(crate) fn abort(mut state: WorkflowState, role: Role, err: &LlmError) -> Handoff {
    tracing::error!(run_id = %state.run_id, %role, error = %err, "provider call failed");
    state.fail(format!("{} failed: {}", role.display_name(), err));
    state.response = Some(format!(
        "The {} step could not complete: {}.\n{}",
        role.display_name(),
        err,
        err.remedy()
    ));
    state.record(role, format!("aborted: {}", err));
    Handoff::new(state, Role::End)
}

/// Parse a JSON reply, tolerating surrounding code fences
pub(crate) fn parse_json_reply<T: DeserializeOwned>(raw: &str) -> Result<T, LlmError> {
    serde_json::from_str(strip_code_fences(raw)).map_err(|e| {
        LlmError::malformed(format!("expected a JSON object ({})", e))
    })
}

/// Keep the last `max` bytes of `text`, on a char boundary
pub(crate) fn tail(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

/// Keep the first `max` bytes of `text`, on a char boundary
pub(crate) fn head(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
