//! Reflector: revise the plan after a failed verification

use super::prompts::REFLECTOR_SYSTEM_PROMPT;
use super::{abort, parse_json_reply, Handoff, Specialist, SpecialistContext};
use crate::llm::ChatMessage;
use crate::workflow::reflection::ReflectionController;
use crate::workflow::state::{Role, Verdict, WorkflowState};
use serde::{Deserialize, Serialize};

/// Revised plan details from the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub test_command: Option<String>,
}

pub struct Reflector {
    controller: ReflectionController,
}

impl Reflector {
    pub fn new(controller: ReflectionController) -> Self {
        Self { controller }
    }
}

impl Specialist for Reflector {
    fn role(&self) -> Role {
        Role::Reflector
    }

    fn invoke(&self, mut state: WorkflowState, ctx: &SpecialistContext<'_>) -> Handoff {
        let reason = state
            .failure_reason
            .clone()
            .unwrap_or_else(|| "verification failed".to_string());

        let iteration = match self.controller.begin_retry(&mut state, reason.clone()) {
            Ok(iteration) => iteration,
            Err(err) => {
                tracing::error!(run_id = %state.run_id, error = %err, "reflection exhausted");
                state.verdict = Some(Verdict::Error);
                state.fail(err.to_string());
                state.response = Some(format!(
                    "{}.\nThe last failure was:\n{}",
                    err, reason
                ));
                return Handoff::new(state, Role::End);
            }
        };

        // No attempt left to spend a revision on; the router stops at the cap.
        if iteration >= self.controller.max_iterations() {
            clear_attempt(&mut state);
            tracing::info!(run_id = %state.run_id, iteration, "last attempt used, skipping revision");
            state.record(Role::Reflector, format!("retry {} skipped, limit reached", iteration));
            return Handoff::new(state, Role::Retriever);
        }

        let mut request = format!("GOAL: {}\n\nFAILURE:\n{}\n", state.goal, reason);
        if let Some(plan) = &state.plan {
            request.push_str("\nCURRENT PLAN:\n");
            for step in &plan.steps {
                request.push_str(&format!("- {}\n", step));
            }
        }
        if !state.diff.is_empty() {
            request.push_str(&format!("\nLAST CHANGES:\n{}\n", state.diff));
        }

        let messages = vec![
            ChatMessage::system(REFLECTOR_SYSTEM_PROMPT),
            ChatMessage::user(request),
        ];
        let revision: Revision = match ctx
            .provider
            .generate(&messages)
            .and_then(|raw| parse_json_reply(&raw))
        {
            Ok(revision) => revision,
            Err(err) => return abort(state, Role::Reflector, &err),
        };

        if let Some(plan) = state.plan.as_mut() {
            if !revision.steps.is_empty() {
                plan.steps = revision.steps;
            }
            if let Some(command) = revision.test_command.filter(|c| !c.trim().is_empty()) {
                plan.test_command = Some(command);
            }
        }

        clear_attempt(&mut state);

        tracing::info!(run_id = %state.run_id, iteration, "retrying from retriever");
        state.record(Role::Reflector, format!("retry {}", iteration));
        Handoff::new(state, Role::Retriever)
    }
}

/// Drop the outputs of the failed attempt; the retry regenerates them
fn clear_attempt(state: &mut WorkflowState) {
    state.run_result = None;
    state.verdict = None;
    state.failure_reason = None;
}
