//! Editor: generate and apply file edits

use super::prompts::EDITOR_SYSTEM_PROMPT;
use super::{abort, head, parse_json_reply, Handoff, Specialist, SpecialistContext};
use crate::llm::{format_file_context, ChatMessage};
use crate::workflow::state::{Role, WorkflowState};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single edit operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EditOperation {
    /// Create or overwrite a file
    Write { path: String, content: String },
}

/// The editor's structured reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditSet {
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub operations: Vec<EditOperation>,
    #[serde(default)]
    pub message: String,
}

pub struct Editor {
    max_read_bytes: usize,
}

impl Editor {
    pub fn new(max_read_bytes: usize) -> Self {
        Self { max_read_bytes }
    }

    fn build_messages(&self, state: &WorkflowState, current: &[(String, String)]) -> Vec<ChatMessage> {
        let mut request = format!("GOAL: {}\n", state.goal);

        if let Some(plan) = &state.plan {
            request.push_str("\nPLAN:\n");
            for step in &plan.steps {
                request.push_str(&format!("- {}\n", step));
            }
            if let Some(reason) = &plan.retry_reason {
                request.push_str(&format!("\nPREVIOUS ATTEMPT FAILED:\n{}\n", reason));
            }
        }

        request.push_str(&format!("\nCONTEXT:\n{}\n", state.context));

        for (path, content) in current {
            request.push('\n');
            request.push_str(&format_file_context(path, head(content, self.max_read_bytes)));
            request.push('\n');
        }

        vec![
            ChatMessage::system(EDITOR_SYSTEM_PROMPT),
            ChatMessage::user(request),
        ]
    }
}

/// Lines added and removed between two versions, counted as multisets
fn line_delta(old: &str, new: &str) -> (usize, usize) {
    let mut remaining: HashMap<&str, usize> = HashMap::new();
    for line in old.lines() {
        *remaining.entry(line).or_default() += 1;
    }

    let mut added = 0;
    for line in new.lines() {
        match remaining.get_mut(line) {
            Some(count) if *count > 0 => *count -= 1,
            _ => added += 1,
        }
    }
    let removed = remaining.values().sum();
    (added, removed)
}

impl Specialist for Editor {
    fn role(&self) -> Role {
        Role::Editor
    }

    fn invoke(&self, mut state: WorkflowState, ctx: &SpecialistContext<'_>) -> Handoff {
        let current: Vec<(String, String)> = state
            .plan
            .iter()
            .flat_map(|plan| plan.target_files.iter())
            .filter_map(|path| {
                ctx.tools
                    .read_file(path)
                    .ok()
                    .map(|content| (path.clone(), content))
            })
            .collect();

        let messages = self.build_messages(&state, &current);
        let edits: EditSet = match ctx
            .provider
            .generate(&messages)
            .and_then(|raw| parse_json_reply(&raw))
        {
            Ok(edits) => edits,
            Err(err) => return abort(state, Role::Editor, &err),
        };

        let mut summary = Vec::new();
        let mut written = 0;
        for operation in &edits.operations {
            let EditOperation::Write { path, content } = operation;
            let previous = ctx.tools.read_file(path).ok();

            match ctx.tools.write_file(path, content) {
                Ok(()) => {
                    written += 1;
                    match previous {
                        Some(old) => {
                            let (added, removed) = line_delta(&old, content);
                            summary.push(format!("M {} (+{} -{})", path, added, removed));
                        }
                        None => summary.push(format!("A {} (+{})", path, content.lines().count())),
                    }
                }
                Err(err) => {
                    tracing::warn!(run_id = %state.run_id, path = %path, error = %err, "edit not applied");
                    summary.push(format!("! {} not written: {}", path, err));
                }
            }
        }

        state.diff = if summary.is_empty() {
            "No changes proposed.".to_string()
        } else {
            summary.join("\n")
        };

        let message = if edits.message.trim().is_empty() {
            format!("{} file(s) written", written)
        } else {
            edits.message.trim().to_string()
        };
        state.record(Role::Editor, message);

        Handoff::new(state, Role::Executor)
    }
}
