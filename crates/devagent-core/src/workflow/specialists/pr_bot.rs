//! PR bot: open the pull request

use super::{tail, Handoff, Specialist, SpecialistContext};
use crate::publisher::{PullRequest, SharedPublisher};
use crate::workflow::state::{Role, WorkflowState};

const MAX_TITLE_CHARS: usize = 72;
const MAX_TEST_OUTPUT_BYTES: usize = 2 * 1024;

pub struct PrBot {
    publisher: SharedPublisher,
}

impl PrBot {
    pub fn new(publisher: SharedPublisher) -> Self {
        Self { publisher }
    }
}

/// First line of the goal, capitalized and shortened
fn title_for(goal: &str) -> String {
    let line = goal.lines().next().unwrap_or_default().trim();
    let mut chars = line.chars();
    let mut title: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Automated change".to_string(),
    };
    if title.chars().count() > MAX_TITLE_CHARS {
        title = title.chars().take(MAX_TITLE_CHARS - 3).collect::<String>() + "...";
    }
    title
}

fn body_for(state: &WorkflowState) -> String {
    let mut body = format!("## Goal\n\n{}\n", state.goal);

    if let Some(plan) = &state.plan {
        if !plan.steps.is_empty() {
            body.push_str("\n## Plan\n\n");
            for step in &plan.steps {
                body.push_str(&format!("- {}\n", step));
            }
        }
    }

    body.push_str("\n## Changes\n\n");
    if state.diff.is_empty() {
        body.push_str("No changes were recorded in this run.\n");
    } else {
        body.push_str(&format!("```\n{}\n```\n", state.diff));
    }

    if let Some(result) = &state.run_result {
        let status = if result.passed() { "passed" } else { "failed" };
        body.push_str(&format!(
            "\n## Tests\n\nTests {}.\n\n```\n{}\n```\n",
            status,
            tail(&result.output, MAX_TEST_OUTPUT_BYTES)
        ));
    }
    body
}

impl Specialist for PrBot {
    fn role(&self) -> Role {
        Role::PrBot
    }

    fn invoke(&self, mut state: WorkflowState, ctx: &SpecialistContext<'_>) -> Handoff {
        let request = PullRequest {
            run_id: state.run_id.clone(),
            title: title_for(&state.goal),
            body: body_for(&state),
        };

        match self.publisher.open_pull_request(&request, &ctx.tools) {
            Ok(id) => {
                tracing::info!(run_id = %state.run_id, publisher = self.publisher.name(), pr = %id, "opened pull request");
                state.response = Some(format!("Opened pull request: {}\n{}", id, request.title));
                state.record(Role::PrBot, format!("opened {}", id));
                state.pr_url = Some(id);
            }
            Err(err) => {
                tracing::warn!(run_id = %state.run_id, error = %err, "pull request not opened");
                state.pr_url = None;
                state.response = Some(format!(
                    "Could not open a pull request: {}.\n{}",
                    err,
                    err.remedy()
                ));
                state.record(Role::PrBot, "publish failed");
            }
        }

        Handoff::new(state, Role::End)
    }
}
