//! Executor: run the test command

use super::{tail, Handoff, Specialist, SpecialistContext};
use crate::workflow::state::{Role, RunResult, WorkflowState};
use std::time::Duration;

/// Output kept in the state, from the end of the log
const MAX_OUTPUT_BYTES: usize = 8 * 1024;

pub struct Executor {
    timeout: Duration,
}

impl Executor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Specialist for Executor {
    fn role(&self) -> Role {
        Role::Executor
    }

    fn invoke(&self, mut state: WorkflowState, ctx: &SpecialistContext<'_>) -> Handoff {
        let command = state.plan.as_ref().and_then(|plan| plan.test_command.clone());

        let result = match command {
            None => RunResult::success(
                "No test command configured or detected; the change was not tested.",
            ),
            Some(command) => {
                tracing::info!(run_id = %state.run_id, command = %command, "running tests");
                match ctx.tools.run_command(&command, self.timeout) {
                    Ok(output) if output.success() => {
                        RunResult::success(tail(&output.combined(), MAX_OUTPUT_BYTES))
                    }
                    Ok(output) => {
                        let code = output
                            .exit_code
                            .map(|c| c.to_string())
                            .unwrap_or_else(|| "signal".to_string());
                        RunResult::failure(format!(
                            "`{}` exited with {}\n{}",
                            command,
                            code,
                            tail(&output.combined(), MAX_OUTPUT_BYTES)
                        ))
                    }
                    Err(err) => RunResult::failure(err.to_string()),
                }
            }
        };

        let summary = if result.passed() { "tests passed" } else { "tests failed" };
        state.record(Role::Executor, summary);
        state.run_result = Some(result);

        Handoff::new(state, Role::Verifier)
    }
}
