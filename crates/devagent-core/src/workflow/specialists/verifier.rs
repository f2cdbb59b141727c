//! Verifier: turn the run result into a verdict

use super::{tail, Handoff, Specialist, SpecialistContext};
use crate::workflow::state::{Role, Verdict, WorkflowState};

const MAX_REASON_BYTES: usize = 2 * 1024;

pub struct Verifier {
    max_iterations: u32,
}

impl Verifier {
    pub fn new(max_iterations: u32) -> Self {
        Self { max_iterations }
    }
}

fn success_response(state: &WorkflowState) -> String {
    let mut response = format!("Done: {}\n", state.goal);
    if !state.diff.is_empty() {
        response.push_str(&format!("\nChanges:\n{}\n", state.diff));
    }
    if let Some(result) = &state.run_result {
        response.push_str(&format!("\nTests:\n{}", result.output));
    }
    response.trim_end().to_string()
}

impl Specialist for Verifier {
    fn role(&self) -> Role {
        Role::Verifier
    }

    fn invoke(&self, mut state: WorkflowState, _ctx: &SpecialistContext<'_>) -> Handoff {
        let (passed, output) = match &state.run_result {
            Some(result) => (result.passed(), result.output.clone()),
            None => (false, "no test run was recorded".to_string()),
        };

        if passed {
            state.verdict = Some(Verdict::Pass);
            state.failure_reason = None;
            state.record(Role::Verifier, "pass");

            if state.plan_contains(Role::PrBot) {
                return Handoff::new(state, Role::PrBot);
            }
            state.response = Some(success_response(&state));
            return Handoff::new(state, Role::End);
        }

        if state.iteration < self.max_iterations {
            state.verdict = Some(Verdict::Fail);
            state.failure_reason = Some(tail(&output, MAX_REASON_BYTES).to_string());
            state.record(Role::Verifier, "fail");
            Handoff::new(state, Role::Reflector)
        } else {
            state.verdict = Some(Verdict::Error);
            state.response = Some(format!(
                "Tests are still failing after {} attempt(s).\n{}",
                self.max_iterations, output
            ));
            state.record(Role::Verifier, "fail, no attempts left");
            Handoff::new(state, Role::End)
        }
    }
}
