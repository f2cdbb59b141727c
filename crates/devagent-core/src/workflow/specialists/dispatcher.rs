//! Dispatcher: classify, plan, answer direct chat

use super::{abort, Handoff, Specialist, SpecialistContext};
use crate::workflow::classifier::classify;
use crate::workflow::planner::Planner;
use crate::workflow::state::{Role, WorkflowState};

pub struct Dispatcher {
    planner: Planner,
}

impl Dispatcher {
    pub fn new(planner: Planner) -> Self {
        Self { planner }
    }
}

impl Specialist for Dispatcher {
    fn role(&self) -> Role {
        Role::Dispatcher
    }

    fn invoke(&self, mut state: WorkflowState, ctx: &SpecialistContext<'_>) -> Handoff {
        let intent = match state.intent {
            Some(intent) => intent,
            None => {
                let intent = match classify(ctx.provider, &state.goal) {
                    Ok(intent) => intent,
                    Err(err) => {
                        tracing::error!(run_id = %state.run_id, error = %err, "classification failed");
                        state.fail(err.to_string());
                        state.response = Some(format!(
                            "I could not work out what to do with that request: {}.\n{}",
                            err,
                            err.remedy()
                        ));
                        state.record(Role::Dispatcher, format!("aborted: {}", err));
                        return Handoff::new(state, Role::End);
                    }
                };

                let plan = self
                    .planner
                    .plan(&state.goal, intent, &state.referenced_files);
                tracing::info!(
                    run_id = %state.run_id,
                    %intent,
                    workflow = ?plan.workflow,
                    "planned run"
                );
                state.record(
                    Role::Dispatcher,
                    format!("intent {}, {} step(s)", intent, plan.steps.len()),
                );
                state.intent = Some(intent);
                state.plan = Some(plan);
                intent
            }
        };

        if intent.is_conversational() {
            if state.response.is_none() {
                match ctx.provider.direct_chat(&state.goal) {
                    Ok(answer) => {
                        state.response = Some(answer.trim().to_string());
                        state.record(Role::Dispatcher, "answered directly");
                    }
                    Err(err) => return abort(state, Role::Dispatcher, &err),
                }
            }
            return Handoff::new(state, Role::End);
        }

        let next = state
            .plan
            .as_ref()
            .map(|plan| plan.entry_role())
            .unwrap_or(Role::End);
        Handoff::new(state, next)
    }
}
