//! Router
//!
//! Pure routing decisions over a [`WorkflowState`]. The router never mutates
//! state; the orchestrator applies each [`RouteDecision`].
//!
//! Precedence:
//! 1. `error` set: end
//! 2. `iteration >= max_iterations`: end with an `error` verdict
//! 3. cursor at `end`: end
//! 4. known role: dispatch it
//! 5. unrecognized role: fail closed

use super::state::{Role, RoleCursor, WorkflowState};
use std::fmt;

/// Why the router chose its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteReason {
    ErrorSet,
    IterationCap,
    Terminal,
    Dispatch,
    /// Unroutable cursor or rejected proposal, first occurrence: back to the dispatcher
    FailClosed,
    /// Fail-closed again in the same run: terminate
    FailClosedExhausted,
}

impl fmt::Display for RouteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RouteReason::ErrorSet => "error set",
            RouteReason::IterationCap => "iteration cap reached",
            RouteReason::Terminal => "terminal",
            RouteReason::Dispatch => "dispatch",
            RouteReason::FailClosed => "fail closed",
            RouteReason::FailClosedExhausted => "fail closed again",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDecision {
    pub next: Role,
    pub reason: RouteReason,
}

impl RouteDecision {
    fn new(next: Role, reason: RouteReason) -> Self {
        Self { next, reason }
    }

    pub fn is_terminal(&self) -> bool {
        self.next.is_terminal()
    }
}

/// Decide which role runs next
pub fn route(state: &WorkflowState, max_iterations: u32) -> RouteDecision {
    if state.error.is_some() {
        return RouteDecision::new(Role::End, RouteReason::ErrorSet);
    }
    if state.iteration >= max_iterations {
        return RouteDecision::new(Role::End, RouteReason::IterationCap);
    }
    match &state.current_role {
        RoleCursor::Known(Role::End) => RouteDecision::new(Role::End, RouteReason::Terminal),
        RoleCursor::Known(role) => RouteDecision::new(*role, RouteReason::Dispatch),
        RoleCursor::Unrecognized(_) => fail_closed(state),
    }
}

/// Fail-closed target: the dispatcher once per run, then termination
pub fn fail_closed(state: &WorkflowState) -> RouteDecision {
    if state.reroutes == 0 {
        RouteDecision::new(Role::Dispatcher, RouteReason::FailClosed)
    } else {
        RouteDecision::new(Role::End, RouteReason::FailClosedExhausted)
    }
}

/// Roles that may follow `role`
pub fn successors(role: Role) -> &'static [Role] {
    match role {
        Role::Dispatcher => &[Role::Retriever, Role::PrBot, Role::End],
        Role::Retriever => &[Role::Editor, Role::End],
        Role::Editor => &[Role::Executor, Role::End],
        Role::Executor => &[Role::Verifier, Role::End],
        Role::Verifier => &[Role::PrBot, Role::Reflector, Role::End],
        Role::Reflector => &[Role::Retriever],
        Role::PrBot => &[Role::End],
        Role::End => &[],
    }
}

/// Check a specialist's proposed next role against the adjacency list
pub fn validate_transition(from: Role, proposed: Role) -> bool {
    successors(from).contains(&proposed)
}
