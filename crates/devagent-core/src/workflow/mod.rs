//! Workflow engine
//!
//! A goal is classified into an [`Intent`], planned into a role sequence, and
//! then driven through the specialists by the [`Orchestrator`]. The router has
//! the final say on every transition; failed verifications loop back through
//! the reflector until `max_iterations` is reached.

pub mod classifier;
pub mod orchestrator;
pub mod planner;
pub mod reflection;
pub mod router;
pub mod specialists;
pub mod state;

pub use classifier::classify;
pub use orchestrator::{CancellationToken, GoalOutcome, Orchestrator, RunSettings};
pub use planner::{workflow_for, Planner};
pub use reflection::ReflectionController;
pub use router::{fail_closed, route, successors, validate_transition, RouteDecision, RouteReason};
pub use specialists::{Handoff, Specialist, SpecialistContext};
pub use state::{
    HistoryEntry, Intent, Plan, Role, RoleCursor, RunResult, RunStatus, Verdict, WorkflowState,
};
