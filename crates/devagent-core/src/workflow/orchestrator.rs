//! Orchestrator
//!
//! Drives one run: asks the router for the next role, invokes the specialist,
//! validates its proposal and applies the outcome to the state, until the
//! router reaches `end`.

use super::planner::Planner;
use super::reflection::ReflectionController;
use super::router::{self, RouteDecision, RouteReason};
use super::specialists::{
    Dispatcher, Editor, Executor, Handoff, PrBot, Reflector, Retriever, Specialist,
    SpecialistContext, Verifier,
};
use super::state::{Role, RoleCursor, Verdict, WorkflowState};
use crate::config::{ConfigError, DevAgentConfig};
use crate::error::DevAgentError;
use crate::llm::SharedProvider;
use crate::publisher::SharedPublisher;
use crate::tools::{ScopedTools, SharedTools};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cooperative cancellation flag, checked between role invocations
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

/// Knobs for a run
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub workspace: PathBuf,
    pub max_iterations: u32,
    pub test_command: Option<String>,
    pub command_timeout: Duration,
    pub max_read_bytes: usize,
}

impl RunSettings {
    pub fn from_config(config: &DevAgentConfig, workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            max_iterations: config.workflow.max_iterations,
            test_command: config.workflow.test_command.clone(),
            command_timeout: Duration::from_secs(config.tools.command_timeout),
            max_read_bytes: config.tools.max_read_bytes,
        }
    }

    /// Reject settings the router cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                key: "workflow.max_iterations".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Result of [`Orchestrator::process_goal`]
#[derive(Debug, Clone)]
pub struct GoalOutcome {
    /// Always non-empty
    pub response: String,
    pub state: WorkflowState,
}

/// Runs the workflow state machine
pub struct Orchestrator {
    provider: SharedProvider,
    tools: SharedTools,
    max_iterations: u32,
    cancel: CancellationToken,
    dispatcher: Dispatcher,
    retriever: Retriever,
    editor: Editor,
    executor: Executor,
    verifier: Verifier,
    reflector: Reflector,
    pr_bot: PrBot,
}

impl Orchestrator {
    pub fn new(
        provider: SharedProvider,
        tools: SharedTools,
        publisher: SharedPublisher,
        settings: RunSettings,
    ) -> Result<Self, DevAgentError> {
        settings.validate()?;

        let planner = Planner::new(settings.workspace).with_test_command(settings.test_command);
        Ok(Self {
            provider,
            tools,
            max_iterations: settings.max_iterations,
            cancel: CancellationToken::new(),
            dispatcher: Dispatcher::new(planner),
            retriever: Retriever::new(settings.max_read_bytes),
            editor: Editor::new(settings.max_read_bytes),
            executor: Executor::new(settings.command_timeout),
            verifier: Verifier::new(settings.max_iterations),
            reflector: Reflector::new(ReflectionController::new(settings.max_iterations)),
            pr_bot: PrBot::new(publisher),
        })
    }

    /// Share an externally owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels the active run
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn provider(&self) -> &SharedProvider {
        &self.provider
    }

    /// Handle one user goal
    ///
    /// `None` starts a fresh run; a prior state is carried into the next turn.
    pub fn process_goal(&self, goal: &str, prior: Option<WorkflowState>) -> GoalOutcome {
        self.cancel.reset();

        let state = match prior {
            Some(prior) => WorkflowState::next_turn(prior, goal),
            None => WorkflowState::new(goal),
        };

        let mut state = self.run(state);
        let response = final_response(&mut state);
        GoalOutcome { response, state }
    }

    /// Drive a state until the router reaches `end`
    pub fn run(&self, mut state: WorkflowState) -> WorkflowState {
        let span = tracing::info_span!("run", run_id = %state.run_id);
        let _guard = span.enter();

        loop {
            if self.cancel.is_cancelled() {
                tracing::warn!(at = %state.current_role, "run cancelled");
                state.fail("cancelled");
                state.response = Some(format!(
                    "Cancelled before the {} step. Nothing further was run.",
                    state.current_role
                ));
                state.current_role = Role::End.into();
                return state;
            }

            let decision = router::route(&state, self.max_iterations);
            match decision.reason {
                RouteReason::ErrorSet | RouteReason::Terminal => {
                    state.current_role = Role::End.into();
                    return state;
                }
                RouteReason::IterationCap => {
                    self.stop_at_cap(&mut state);
                    return state;
                }
                RouteReason::FailClosed | RouteReason::FailClosedExhausted => {
                    self.apply_fail_closed(&mut state, decision);
                }
                RouteReason::Dispatch => {
                    state = self.step(state, decision.next);
                }
            }
        }
    }

    /// Invoke one specialist and apply its proposal
    fn step(&self, state: WorkflowState, role: Role) -> WorkflowState {
        let Some(specialist) = self.specialist(role) else {
            return state;
        };

        tracing::info!(%role, iteration = state.iteration, "invoking specialist");
        let ctx = SpecialistContext {
            provider: self.provider.as_ref(),
            tools: ScopedTools::new(role, self.tools.clone()),
        };
        let handoff = specialist.invoke(state, &ctx);
        self.apply_handoff(role, handoff)
    }

    /// Move the cursor to a specialist's proposal, if the adjacency list allows it
    fn apply_handoff(&self, role: Role, handoff: Handoff) -> WorkflowState {
        let mut state = handoff.state;

        if state.error.is_some() {
            state.current_role = Role::End.into();
            return state;
        }

        if router::validate_transition(role, handoff.next) {
            tracing::info!(from = %role, to = %handoff.next, "transition");
            state.current_role = handoff.next.into();
        } else {
            tracing::warn!(from = %role, proposed = %handoff.next, "rejected proposed transition");
            let decision = router::fail_closed(&state);
            state.current_role = RoleCursor::Unrecognized(format!(
                "{} -> {}",
                role, handoff.next
            ));
            self.apply_fail_closed(&mut state, decision);
        }
        state
    }

    fn specialist(&self, role: Role) -> Option<&dyn Specialist> {
        match role {
            Role::Dispatcher => Some(&self.dispatcher),
            Role::Retriever => Some(&self.retriever),
            Role::Editor => Some(&self.editor),
            Role::Executor => Some(&self.executor),
            Role::Verifier => Some(&self.verifier),
            Role::Reflector => Some(&self.reflector),
            Role::PrBot => Some(&self.pr_bot),
            Role::End => None,
        }
    }

    fn apply_fail_closed(&self, state: &mut WorkflowState, decision: RouteDecision) {
        match decision.reason {
            RouteReason::FailClosed => {
                tracing::warn!(cursor = %state.current_role, "fail closed, back to dispatcher");
                state.reroutes += 1;
                state.current_role = Role::Dispatcher.into();
            }
            _ => {
                let err = DevAgentError::unroutable(format!(
                    "no valid transition from `{}`",
                    state.current_role
                ));
                tracing::error!(error = %err, "terminating run");
                state.fail(err.to_string());
                state.response = Some(format!(
                    "The workflow reached a state it cannot route: {}.\nStart over with a new request (or `/reset`).",
                    err
                ));
                state.current_role = Role::End.into();
            }
        }
    }

    fn stop_at_cap(&self, state: &mut WorkflowState) {
        tracing::warn!(
            iteration = state.iteration,
            max = self.max_iterations,
            "iteration cap reached"
        );
        state.verdict = Some(Verdict::Error);
        state.current_role = Role::End.into();

        if state.response.is_none() {
            let mut response = format!(
                "Stopped after {} attempt(s) without passing verification.",
                self.max_iterations
            );
            if let Some(reason) = state.plan.as_ref().and_then(|p| p.retry_reason.as_deref()) {
                response.push_str(&format!("\nLast failure:\n{}", reason));
            }
            response.push_str(
                "\nRefine the request, or raise `workflow.max_iterations` to allow more attempts.",
            );
            state.response = Some(response);
        }
    }
}

/// Make sure the run ends with something to show the user
fn final_response(state: &mut WorkflowState) -> String {
    if let Some(response) = state.response.as_ref().filter(|r| !r.trim().is_empty()) {
        return response.clone();
    }

    let response = match &state.error {
        Some(error) => format!("The request failed: {}", error),
        None if state.history.is_empty() => "Nothing to do.".to_string(),
        None => {
            let steps: Vec<String> = state
                .history
                .iter()
                .map(|entry| format!("- {}: {}", entry.role.display_name(), entry.summary))
                .collect();
            format!("Finished.\n{}", steps.join("\n"))
        }
    };
    state.response = Some(response.clone());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatMessage, LlmError, LlmProvider, ProviderStatus, ScriptedProvider};
    use crate::publisher::DraftPublisher;
    use crate::tools::MemoryTools;
    use crate::workflow::state::{Intent, RunStatus};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use std::path::Path;

    const EDIT: &str = r#"{"operations": [{"type": "write", "path": "src/lib.rs", "content": "fn fixed() {}\n"}], "message": "patch"}"#;
    const REVISION: &str = r#"{"steps": ["try again"]}"#;

    struct Harness {
        provider: Arc<ScriptedProvider>,
        tools: Arc<MemoryTools>,
        orchestrator: Orchestrator,
        _drafts: TempDir,
    }

    fn settings(max_iterations: u32) -> RunSettings {
        RunSettings {
            workspace: PathBuf::from("/nonexistent"),
            max_iterations,
            test_command: Some("cargo test".to_string()),
            command_timeout: Duration::from_secs(5),
            max_read_bytes: 4096,
        }
    }

    fn harness(provider: ScriptedProvider, tools: MemoryTools, max_iterations: u32) -> Harness {
        let drafts = TempDir::new().unwrap();
        let provider = Arc::new(provider);
        let tools = Arc::new(tools);
        let orchestrator = Orchestrator::new(
            provider.clone(),
            tools.clone(),
            Arc::new(DraftPublisher::for_workspace(drafts.path())),
            settings(max_iterations),
        )
        .unwrap();
        Harness {
            provider,
            tools,
            orchestrator,
            _drafts: drafts,
        }
    }

    fn roles(state: &WorkflowState) -> Vec<Role> {
        state.history.iter().map(|entry| entry.role).collect()
    }

    #[test]
    fn scenario_explain() {
        let h = harness(
            ScriptedProvider::new()
                .reply("explain")
                .reply("main.rs wires the CLI together."),
            MemoryTools::new().with_file("src/main.rs", "fn main() {}\n"),
            3,
        );

        let outcome = h.orchestrator.process_goal("explain src/main.rs", None);
        assert_eq!(outcome.response, "main.rs wires the CLI together.");
        assert_eq!(outcome.state.intent, Some(Intent::Explain));
        assert_eq!(outcome.state.current_role, RoleCursor::Known(Role::End));
        assert_eq!(roles(&outcome.state), vec![Role::Dispatcher, Role::Retriever]);
        assert_eq!(outcome.state.iteration, 0);
        assert!(h.tools.commands().is_empty());
    }

    #[test]
    fn scenario_fix_fails_then_retries_from_retriever() {
        let h = harness(
            ScriptedProvider::new()
                .reply("fix")
                .reply("context")
                .reply(EDIT)
                .reply(REVISION)
                .reply("context again")
                .reply(EDIT),
            MemoryTools::new()
                .with_file("src/lib.rs", "fn broken() {}\n")
                .with_exit(101, "1 test failed")
                .with_exit(0, "all passed"),
            3,
        );

        let outcome = h.orchestrator.process_goal("fix the failing test", None);
        let state = &outcome.state;
        assert_eq!(
            roles(state),
            vec![
                Role::Dispatcher,
                Role::Retriever,
                Role::Editor,
                Role::Executor,
                Role::Verifier,
                Role::Reflector,
                Role::Retriever,
                Role::Editor,
                Role::Executor,
                Role::Verifier,
            ]
        );
        assert_eq!(state.iteration, 1);
        let plan = state.plan.as_ref().unwrap();
        assert_eq!(plan.attempt, 1);
        assert!(plan.retry_reason.as_deref().unwrap().contains("1 test failed"));
        assert_eq!(state.verdict, Some(Verdict::Pass));
        assert_eq!(state.run_result.as_ref().unwrap().status, RunStatus::Success);
        assert_eq!(h.tools.commands(), vec!["cargo test", "cargo test"]);
        assert!(outcome.response.contains("all passed"));
        assert_eq!(h.provider.remaining(), 0);
    }

    #[test]
    fn scenario_last_attempt_fails_and_hits_cap() {
        let h = harness(
            ScriptedProvider::new().reply("context").reply(EDIT),
            MemoryTools::new().with_exit(1, "still broken"),
            3,
        );

        let mut state = WorkflowState::new("fix the failing test");
        state.intent = Some(Intent::Fix);
        state.plan = Some(
            Planner::new("/nonexistent")
                .with_test_command(Some("cargo test".to_string()))
                .plan(&state.goal, Intent::Fix, &[]),
        );
        state.iteration = 2;
        state.current_role = Role::Retriever.into();

        let state = h.orchestrator.run(state);
        assert_eq!(state.iteration, 3);
        assert_eq!(state.verdict, Some(Verdict::Error));
        assert_eq!(state.current_role, RoleCursor::Known(Role::End));
        assert_eq!(state.error, None);
        assert_eq!(roles(&state).last(), Some(&Role::Reflector));
        assert!(state.response.unwrap().contains("Stopped after 3 attempt(s)"));
        // no revision is requested for an attempt that will never run
        assert_eq!(h.provider.remaining(), 0);
    }

    #[test]
    fn scenario_backend_down_during_classification() {
        let h = harness(
            ScriptedProvider::new().fail(LlmError::Unavailable("connection refused".to_string())),
            MemoryTools::new(),
            3,
        );

        let outcome = h.orchestrator.process_goal("add a --json flag", None);
        assert!(outcome.response.contains("connection refused"));
        assert!(outcome.response.contains("LLM backend is running"));
        let state = &outcome.state;
        assert_eq!(state.current_role, RoleCursor::Known(Role::End));
        assert!(state.error.is_some());
        assert_eq!(state.intent, None);
        assert_eq!(state.plan, None);
        assert_eq!(state.context, "");
        assert_eq!(state.diff, "");
        assert_eq!(state.run_result, None);
        assert_eq!(state.verdict, None);
    }

    #[test]
    fn test_feature_opens_draft_pr() {
        let h = harness(
            ScriptedProvider::new()
                .reply("feature")
                .reply("context")
                .reply(EDIT),
            MemoryTools::new().with_exit(0, "ok"),
            3,
        );

        let outcome = h.orchestrator.process_goal("add a --json flag", None);
        let state = &outcome.state;
        assert_eq!(roles(state).last(), Some(&Role::PrBot));
        let pr_url = state.pr_url.as_deref().unwrap();
        assert_eq!(pr_url, format!("draft://{}", state.run_id));
        assert!(outcome.response.starts_with("Opened pull request"));
    }

    #[test]
    fn test_unrecognized_cursor_self_heals_once() {
        let h = harness(
            ScriptedProvider::new().reply("All good."),
            MemoryTools::new(),
            3,
        );

        let mut state = WorkflowState::new("hello");
        state.intent = Some(Intent::DirectChat);
        state.plan = Some(Default::default());
        state.current_role = RoleCursor::parse("janitor");

        let state = h.orchestrator.run(state);
        assert_eq!(state.reroutes, 1);
        assert_eq!(state.error, None);
        assert_eq!(state.response.as_deref(), Some("All good."));
    }

    #[test]
    fn test_second_fail_closed_terminates() {
        let h = harness(ScriptedProvider::new(), MemoryTools::new(), 3);

        let mut state = WorkflowState::new("hello");
        state.reroutes = 1;
        state.current_role = RoleCursor::parse("janitor");

        let state = h.orchestrator.run(state);
        assert_eq!(state.current_role, RoleCursor::Known(Role::End));
        assert!(state.error.unwrap().contains("Unroutable"));
        assert!(h.provider.requests().is_empty());
    }

    #[test]
    fn test_cancelled_before_first_role() {
        let h = harness(ScriptedProvider::new().reply("fix"), MemoryTools::new(), 3);
        h.orchestrator.cancellation_token().cancel();

        let state = h.orchestrator.run(WorkflowState::new("fix it"));
        assert_eq!(state.error.as_deref(), Some("cancelled"));
        assert_eq!(state.current_role, RoleCursor::Known(Role::End));
        assert_eq!(h.provider.remaining(), 1);
    }

    #[test]
    fn test_next_turn_starts_fresh_run() {
        let h = harness(
            ScriptedProvider::new()
                .reply("direct_chat")
                .reply("Hi!")
                .reply("direct_chat")
                .reply("Bye!"),
            MemoryTools::new(),
            3,
        );

        let first = h.orchestrator.process_goal("hello", None);
        let second = h.orchestrator.process_goal("goodbye", Some(first.state.clone()));
        assert_eq!(second.response, "Bye!");
        assert_ne!(second.state.run_id, first.state.run_id);
        assert_eq!(second.state.goal, "goodbye");
        // classification plus the direct answer, once per turn
        assert_eq!(second.state.history.len(), 4);
    }

    #[test]
    fn test_iteration_never_exceeds_cap() {
        for max in 1..=3 {
            let mut provider = ScriptedProvider::new().reply("fix");
            let mut tools = MemoryTools::new();
            for attempt in 1..=max {
                provider = provider.reply("context").reply(EDIT);
                if attempt < max {
                    provider = provider.reply(REVISION);
                }
                tools = tools.with_exit(1, "fail");
            }
            let h = harness(provider, tools, max);

            let outcome = h.orchestrator.process_goal("fix it", None);
            assert_eq!(outcome.state.iteration, max);
            assert_eq!(outcome.state.verdict, Some(Verdict::Error));
            assert_eq!(h.tools.commands().len(), max as usize);
            assert_eq!(h.provider.remaining(), 0);
        }
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let err = Orchestrator::new(
            Arc::new(ScriptedProvider::new()),
            Arc::new(MemoryTools::new()),
            Arc::new(DraftPublisher::for_workspace(Path::new("/nonexistent"))),
            settings(0),
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            DevAgentError::Config(ConfigError::InvalidValue { .. })
        ));
    }

    fn editing(reroutes: u32) -> WorkflowState {
        let mut state = WorkflowState::new("fix it");
        state.intent = Some(Intent::Fix);
        state.current_role = Role::Editor.into();
        state.reroutes = reroutes;
        state
    }

    #[test]
    fn test_rejected_proposal_returns_to_dispatcher_once() {
        let h = harness(ScriptedProvider::new(), MemoryTools::new(), 3);

        let state = h
            .orchestrator
            .apply_handoff(Role::Editor, Handoff::new(editing(0), Role::PrBot));
        assert_eq!(state.current_role, RoleCursor::Known(Role::Dispatcher));
        assert_eq!(state.reroutes, 1);
        assert_eq!(state.error, None);
    }

    #[test]
    fn test_second_rejected_proposal_is_unroutable() {
        let h = harness(ScriptedProvider::new(), MemoryTools::new(), 3);

        let state = h
            .orchestrator
            .apply_handoff(Role::Editor, Handoff::new(editing(1), Role::PrBot));
        assert_eq!(state.current_role, RoleCursor::Known(Role::End));
        let error = state.error.unwrap();
        assert!(error.contains("Unroutable"));
        assert!(error.contains("editor -> pr_bot"));
        assert!(state.response.unwrap().contains("/reset"));
    }

    #[test]
    fn test_aborting_specialist_skips_adjacency_check() {
        let h = harness(ScriptedProvider::new(), MemoryTools::new(), 3);
        let mut state = editing(0);
        state.fail("Editor failed: Provider unavailable");

        // reflector -> end is not adjacent, but an abort always ends the run
        let state = h
            .orchestrator
            .apply_handoff(Role::Reflector, Handoff::new(state, Role::End));
        assert_eq!(state.current_role, RoleCursor::Known(Role::End));
        assert_eq!(state.reroutes, 0);
    }

    /// Cancels the run as soon as the n-th reply has been handed out
    struct CancelAfter {
        inner: ScriptedProvider,
        token: CancellationToken,
        after: usize,
        calls: std::sync::atomic::AtomicUsize,
    }

    impl LlmProvider for CancelAfter {
        fn id(&self) -> &str {
            self.inner.id()
        }

        fn name(&self) -> &str {
            self.inner.name()
        }

        fn model(&self) -> String {
            self.inner.model()
        }

        fn status(&self) -> ProviderStatus {
            self.inner.status()
        }

        fn generate(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
            let reply = self.inner.generate(messages);
            if self.calls.fetch_add(1, Ordering::SeqCst) + 1 == self.after {
                self.token.cancel();
            }
            reply
        }
    }

    #[test]
    fn test_cancel_between_roles_keeps_completed_work() {
        let token = CancellationToken::new();
        let provider = Arc::new(CancelAfter {
            inner: ScriptedProvider::new()
                .reply("fix")
                .reply("parser context")
                .reply(EDIT),
            token: token.clone(),
            after: 2,
            calls: Default::default(),
        });
        let tools = Arc::new(MemoryTools::new().with_exit(0, "ok"));
        let orchestrator = Orchestrator::new(
            provider.clone(),
            tools.clone(),
            Arc::new(DraftPublisher::for_workspace(Path::new("/nonexistent"))),
            settings(3),
        )
        .unwrap()
        .with_cancellation(token);

        let outcome = orchestrator.process_goal("fix the parser", None);
        let state = &outcome.state;
        assert_eq!(state.error.as_deref(), Some("cancelled"));
        assert_eq!(state.current_role, RoleCursor::Known(Role::End));
        assert!(outcome.response.contains("Cancelled before the editor step"));

        // the retriever finished; the editor never ran
        assert_eq!(roles(state), vec![Role::Dispatcher, Role::Retriever]);
        assert_eq!(state.context, "parser context");
        assert_eq!(state.plan.as_ref().unwrap().workflow[0], Role::Retriever);
        assert_eq!(state.diff, "");
        assert_eq!(provider.inner.remaining(), 1);
        assert!(tools.commands().is_empty());
    }
}
