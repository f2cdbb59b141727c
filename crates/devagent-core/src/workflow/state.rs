//! Workflow state types
//!
//! One [`WorkflowState`] record is threaded through every role of a run.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

/// Roles of the workflow, plus the terminal marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Classifies the goal, plans, answers direct chat
    Dispatcher,
    /// Gathers code context
    Retriever,
    /// Generates and applies file edits
    Editor,
    /// Runs the test command
    Executor,
    /// Turns the run result into a verdict
    Verifier,
    /// Revises the plan after a failed verification
    Reflector,
    /// Opens the pull request
    PrBot,
    /// Terminal marker
    End,
}

impl Role {
    /// Every role, in pipeline order
    pub const ALL: [Role; 8] = [
        Role::Dispatcher,
        Role::Retriever,
        Role::Editor,
        Role::Executor,
        Role::Verifier,
        Role::Reflector,
        Role::PrBot,
        Role::End,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Dispatcher => "dispatcher",
            Role::Retriever => "retriever",
            Role::Editor => "editor",
            Role::Executor => "executor",
            Role::Verifier => "verifier",
            Role::Reflector => "reflector",
            Role::PrBot => "pr_bot",
            Role::End => "end",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Dispatcher => "Dispatcher",
            Role::Retriever => "Retriever",
            Role::Editor => "Editor",
            Role::Executor => "Executor",
            Role::Verifier => "Verifier",
            Role::Reflector => "Reflector",
            Role::PrBot => "PR Bot",
            Role::End => "End",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Role::End)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dispatcher" => Ok(Role::Dispatcher),
            "retriever" => Ok(Role::Retriever),
            "editor" => Ok(Role::Editor),
            "executor" => Ok(Role::Executor),
            "verifier" => Ok(Role::Verifier),
            "reflector" => Ok(Role::Reflector),
            "pr_bot" => Ok(Role::PrBot),
            "end" => Ok(Role::End),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Routing cursor
///
/// Holds either a declared role or whatever unrecognized name was written into
/// the state (a hand-edited snapshot, a bad proposal). The router fails closed on
/// the latter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleCursor {
    Known(Role),
    Unrecognized(String),
}

impl RoleCursor {
    pub fn parse(name: &str) -> Self {
        match name.parse::<Role>() {
            Ok(role) => RoleCursor::Known(role),
            Err(_) => RoleCursor::Unrecognized(name.to_string()),
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            RoleCursor::Known(role) => Some(*role),
            RoleCursor::Unrecognized(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RoleCursor::Known(role) => role.as_str(),
            RoleCursor::Unrecognized(name) => name,
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, RoleCursor::Known(Role::End))
    }
}

impl From<Role> for RoleCursor {
    fn from(role: Role) -> Self {
        RoleCursor::Known(role)
    }
}

impl fmt::Display for RoleCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RoleCursor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RoleCursor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(RoleCursor::parse(&name))
    }
}

/// What the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Explain,
    Feature,
    Fix,
    Pr,
    DirectChat,
    Unknown,
}

impl Intent {
    pub const ALL: [Intent; 6] = [
        Intent::Explain,
        Intent::Feature,
        Intent::Fix,
        Intent::Pr,
        Intent::DirectChat,
        Intent::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Explain => "explain",
            Intent::Feature => "feature",
            Intent::Fix => "fix",
            Intent::Pr => "pr",
            Intent::DirectChat => "direct_chat",
            Intent::Unknown => "unknown",
        }
    }

    /// Map an already-normalized classifier label; anything unexpected is `Unknown`
    pub fn from_label(label: &str) -> Self {
        match label {
            "explain" => Intent::Explain,
            "feature" => Intent::Feature,
            "fix" => Intent::Fix,
            "pr" => Intent::Pr,
            "direct_chat" => Intent::DirectChat,
            _ => Intent::Unknown,
        }
    }

    /// Intents answered by the dispatcher without running the pipeline
    pub fn is_conversational(&self) -> bool {
        matches!(self, Intent::DirectChat | Intent::Unknown)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution plan for a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Advisory role order; the router has the final say
    pub workflow: Vec<Role>,
    pub steps: Vec<String>,
    pub test_command: Option<String>,
    pub target_files: BTreeSet<String>,
    pub retry_reason: Option<String>,
    pub attempt: u32,
}

impl Plan {
    pub fn contains(&self, role: Role) -> bool {
        self.workflow.contains(&role)
    }

    /// First role of the workflow, or `End` for an empty workflow
    pub fn entry_role(&self) -> Role {
        self.workflow.first().copied().unwrap_or(Role::End)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failure,
}

/// Outcome of the executor's test run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub status: RunStatus,
    pub output: String,
}

impl RunResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Success,
            output: output.into(),
        }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Failure,
            output: output.into(),
        }
    }

    pub fn passed(&self) -> bool {
        self.status == RunStatus::Success
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
    Error,
}

/// One executed role in the run trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub summary: String,
}

/// The single mutable record threaded through a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub run_id: String,
    pub goal: String,
    /// Files carried over from the previous turn's plan
    #[serde(default)]
    pub referenced_files: Vec<String>,
    #[serde(default)]
    pub intent: Option<Intent>,
    #[serde(default)]
    pub plan: Option<Plan>,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub diff: String,
    #[serde(default)]
    pub run_result: Option<RunResult>,
    #[serde(default)]
    pub verdict: Option<Verdict>,
    #[serde(default)]
    pub iteration: u32,
    pub current_role: RoleCursor,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub pr_url: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub reroutes: u32,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl WorkflowState {
    /// Fresh run for a goal
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            goal: goal.into(),
            referenced_files: Vec::new(),
            intent: None,
            plan: None,
            context: String::new(),
            diff: String::new(),
            run_result: None,
            verdict: None,
            iteration: 0,
            current_role: RoleCursor::Known(Role::Dispatcher),
            error: None,
            response: None,
            pr_url: None,
            failure_reason: None,
            reroutes: 0,
            history: Vec::new(),
        }
    }

    /// Start the next conversational turn from a prior state
    ///
    /// The goal is replaced wholesale and every run output is cleared. The role
    /// trace and the previous plan's target files carry over.
    pub fn next_turn(prior: WorkflowState, goal: impl Into<String>) -> Self {
        let mut state = Self::new(goal);
        state.referenced_files = match prior.plan {
            Some(plan) if !plan.target_files.is_empty() => {
                plan.target_files.into_iter().collect()
            }
            _ => prior.referenced_files,
        };
        state.history = prior.history;
        state
    }

    pub fn is_finished(&self) -> bool {
        self.current_role.is_end()
    }

    pub fn plan_contains(&self, role: Role) -> bool {
        self.plan.as_ref().is_some_and(|plan| plan.contains(role))
    }

    /// Record an abort; no further specialist runs once this is set
    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn record(&mut self, role: Role, summary: impl Into<String>) {
        self.history.push(HistoryEntry {
            role,
            summary: summary.into(),
        });
    }
}
