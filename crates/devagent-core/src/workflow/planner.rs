//! Plan construction
//!
//! Maps an intent onto a fixed role workflow and fills in the details the
//! specialists need: readable steps, target files and the test command.

use super::state::{Intent, Plan, Role};
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Role order for an intent
pub fn workflow_for(intent: Intent) -> Vec<Role> {
    match intent {
        Intent::Explain => vec![Role::Retriever],
        Intent::Feature => vec![
            Role::Retriever,
            Role::Editor,
            Role::Executor,
            Role::Verifier,
            Role::PrBot,
        ],
        Intent::Fix => vec![Role::Retriever, Role::Editor, Role::Executor, Role::Verifier],
        Intent::Pr => vec![Role::PrBot],
        Intent::DirectChat | Intent::Unknown => Vec::new(),
    }
}

/// Builds plans for one workspace
#[derive(Debug, Clone)]
pub struct Planner {
    workspace: PathBuf,
    test_command: Option<String>,
}

impl Planner {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            test_command: None,
        }
    }

    /// Use a fixed test command instead of detecting one
    pub fn with_test_command(mut self, command: Option<String>) -> Self {
        self.test_command = command.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn plan(&self, goal: &str, intent: Intent, referenced_files: &[String]) -> Plan {
        let workflow = workflow_for(intent);

        let test_command = if workflow.contains(&Role::Executor) {
            self.test_command
                .clone()
                .or_else(|| detect_test_command(&self.workspace))
        } else {
            None
        };

        let steps = workflow
            .iter()
            .map(|role| describe_step(*role, test_command.as_deref()))
            .collect();

        let mut target_files: BTreeSet<String> = referenced_files.iter().cloned().collect();
        if !workflow.is_empty() {
            target_files.extend(extract_paths(goal));
        }

        Plan {
            workflow,
            steps,
            test_command,
            target_files,
            retry_reason: None,
            attempt: 0,
        }
    }
}

fn describe_step(role: Role, test_command: Option<&str>) -> String {
    match role {
        Role::Retriever => "Gather code context relevant to the goal".to_string(),
        Role::Editor => "Apply code changes for the goal".to_string(),
        Role::Executor => match test_command {
            Some(command) => format!("Run `{}`", command),
            None => "Run the test suite (no test command detected)".to_string(),
        },
        Role::Verifier => "Check the test result".to_string(),
        Role::PrBot => "Open a pull request with the changes".to_string(),
        Role::Dispatcher | Role::Reflector | Role::End => role.display_name().to_string(),
    }
}

/// Guess the test command from the project's build files
pub fn detect_test_command(workspace: &Path) -> Option<String> {
    const MARKERS: &[(&str, &str)] = &[
        ("Cargo.toml", "cargo test"),
        ("package.json", "npm test"),
        ("pyproject.toml", "pytest"),
        ("setup.py", "pytest"),
        ("go.mod", "go test ./..."),
    ];

    MARKERS
        .iter()
        .find(|(marker, _)| workspace.join(marker).is_file())
        .map(|(_, command)| command.to_string())
}

fn path_token_regex() -> &'static Regex {
    static PATH_TOKEN: OnceLock<Regex> = OnceLock::new();
    PATH_TOKEN.get_or_init(|| {
        Regex::new(
            r"^(?:[\w.-]+/)+[\w.-]+$|^[\w.-]+\.(?:rs|py|js|jsx|ts|tsx|go|java|kt|c|h|cc|cpp|hpp|rb|php|cs|swift|toml|json|yaml|yml|md|sh)$",
        )
        .unwrap_or_else(|_| unreachable!("static pattern is valid"))
    })
}

/// Path-like tokens mentioned in a goal
pub fn extract_paths(goal: &str) -> Vec<String> {
    let regex = path_token_regex();
    let mut paths: Vec<String> = goal
        .split_whitespace()
        .map(|token| {
            token
                .trim_matches(|c: char| matches!(c, '`' | '"' | '\'' | '(' | ')' | ',' | ';' | ':'))
                .trim_end_matches(['.', '?', '!'])
                .trim_start_matches("./")
        })
        .filter(|token| !token.is_empty() && regex.is_match(token))
        .map(str::to_string)
        .collect();
    paths.dedup();
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_workflow_table() {
        let planner = Planner::new("/nonexistent");
        let table = [
            (Intent::Explain, vec![Role::Retriever], Role::Retriever),
            (
                Intent::Feature,
                vec![
                    Role::Retriever,
                    Role::Editor,
                    Role::Executor,
                    Role::Verifier,
                    Role::PrBot,
                ],
                Role::Retriever,
            ),
            (
                Intent::Fix,
                vec![Role::Retriever, Role::Editor, Role::Executor, Role::Verifier],
                Role::Retriever,
            ),
            (Intent::Pr, vec![Role::PrBot], Role::PrBot),
            (Intent::DirectChat, vec![], Role::End),
            (Intent::Unknown, vec![], Role::End),
        ];

        for (intent, workflow, entry) in table {
            let plan = planner.plan("do the thing", intent, &[]);
            assert_eq!(plan.workflow, workflow, "{intent}");
            assert_eq!(plan.entry_role(), entry, "{intent}");
            assert_eq!(plan.steps.len(), plan.workflow.len());
            assert_eq!(plan.attempt, 0);
            assert_eq!(plan.retry_reason, None);
        }
    }

    #[test]
    fn test_detects_test_command() {
        let dir = TempDir::new().unwrap();
        assert_eq!(detect_test_command(dir.path()), None);

        std::fs::write(dir.path().join("go.mod"), "module x").unwrap();
        assert_eq!(detect_test_command(dir.path()).as_deref(), Some("go test ./..."));

        std::fs::write(dir.path().join("Cargo.toml"), "[package]").unwrap();
        assert_eq!(detect_test_command(dir.path()).as_deref(), Some("cargo test"));
    }

    #[test]
    fn test_configured_command_wins_for_executing_workflows() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]").unwrap();
        let planner = Planner::new(dir.path()).with_test_command(Some("make test".to_string()));

        let fix = planner.plan("fix it", Intent::Fix, &[]);
        assert_eq!(fix.test_command.as_deref(), Some("make test"));
        assert_eq!(fix.steps[2], "Run `make test`");

        let explain = planner.plan("explain it", Intent::Explain, &[]);
        assert_eq!(explain.test_command, None);
    }

    #[test]
    fn test_target_files_from_goal_and_references() {
        let planner = Planner::new("/nonexistent");
        let plan = planner.plan(
            "Fix the overflow in `src/parser.rs` and update ./README.md.",
            Intent::Fix,
            &["src/lib.rs".to_string()],
        );
        let files: Vec<&str> = plan.target_files.iter().map(String::as_str).collect();
        assert_eq!(files, vec!["README.md", "src/lib.rs", "src/parser.rs"]);
    }

    #[test]
    fn test_extract_paths_ignores_prose() {
        assert_eq!(extract_paths("please explain how this works"), Vec::<String>::new());
        assert_eq!(
            extract_paths("what does main.rs do?"),
            vec!["main.rs".to_string()]
        );
        assert_eq!(
            extract_paths("see https://example.com/x"),
            Vec::<String>::new()
        );
    }
}
