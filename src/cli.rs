//! Command-line arguments and REPL input handling

use clap::Parser;
use devagent_core::{RoleCursor, WorkflowState};
use std::path::PathBuf;

/// DevAgent - Your local AI coding assistant
#[derive(Debug, Parser)]
#[command(name = "devagent", version, about)]
pub struct Args {
    /// Workspace directory (defaults to the current directory)
    #[arg(short, long)]
    pub workspace: Option<PathBuf>,

    /// LLM provider to use (ollama, openai)
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Model name for the selected provider
    #[arg(short, long)]
    pub model: Option<String>,

    /// Upper bound on retry iterations
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_iterations: Option<u32>,

    /// Run a single goal and exit
    #[arg(long, value_name = "GOAL")]
    pub once: Option<String>,

    /// Continue from the saved session in the workspace
    #[arg(long)]
    pub resume: bool,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// One line typed at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Goal(String),
    Reset,
    State,
    Help,
    Exit,
    Empty,
    Unknown(String),
}

impl Input {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Input::Empty;
        }
        if !line.starts_with('/') {
            return Input::Goal(line.to_string());
        }
        match line.split_whitespace().next().unwrap_or_default() {
            "/reset" => Input::Reset,
            "/state" => Input::State,
            "/help" => Input::Help,
            "/exit" | "/quit" => Input::Exit,
            other => Input::Unknown(other.to_string()),
        }
    }
}

pub const HELP: &str = "\
Type a goal in plain language, for example:
  explain how the config loader works
  fix the failing test in src/parser.rs
  add a --json flag to the list command

Commands:
  /state   show the current workflow state
  /reset   forget the conversation and start fresh
  /help    show this help
  /exit    quit (also /quit)

Ctrl-C cancels a running request; press it again while idle to quit.";

/// Short human summary of a state for `/state`
pub fn describe_state(state: &WorkflowState) -> String {
    let mut lines = vec![
        format!("run:        {}", state.run_id),
        format!("goal:       {}", state.goal),
        format!(
            "intent:     {}",
            state.intent.map(|i| i.to_string()).unwrap_or_else(|| "-".to_string())
        ),
        format!("role:       {}", cursor_label(&state.current_role)),
        format!("iteration:  {}", state.iteration),
    ];

    if let Some(plan) = &state.plan {
        let workflow: Vec<&str> = plan.workflow.iter().map(|r| r.as_str()).collect();
        lines.push(format!("workflow:   {}", workflow.join(" -> ")));
        if let Some(command) = &plan.test_command {
            lines.push(format!("tests:      {}", command));
        }
        if !plan.target_files.is_empty() {
            let files: Vec<&str> = plan.target_files.iter().map(String::as_str).collect();
            lines.push(format!("files:      {}", files.join(", ")));
        }
    }
    if let Some(verdict) = state.verdict {
        lines.push(format!("verdict:    {:?}", verdict).to_lowercase());
    }
    if let Some(url) = &state.pr_url {
        lines.push(format!("pr:         {}", url));
    }
    if let Some(error) = &state.error {
        lines.push(format!("error:      {}", error));
    }
    lines.push(format!("history:    {} step(s)", state.history.len()));
    lines.join("\n")
}

fn cursor_label(cursor: &RoleCursor) -> String {
    match cursor {
        RoleCursor::Known(role) => role.to_string(),
        RoleCursor::Unrecognized(name) => format!("{} (unrecognized)", name),
    }
}
