//! Retriever: gather code context

use super::prompts::RETRIEVER_SYSTEM_PROMPT;
use super::{abort, head, Handoff, Specialist, SpecialistContext};
use crate::llm::{format_file_context, ChatMessage};
use crate::tools::ScopedTools;
use crate::workflow::state::{Role, WorkflowState};

/// Upper bound on files listed in the prompt
const MAX_LISTED_FILES: usize = 200;
/// Upper bound on files scanned for goal keywords
const MAX_SEARCHED_FILES: usize = 50;
const MAX_SEARCH_HITS: usize = 40;

const STOPWORDS: &[&str] = &[
    "about", "after", "also", "does", "from", "have", "into", "make", "more", "please", "should",
    "that", "there", "their", "them", "then", "this", "what", "when", "where", "which", "while",
    "with", "would", "your", "code", "file", "files", "explain", "implement", "feature", "fix",
    "bug", "work", "works",
];

pub struct Retriever {
    max_read_bytes: usize,
}

impl Retriever {
    pub fn new(max_read_bytes: usize) -> Self {
        Self { max_read_bytes }
    }
}

/// What the retriever collected from the workspace
#[derive(Debug, Default)]
struct Gathered {
    files: Vec<(String, String)>,
    missing: Vec<String>,
    listing: Vec<String>,
    hits: Vec<String>,
}

impl Gathered {
    fn render(&self) -> String {
        let mut out = String::new();

        for (path, content) in &self.files {
            out.push_str(&format_file_context(path, content));
            out.push('\n');
        }
        if !self.missing.is_empty() {
            out.push_str(&format!("Unreadable files: {}\n", self.missing.join(", ")));
        }
        if !self.listing.is_empty() {
            out.push_str("\nWorkspace files:\n");
            out.push_str(&self.listing.join("\n"));
            out.push('\n');
        }
        if !self.hits.is_empty() {
            out.push_str("\nSearch hits:\n");
            out.push_str(&self.hits.join("\n"));
            out.push('\n');
        }
        out
    }
}

/// Distinctive words of the goal, used as search keywords
fn keywords(goal: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    for word in goal.split(|c: char| !(c.is_alphanumeric() || c == '_')) {
        let word = word.to_lowercase();
        if word.len() >= 4 && !STOPWORDS.contains(&word.as_str()) && !words.contains(&word) {
            words.push(word);
        }
    }
    words.truncate(3);
    words
}

impl Retriever {
    fn gather(&self, state: &WorkflowState, tools: &ScopedTools) -> Gathered {
        let mut gathered = Gathered::default();

        if let Some(plan) = &state.plan {
            for path in &plan.target_files {
                match tools.read_file(path) {
                    Ok(content) => gathered
                        .files
                        .push((path.clone(), head(&content, self.max_read_bytes).to_string())),
                    Err(err) => {
                        tracing::debug!(path = %path, error = %err, "target file unreadable");
                        gathered.missing.push(path.clone());
                    }
                }
            }
        }

        match tools.find_files("**/*") {
            Ok(mut listing) => {
                listing.truncate(MAX_LISTED_FILES);
                gathered.listing = listing;
            }
            Err(err) => tracing::warn!(error = %err, "workspace listing failed"),
        }

        let words = keywords(&state.goal);
        if !words.is_empty() {
            let pattern = format!(
                "(?i)\\b({})\\b",
                words
                    .iter()
                    .map(|w| regex::escape(w))
                    .collect::<Vec<_>>()
                    .join("|")
            );
            for path in gathered.listing.iter().take(MAX_SEARCHED_FILES) {
                let remaining = MAX_SEARCH_HITS.saturating_sub(gathered.hits.len());
                if remaining == 0 {
                    break;
                }
                let Ok(lines) = tools.search_pattern(&pattern, path) else {
                    continue;
                };
                gathered.hits.extend(
                    lines
                        .into_iter()
                        .take(remaining)
                        .map(|line| format!("{}:{}", path, line)),
                );
            }
        }

        gathered
    }
}

impl Specialist for Retriever {
    fn role(&self) -> Role {
        Role::Retriever
    }

    fn invoke(&self, mut state: WorkflowState, ctx: &SpecialistContext<'_>) -> Handoff {
        let gathered = self.gather(&state, &ctx.tools);

        let mut request = format!("GOAL: {}\n", state.goal);
        if let Some(reason) = state.plan.as_ref().and_then(|p| p.retry_reason.as_deref()) {
            request.push_str(&format!("\nPREVIOUS ATTEMPT FAILED: {}\n", reason));
        }
        request.push_str("\nGATHERED MATERIAL:\n");
        request.push_str(&gathered.render());

        let messages = vec![
            ChatMessage::system(RETRIEVER_SYSTEM_PROMPT),
            ChatMessage::user(request),
        ];
        tracing::debug!(run_id = %state.run_id, bytes = messages[1].content.len(), "retriever request");

        let summary = match ctx.provider.generate(&messages) {
            Ok(summary) => summary.trim().to_string(),
            Err(err) => return abort(state, Role::Retriever, &err),
        };

        state.context = summary;
        state.record(
            Role::Retriever,
            format!(
                "read {} file(s), {} search hit(s)",
                gathered.files.len(),
                gathered.hits.len()
            ),
        );

        if state.plan_contains(Role::Editor) {
            Handoff::new(state, Role::Editor)
        } else {
            state.response = Some(state.context.clone());
            Handoff::new(state, Role::End)
        }
    }
}
