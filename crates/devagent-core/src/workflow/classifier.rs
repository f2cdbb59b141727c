//! Intent classification

use super::state::Intent;
use crate::error::PlanningError;
use crate::llm::{ChatMessage, LlmProvider};

const CLASSIFIER_SYSTEM_PROMPT: &str = r#"
You classify software development requests for a coding assistant.

Categories:
- explain: the user wants existing code explained or analyzed
- feature: the user wants new functionality implemented
- fix: the user wants a bug fixed or a failing test repaired
- pr: the user wants a pull request opened for existing changes
- direct_chat: greetings, general questions, anything that needs no code changes

Respond with only the category name.
"#;

/// Classify a goal with the capability provider
pub fn classify(provider: &dyn LlmProvider, goal: &str) -> Result<Intent, PlanningError> {
    let messages = vec![
        ChatMessage::system(CLASSIFIER_SYSTEM_PROMPT),
        ChatMessage::user(goal),
    ];
    let raw = provider.generate(&messages)?;
    let intent = parse_intent(&raw)?;
    tracing::debug!(raw = raw.trim(), %intent, "classified goal");
    Ok(intent)
}

/// Map a raw classifier reply onto an intent
pub fn parse_intent(raw: &str) -> Result<Intent, PlanningError> {
    let label = normalize_label(raw);
    if label.is_empty() {
        return Err(PlanningError::EmptyClassification);
    }
    Ok(Intent::from_label(&label))
}

/// Trim, lowercase, strip surrounding quotes, backticks and periods
pub fn normalize_label(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '.') || c.is_whitespace())
        .to_string()
}
