//! Chat message types

use serde::{Deserialize, Serialize};

/// Role in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// Chat message for LLM interaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Get the role as a string (for API compatibility)
    pub fn role_str(&self) -> &'static str {
        self.role.as_str()
    }

    /// Render as a JSON object for chat-completion style APIs
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "role": self.role_str(),
            "content": self.content,
        })
    }
}

/// Format file context for an LLM prompt
pub fn format_file_context(path: &str, content: &str) -> String {
    format!(
        "<file_context>\nFile: {}\n```\n{}\n```\n</file_context>",
        path, content
    )
}

/// Strip surrounding markdown code fences from a model reply
pub fn strip_code_fences(content: &str) -> &str {
    content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}
