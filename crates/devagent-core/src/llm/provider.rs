//! Capability provider trait

use super::{ChatMessage, LlmError};

/// Provider status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    /// Ready to accept requests
    Ready,

    /// Not available (no API key, server down, etc.)
    Unavailable(String),
}

impl ProviderStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ProviderStatus::Ready)
    }
}

/// LLM provider trait
///
/// The opaque reasoning backend consumed by the classifier and the specialists.
/// Calls are blocking and must be bounded by the implementation's own timeout.
pub trait LlmProvider: Send + Sync {
    /// Get the provider's unique identifier (e.g., "ollama", "openai")
    fn id(&self) -> &str;

    /// Get the provider's display name
    fn name(&self) -> &str;

    /// Get the currently active model name
    fn model(&self) -> String;

    /// Get current provider status
    fn status(&self) -> ProviderStatus;

    /// Send a conversation and return the complete reply text
    fn generate(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;

    /// Answer a user message directly, without any workflow
    fn direct_chat(&self, user_message: &str) -> Result<String, LlmError> {
        self.generate(&[
            ChatMessage::system(
                "You are a helpful coding assistant. Answer the user's question directly and concisely.",
            ),
            ChatMessage::user(user_message),
        ])
    }
}

/// Shared handle to a provider, injected into the orchestrator
pub type SharedProvider = std::sync::Arc<dyn LlmProvider>;

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl LlmProvider for Echo {
        fn id(&self) -> &str {
            "echo"
        }

        fn name(&self) -> &str {
            "Echo"
        }

        fn model(&self) -> String {
            "echo-1".to_string()
        }

        fn status(&self) -> ProviderStatus {
            ProviderStatus::Ready
        }

        fn generate(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
            Ok(messages
                .iter()
                .map(|m| format!("{}:{}", m.role_str(), m.content))
                .collect::<Vec<_>>()
                .join("|"))
        }
    }

    #[test]
    fn test_direct_chat_wraps_system_prompt() {
        let reply = Echo.direct_chat("hi").unwrap();
        assert!(reply.starts_with("system:You are a helpful coding assistant"));
        assert!(reply.ends_with("user:hi"));
    }

    #[test]
    fn test_provider_status() {
        assert!(ProviderStatus::Ready.is_ready());
        let status = ProviderStatus::Unavailable("No API key".to_string());
        assert!(!status.is_ready());
        assert!(matches!(status, ProviderStatus::Unavailable(msg) if msg == "No API key"));
    }
}
