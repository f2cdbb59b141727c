//! Ollama LLM provider
//!
//! Connects to a local Ollama instance for chat completions.

use super::{ChatMessage, LlmError, LlmProvider, ProviderStatus};
use parking_lot::RwLock;
use std::time::Duration;

/// Default Ollama endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Ollama provider for local LLM inference
pub struct OllamaProvider {
    /// Base URL for Ollama API
    base_url: String,

    /// Model to use
    model: RwLock<String>,

    /// Wall-clock bound per request
    timeout: Duration,

    /// HTTP agent
    client: ureq::Agent,
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new(DEFAULT_OLLAMA_URL, "llama3.1:8b")
    }
}

impl OllamaProvider {
    /// Create a new Ollama provider
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: RwLock::new(model.to_string()),
            timeout: Duration::from_secs(120),
            client: ureq::Agent::new(),
        }
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Switch model
    pub fn set_model(&self, model: &str) {
        *self.model.write() = model.to_string();
    }

    /// Check if Ollama is running
    fn check_connection(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        self.client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .call()
            .is_ok()
    }
}

impl LlmProvider for OllamaProvider {
    fn id(&self) -> &str {
        "ollama"
    }

    fn name(&self) -> &str {
        "Ollama"
    }

    fn model(&self) -> String {
        self.model.read().clone()
    }

    fn status(&self) -> ProviderStatus {
        if self.check_connection() {
            ProviderStatus::Ready
        } else {
            ProviderStatus::Unavailable("Cannot connect to Ollama".to_string())
        }
    }

    fn generate(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let model = self.model();
        let body = serde_json::json!({
            "model": model,
            "messages": messages.iter().map(ChatMessage::to_json).collect::<Vec<_>>(),
            "stream": false
        });

        tracing::debug!(provider = "ollama", %model, messages = messages.len(), "sending chat request");

        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .set("Content-Type", "application/json")
            .send_json(&body)
            .map_err(|e| LlmError::from_ureq(e, self.timeout.as_secs()))?;

        let json: serde_json::Value = response
            .into_json()
            .map_err(|e| LlmError::malformed(e.to_string()))?;

        parse_chat_reply(&json)
    }
}

/// Extract the assistant text from an `/api/chat` reply
fn parse_chat_reply(json: &serde_json::Value) -> Result<String, LlmError> {
    if let Some(error) = json.get("error").and_then(|e| e.as_str()) {
        if error.contains("not found") {
            return Err(LlmError::ModelNotFound(error.to_string()));
        }
        return Err(LlmError::Api {
            status: 500,
            message: error.to_string(),
        });
    }

    json.get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| LlmError::malformed("Invalid Ollama response"))
}
