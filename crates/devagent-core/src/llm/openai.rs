//! OpenAI LLM provider
//!
//! Connects to OpenAI's API (or any OpenAI-compatible endpoint) for chat completions.

use super::{ChatMessage, LlmError, LlmProvider, ProviderStatus};
use parking_lot::RwLock;
use std::time::Duration;

/// Default OpenAI endpoint
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// OpenAI provider
pub struct OpenAIProvider {
    /// API key
    api_key: String,

    /// Base URL for the API (supports OpenAI-compatible APIs)
    base_url: String,

    /// Current model
    model: RwLock<String>,

    /// Wall-clock bound per request
    timeout: Duration,

    /// HTTP agent
    client: ureq::Agent,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: DEFAULT_OPENAI_URL.to_string(),
            model: RwLock::new(model.to_string()),
            timeout: Duration::from_secs(120),
            client: ureq::Agent::new(),
        }
    }

    /// Create with a specific base URL (for OpenAI-compatible APIs like Azure, local proxies)
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl LlmProvider for OpenAIProvider {
    fn id(&self) -> &str {
        "openai"
    }

    fn name(&self) -> &str {
        "OpenAI"
    }

    fn model(&self) -> String {
        self.model.read().clone()
    }

    fn status(&self) -> ProviderStatus {
        if self.api_key.is_empty() {
            ProviderStatus::Unavailable("No API key configured".to_string())
        } else {
            ProviderStatus::Ready
        }
    }

    fn generate(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        if self.api_key.is_empty() {
            return Err(LlmError::Unavailable(
                "OpenAI provider has no API key configured".to_string(),
            ));
        }

        let model = self.model();
        let body = serde_json::json!({
            "model": model,
            "messages": messages.iter().map(ChatMessage::to_json).collect::<Vec<_>>(),
            "temperature": 0.2
        });

        tracing::debug!(provider = "openai", %model, messages = messages.len(), "sending chat request");

        let response = self
            .client
            .post(&format!("{}/chat/completions", self.base_url))
            .timeout(self.timeout)
            .set("Content-Type", "application/json")
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(&body)
            .map_err(|e| LlmError::from_ureq(e, self.timeout.as_secs()))?;

        let json: serde_json::Value = response
            .into_json()
            .map_err(|e| LlmError::malformed(e.to_string()))?;

        parse_completion(&json)
    }
}

/// Extract the first choice's content from a chat completion
fn parse_completion(json: &serde_json::Value) -> Result<String, LlmError> {
    if let Some(error) = json.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error");
        return Err(LlmError::Api {
            status: 500,
            message: message.to_string(),
        });
    }

    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| LlmError::malformed("Invalid OpenAI response"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completion() {
        let json = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "feature"}}]
        });
        assert_eq!(parse_completion(&json).unwrap(), "feature");
    }

    #[test]
    fn test_parse_error_body() {
        let json = serde_json::json!({"error": {"message": "bad model"}});
        assert!(matches!(
            parse_completion(&json),
            Err(LlmError::Api { message, .. }) if message == "bad model"
        ));
    }

    #[test]
    fn test_missing_key_is_unavailable() {
        let provider = OpenAIProvider::new("", "gpt-4o-mini");
        assert!(!provider.status().is_ready());
        let err = provider.generate(&[ChatMessage::user("hi")]).unwrap_err();
        assert!(matches!(err, LlmError::Unavailable(_)));
    }

    #[test]
    fn test_with_base_url() {
        let provider = OpenAIProvider::new("k", "m").with_base_url("http://localhost:8000/v1/");
        assert_eq!(provider.base_url, "http://localhost:8000/v1");
    }
}
