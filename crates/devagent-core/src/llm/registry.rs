//! Provider registry for building and selecting LLM providers

use super::{
    LlmError, OllamaProvider, OpenAIProvider, ProviderStatus, SharedProvider, DEFAULT_OLLAMA_URL,
};
use crate::config::{DevAgentConfig, ProviderConfig};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Registry for managing multiple LLM providers
pub struct ProviderRegistry {
    /// All registered providers
    providers: HashMap<String, SharedProvider>,

    /// Currently active provider ID
    active_provider: RwLock<String>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            active_provider: RwLock::new(String::new()),
        }
    }

    /// Create a registry from configuration
    ///
    /// Every enabled provider with a known id is instantiated; the configured
    /// default becomes the active provider.
    pub fn from_config(config: &DevAgentConfig) -> Self {
        let mut registry = Self::new();
        let timeout = Duration::from_secs(config.llm.timeout);

        for (id, provider_config) in &config.llm.providers {
            if !provider_config.enabled {
                continue;
            }
            match build_provider(id, provider_config, timeout) {
                Some(provider) => registry.register(provider),
                None => tracing::warn!(provider = %id, "ignoring unknown provider in config"),
            }
        }

        *registry.active_provider.write() = config.llm.default_provider.clone();
        registry
    }

    /// Register a provider
    pub fn register(&mut self, provider: SharedProvider) {
        let id = provider.id().to_string();
        self.providers.insert(id, provider);
    }

    /// Get a provider by ID
    pub fn get(&self, id: &str) -> Option<SharedProvider> {
        self.providers.get(id).cloned()
    }

    /// Get the currently active provider
    pub fn active(&self) -> Result<SharedProvider, LlmError> {
        let id = self.active_provider.read().clone();
        self.get(&id).ok_or_else(|| {
            LlmError::Unavailable(format!("Provider '{}' is not configured or not enabled", id))
        })
    }

    /// Set the active provider
    pub fn set_active(&self, id: &str) -> Result<(), LlmError> {
        if !self.providers.contains_key(id) {
            return Err(LlmError::Unavailable(format!(
                "Provider '{}' not registered",
                id
            )));
        }
        *self.active_provider.write() = id.to_string();
        Ok(())
    }

    /// Get active provider ID
    pub fn active_id(&self) -> String {
        self.active_provider.read().clone()
    }

    /// Get all registered provider IDs, sorted
    pub fn provider_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Get display info for all providers
    pub fn provider_info(&self) -> Vec<ProviderInfo> {
        let mut info: Vec<ProviderInfo> = self
            .providers
            .values()
            .map(|p| ProviderInfo {
                id: p.id().to_string(),
                name: p.name().to_string(),
                model: p.model(),
            })
            .collect();
        info.sort_by(|a, b| a.id.cmp(&b.id));
        info
    }

    /// Check whether the active provider is reachable
    pub fn active_status(&self) -> ProviderStatus {
        match self.active() {
            Ok(provider) => provider.status(),
            Err(e) => ProviderStatus::Unavailable(e.to_string()),
        }
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Instantiate a provider from its config section
fn build_provider(id: &str, config: &ProviderConfig, timeout: Duration) -> Option<SharedProvider> {
    match id {
        "ollama" => {
            let base_url = config.base_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL);
            let model = config.default_model.as_deref().unwrap_or("llama3.1:8b");
            Some(Arc::new(
                OllamaProvider::new(base_url, model).with_timeout(timeout),
            ))
        }
        "openai" => {
            let api_key = config.api_key.as_deref().unwrap_or_default();
            let model = config.default_model.as_deref().unwrap_or("gpt-4o-mini");
            let mut provider = OpenAIProvider::new(api_key, model).with_timeout(timeout);
            if let Some(base_url) = config.base_url.as_deref() {
                provider = provider.with_base_url(base_url);
            }
            Some(Arc::new(provider))
        }
        _ => None,
    }
}

/// Provider information for display
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    pub id: String,
    pub name: String,
    pub model: String,
}

impl ProviderInfo {
    /// Get a display string for the provider
    pub fn display(&self) -> String {
        format!("{} ({})", self.name, self.model)
    }
}
