//! Configuration types for DevAgent
//!
//! Defines the structure of `.devagent.toml` configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevAgentConfig {
    /// LLM configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Workflow limits and defaults
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Tool capability limits
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Pull request publishing
    #[serde(default)]
    pub pr: PrConfig,
}

/// LLM configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Default provider to use (ollama, openai)
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Provider configurations
    #[serde(default = "default_providers")]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_timeout() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            timeout: default_timeout(),
            providers: default_providers(),
        }
    }
}

/// Individual provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Whether this provider is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// API key (supports ${ENV_VAR} syntax)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL for the API
    #[serde(default)]
    pub base_url: Option<String>,

    /// Default model for this provider
    #[serde(default)]
    pub default_model: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: None,
            default_model: None,
        }
    }
}

/// Create default provider configurations
fn default_providers() -> HashMap<String, ProviderConfig> {
    let mut providers = HashMap::new();

    // Ollama - local, no API key needed
    providers.insert(
        "ollama".to_string(),
        ProviderConfig {
            enabled: true,
            api_key: None,
            base_url: Some("http://localhost:11434".to_string()),
            default_model: Some("llama3.1:8b".to_string()),
        },
    );

    // OpenAI - requires API key
    providers.insert(
        "openai".to_string(),
        ProviderConfig {
            enabled: false, // Disabled by default until API key is set
            api_key: None,
            base_url: Some("https://api.openai.com/v1".to_string()),
            default_model: Some("gpt-4o-mini".to_string()),
        },
    );

    providers
}

/// Workflow section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Upper bound on reflection iterations per run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Test command; detected from the workspace when unset
    #[serde(default)]
    pub test_command: Option<String>,
}

fn default_max_iterations() -> u32 {
    3
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            test_command: None,
        }
    }
}

/// Tools section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Shell command timeout in seconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout: u64,

    /// Maximum bytes of a single file pulled into context
    #[serde(default = "default_max_read_bytes")]
    pub max_read_bytes: usize,
}

fn default_command_timeout() -> u64 {
    30
}

fn default_max_read_bytes() -> usize {
    64 * 1024
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            command_timeout: default_command_timeout(),
            max_read_bytes: default_max_read_bytes(),
        }
    }
}

/// Which PR publisher the pr_bot uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublisherKind {
    /// Write the PR description to a local draft file
    #[default]
    Draft,
    /// Open a real PR with the GitHub CLI
    Gh,
}

/// PR section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrConfig {
    #[serde(default)]
    pub publisher: PublisherKind,
}

impl DevAgentConfig {
    /// Get a provider config by name
    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.llm.providers.get(name)
    }

    /// Get the default provider config
    pub fn default_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider(&self.llm.default_provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = DevAgentConfig::default();
        assert_eq!(config.llm.default_provider, "ollama");
        assert_eq!(config.llm.timeout, 120);
        assert_eq!(config.workflow.max_iterations, 3);
        assert_eq!(config.tools.command_timeout, 30);
        assert_eq!(config.pr.publisher, PublisherKind::Draft);
        assert!(config.default_provider_config().unwrap().enabled);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: DevAgentConfig = toml::from_str(
            r#"
            [workflow]
            max_iterations = 5

            [pr]
            publisher = "gh"
            "#,
        )
        .unwrap();
        assert_eq!(config.workflow.max_iterations, 5);
        assert_eq!(config.workflow.test_command, None);
        assert_eq!(config.pr.publisher, PublisherKind::Gh);
        assert!(config.llm.providers.contains_key("ollama"));
    }
}
