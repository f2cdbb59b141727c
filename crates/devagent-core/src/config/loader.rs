//! Configuration loader with environment variable expansion
//!
//! Loads configuration from `.devagent.toml` in the workspace root or the user config directory.

use super::types::{DevAgentConfig, ProviderConfig};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Project-level config file name
pub const PROJECT_CONFIG_FILE: &str = ".devagent.toml";

/// Configuration loading error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Load configuration from various sources
///
/// Priority order:
/// 1. Project-level `.devagent.toml`
/// 2. User-level `~/.config/devagent/config.toml`
/// 3. Default configuration
///
/// Environment overrides are applied on top of whichever source wins.
pub fn load_config(project_dir: &Path) -> Result<DevAgentConfig, ConfigError> {
    let project_config = project_dir.join(PROJECT_CONFIG_FILE);
    if project_config.exists() {
        return load_from_file(&project_config);
    }

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            return load_from_file(&user_config);
        }
    }

    apply_env_overrides(DevAgentConfig::default())
}

/// Get user config file path
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("devagent").join("config.toml"))
}

/// Load configuration from a specific file
pub fn load_from_file(path: &Path) -> Result<DevAgentConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: DevAgentConfig = toml::from_str(&content)?;

    expand_env_vars(&mut config);

    let config = apply_env_overrides(config)?;
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

fn env_regex() -> &'static Regex {
    static ENV_REGEX: OnceLock<Regex> = OnceLock::new();
    ENV_REGEX.get_or_init(|| {
        Regex::new(r"\$\{([^}]+)\}").unwrap_or_else(|_| unreachable!("static pattern is valid"))
    })
}

/// Expand ${VAR} patterns in string values
fn expand_env_vars(config: &mut DevAgentConfig) {
    let env_regex = env_regex();

    for provider in config.llm.providers.values_mut() {
        if let Some(ref api_key) = provider.api_key {
            provider.api_key = Some(expand_string(api_key, env_regex));
        }
        if let Some(ref base_url) = provider.base_url {
            provider.base_url = Some(expand_string(base_url, env_regex));
        }
    }

    if let Some(ref command) = config.workflow.test_command {
        config.workflow.test_command = Some(expand_string(command, env_regex));
    }
}

/// Expand environment variables in a single string
fn expand_string(s: &str, regex: &Regex) -> String {
    regex
        .replace_all(s, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
}

/// Apply environment variable overrides for common settings
///
/// Supports direct environment variables:
/// - OPENAI_API_KEY -> openai.api_key (and enables openai)
/// - OLLAMA_BASE_URL -> ollama.base_url
/// - DEVAGENT_DEFAULT_PROVIDER -> llm.default_provider
/// - DEVAGENT_MAX_ITERATIONS -> workflow.max_iterations
fn apply_env_overrides(mut config: DevAgentConfig) -> Result<DevAgentConfig, ConfigError> {
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        if !key.is_empty() {
            let provider = config
                .llm
                .providers
                .entry("openai".to_string())
                .or_insert_with(ProviderConfig::default);
            provider.api_key = Some(key);
            provider.enabled = true;
        }
    }

    if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
        if !url.is_empty() {
            let provider = config
                .llm
                .providers
                .entry("ollama".to_string())
                .or_insert_with(ProviderConfig::default);
            provider.base_url = Some(url);
        }
    }

    if let Ok(provider) = std::env::var("DEVAGENT_DEFAULT_PROVIDER") {
        if !provider.is_empty() {
            config.llm.default_provider = provider;
        }
    }

    if let Ok(value) = std::env::var("DEVAGENT_MAX_ITERATIONS") {
        if !value.is_empty() {
            config.workflow.max_iterations =
                value.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "DEVAGENT_MAX_ITERATIONS".to_string(),
                    reason: format!("expected a non-negative integer, got `{}`", value),
                })?;
        }
    }

    validate(&config)?;
    Ok(config)
}

fn validate(config: &DevAgentConfig) -> Result<(), ConfigError> {
    if config.workflow.max_iterations == 0 {
        return Err(ConfigError::InvalidValue {
            key: "workflow.max_iterations".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

/// Create a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# DevAgent Configuration
# Place this file in your project root as .devagent.toml
# or in ~/.config/devagent/config.toml for global settings

[llm]
# Default provider: ollama, openai
default_provider = "ollama"

# Request timeout in seconds
timeout = 120

[llm.providers.ollama]
enabled = true
base_url = "http://localhost:11434"
default_model = "llama3.1:8b"

[llm.providers.openai]
enabled = false
api_key = "${OPENAI_API_KEY}"
default_model = "gpt-4o-mini"

[workflow]
# Upper bound on retry/reflection iterations
max_iterations = 3
# test_command = "cargo test"

[tools]
# Shell command timeout in seconds
command_timeout = 30
max_read_bytes = 65536

[pr]
# draft | gh
publisher = "draft"
"#
}
