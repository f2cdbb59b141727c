//! Configuration module for DevAgent
//!
//! Handles loading and parsing of `.devagent.toml` configuration files
//! with support for environment variable expansion.

mod loader;
mod types;

pub use loader::{
    load_config, load_from_file, sample_config, user_config_path, ConfigError,
    PROJECT_CONFIG_FILE,
};
pub use types::{
    DevAgentConfig, LlmConfig, PrConfig, ProviderConfig, PublisherKind, ToolsConfig,
    WorkflowConfig,
};
