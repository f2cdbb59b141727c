//! LLM integration module
//!
//! The capability provider seam: one trait, swappable backends.
//!
//! Supported providers:
//! - Ollama (local inference)
//! - OpenAI (and OpenAI-compatible endpoints)
//! - Scripted (canned replies, deterministic)

mod error;
mod message;
mod ollama;
mod openai;
mod provider;
mod registry;
mod scripted;

pub use error::LlmError;
pub use message::{format_file_context, strip_code_fences, ChatMessage, MessageRole};
pub use provider::{LlmProvider, ProviderStatus, SharedProvider};
pub use registry::{ProviderInfo, ProviderRegistry};

// Provider implementations
pub use ollama::{OllamaProvider, DEFAULT_OLLAMA_URL};
pub use openai::{OpenAIProvider, DEFAULT_OPENAI_URL};
pub use scripted::ScriptedProvider;
