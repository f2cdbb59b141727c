//! Scripted provider
//!
//! Replays a fixed queue of replies. Used for deterministic workflow runs in
//! tests and for offline demos of the routing behaviour.

use super::{ChatMessage, LlmError, LlmProvider, ProviderStatus};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Provider that answers from a queue of canned replies
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedProvider {
    /// Create an empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.replies.lock().push_back(Ok(text.into()));
        self
    }

    /// Queue a failure
    pub fn fail(self, err: LlmError) -> Self {
        self.replies.lock().push_back(Err(err));
        self
    }

    /// Number of replies not yet consumed
    pub fn remaining(&self) -> usize {
        self.replies.lock().len()
    }

    /// Every conversation sent so far, oldest first
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().clone()
    }
}

impl LlmProvider for ScriptedProvider {
    fn id(&self) -> &str {
        "scripted"
    }

    fn name(&self) -> &str {
        "Scripted"
    }

    fn model(&self) -> String {
        "script".to_string()
    }

    fn status(&self) -> ProviderStatus {
        ProviderStatus::Ready
    }

    fn generate(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        self.requests.lock().push(messages.to_vec());
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Unavailable("script exhausted".to_string())))
    }
}
