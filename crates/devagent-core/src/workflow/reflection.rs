//! Reflection/retry bookkeeping

use super::state::WorkflowState;
use crate::error::DevAgentError;

/// Bounds the reflection loop of a run
#[derive(Debug, Clone, Copy)]
pub struct ReflectionController {
    max_iterations: u32,
}

impl ReflectionController {
    pub fn new(max_iterations: u32) -> Self {
        Self { max_iterations }
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Whether another reflection pass fits under the cap
    pub fn can_retry(&self, state: &WorkflowState) -> bool {
        state.iteration < self.max_iterations
    }

    /// Record a retry: reason, attempt and iteration each move forward once
    ///
    /// Returns the new iteration count.
    pub fn begin_retry(
        &self,
        state: &mut WorkflowState,
        reason: impl Into<String>,
    ) -> Result<u32, DevAgentError> {
        if !self.can_retry(state) {
            return Err(DevAgentError::IterationExhausted {
                max_iterations: self.max_iterations,
            });
        }

        let plan = state.plan.get_or_insert_with(Default::default);
        plan.retry_reason = Some(reason.into());
        plan.attempt += 1;
        state.iteration += 1;
        Ok(state.iteration)
    }
}
