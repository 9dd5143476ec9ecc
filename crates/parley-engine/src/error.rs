use std::time::Duration;

use parley_core::errors::GenerationError;

#[derive(Debug, thiserror::Error)]
pub enum DialogueError {
    #[error("generation failed for participant '{role}': {source}")]
    Participant {
        role: String,
        source: GenerationError,
    },

    #[error("generation for participant '{role}' timed out after {budget:?}")]
    ParticipantTimeout { role: String, budget: Duration },

    #[error("failed to generate simulation summary: {source}")]
    Summary { source: GenerationError },

    #[error("generation for summary timed out after {budget:?}")]
    SummaryTimeout { budget: Duration },

    #[error("dialogue cancelled")]
    Cancelled,
}

impl DialogueError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
