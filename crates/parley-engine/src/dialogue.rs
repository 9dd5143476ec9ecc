use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use parley_core::errors::GenerationError;
use parley_core::generation::{GenerateOptions, TextGenerator};
use parley_core::messages::{ChatMessage, SimulationRequest};

use crate::error::DialogueError;
use crate::prompt;

/// Knobs applied to every generation call of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DialogueOptions {
    /// Advisory token cap forwarded to replies and the summary alike.
    pub max_output_tokens: Option<u32>,
    /// Budget for each individual generation call.
    pub call_timeout: Option<Duration>,
}

#[derive(Clone, Debug)]
pub struct DialogueOutput {
    pub messages: Vec<ChatMessage>,
    pub summary: String,
}

/// Why a single generation call did not produce text.
enum CallFailure {
    Failed(GenerationError),
    TimedOut(Duration),
    Cancelled,
}

impl CallFailure {
    fn for_participant(self, role: &str) -> DialogueError {
        match self {
            Self::Failed(GenerationError::Cancelled) | Self::Cancelled => DialogueError::Cancelled,
            Self::Failed(source) => DialogueError::Participant {
                role: role.to_string(),
                source,
            },
            Self::TimedOut(budget) => DialogueError::ParticipantTimeout {
                role: role.to_string(),
                budget,
            },
        }
    }

    fn for_summary(self) -> DialogueError {
        match self {
            Self::Failed(GenerationError::Cancelled) | Self::Cancelled => DialogueError::Cancelled,
            Self::Failed(source) => DialogueError::Summary { source },
            Self::TimedOut(budget) => DialogueError::SummaryTimeout { budget },
        }
    }
}

/// Turn-taking dialogue over a text generator.
///
/// Each participant speaks once per turn, in request order, and sees every
/// earlier message of the run, including those from the same turn. After the
/// last turn one more call produces the summary. The engine holds no state
/// between runs.
pub struct DialogueEngine {
    generator: Arc<dyn TextGenerator>,
    options: DialogueOptions,
}

impl DialogueEngine {
    pub fn new(generator: Arc<dyn TextGenerator>, options: DialogueOptions) -> Self {
        Self { generator, options }
    }

    #[instrument(
        skip(self, request, cancel),
        fields(
            generator = self.generator.name(),
            turns = request.turns,
            participants = request.participants.len()
        )
    )]
    pub async fn run(
        &self,
        request: &SimulationRequest,
        cancel: &CancellationToken,
    ) -> Result<DialogueOutput, DialogueError> {
        let generate_options = GenerateOptions {
            max_output_tokens: self.options.max_output_tokens,
        };
        let mut transcript: Vec<ChatMessage> = Vec::with_capacity(request.expected_messages());

        for turn in 1..=request.turns {
            for participant in &request.participants {
                let prompt = prompt::participant_prompt(request, &transcript, participant);
                let reply = self
                    .call(&prompt, &generate_options, cancel)
                    .await
                    .map_err(|f| f.for_participant(&participant.role))
                    .inspect_err(|e| {
                        warn!(
                            role = %participant.role,
                            turn,
                            error = %e,
                            "participant generation failed"
                        )
                    })?;
                transcript.push(ChatMessage::new(participant.role.clone(), reply));
            }
            debug!(turn, messages = transcript.len(), "turn complete");
        }

        let summary_prompt = prompt::summary_prompt(&transcript);
        let summary = self
            .call(&summary_prompt, &generate_options, cancel)
            .await
            .map_err(CallFailure::for_summary)
            .inspect_err(|e| warn!(error = %e, "summary generation failed"))?;

        Ok(DialogueOutput {
            messages: transcript,
            summary,
        })
    }

    /// One generation call, bounded by the per-call budget and the cancel token.
    async fn call(
        &self,
        prompt: &str,
        options: &GenerateOptions,
        cancel: &CancellationToken,
    ) -> Result<String, CallFailure> {
        if cancel.is_cancelled() {
            return Err(CallFailure::Cancelled);
        }

        let generation = self.generator.generate(prompt, options);
        let bounded = async {
            match self.options.call_timeout {
                Some(budget) => match tokio::time::timeout(budget, generation).await {
                    Ok(result) => result.map_err(CallFailure::Failed),
                    Err(_) => Err(CallFailure::TimedOut(budget)),
                },
                None => generation.await.map_err(CallFailure::Failed),
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CallFailure::Cancelled),
            result = bounded => result,
        }
    }
}
