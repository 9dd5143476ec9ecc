use async_trait::async_trait;

use crate::errors::GenerationError;

/// Options forwarded with every generation call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Advisory cap on generated length. Backends may ignore it.
    pub max_output_tokens: Option<u32>,
}

/// The external text-completion capability consumed by the dialogue engine.
///
/// An implementation turns one prompt into one reply. Any failure is returned
/// as a [`GenerationError`]; callers treat it as a failure of the job that
/// issued the call, never of the process. Implementations should reach an
/// `.await` point regularly so that cancellation can take effect.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String, GenerationError>;
}
