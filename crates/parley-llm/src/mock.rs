use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use parley_core::errors::GenerationError;
use parley_core::generation::{GenerateOptions, TextGenerator};

/// Pre-programmed responses for deterministic testing without a model server.
#[derive(Clone, Debug)]
pub enum MockResponse {
    Text(String),
    Error(GenerationError),
    /// Wait a duration, then yield the inner response.
    Delay(Duration, Box<MockResponse>),
    /// Panic inside `generate`, simulating a faulty backend.
    Panic(String),
}

impl MockResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn delayed(delay: Duration, inner: MockResponse) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// One recorded invocation of [`MockGenerator::generate`].
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub prompt: String,
    pub options: GenerateOptions,
}

/// Mock generator that returns pre-programmed responses in call order.
pub struct MockGenerator {
    responses: Vec<MockResponse>,
    repeat_last: bool,
    call_count: AtomicUsize,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockGenerator {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses,
            repeat_last: false,
            call_count: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer every call with the same response.
    pub fn always(response: MockResponse) -> Self {
        Self {
            repeat_last: true,
            ..Self::new(vec![response])
        }
    }

    /// `response-1` .. `response-{replies}`, then `summary`.
    pub fn numbered(replies: usize, summary: &str) -> Self {
        let mut responses: Vec<MockResponse> = (1..=replies)
            .map(|n| MockResponse::text(format!("response-{n}")))
            .collect();
        responses.push(MockResponse::text(summary));
        Self::new(responses)
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.prompt.clone()).collect()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String, GenerationError> {
        let idx = self.call_count.fetch_add(1, Ordering::Relaxed);
        self.calls.lock().push(RecordedCall {
            prompt: prompt.to_string(),
            options: options.clone(),
        });

        let response = match self.responses.get(idx) {
            Some(r) => r,
            None if self.repeat_last => match self.responses.last() {
                Some(r) => r,
                None => return Err(GenerationError::Other("MockGenerator: empty script".into())),
            },
            None => {
                return Err(GenerationError::Other(format!(
                    "MockGenerator: no response configured for call {idx}"
                )))
            }
        };

        resolve_response(response).await
    }
}

/// Resolve a MockResponse, handling Delay by sleeping first.
/// Unrolls nested delays iteratively to avoid recursive async.
async fn resolve_response(response: &MockResponse) -> Result<String, GenerationError> {
    let mut current = response;
    loop {
        match current {
            MockResponse::Text(text) => return Ok(text.clone()),
            MockResponse::Error(e) => return Err(e.clone()),
            MockResponse::Panic(msg) => panic!("{msg}"),
            MockResponse::Delay(duration, inner) => {
                tokio::time::sleep(*duration).await;
                current = inner;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequential_responses() {
        let mock = MockGenerator::new(vec![
            MockResponse::text("first"),
            MockResponse::text("second"),
        ]);
        let opts = GenerateOptions::default();

        assert_eq!(mock.generate("a", &opts).await.unwrap(), "first");
        assert_eq!(mock.generate("b", &opts).await.unwrap(), "second");
        assert_eq!(mock.call_count(), 2);
        assert_eq!(mock.prompts(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn exhausted_responses() {
        let mock = MockGenerator::new(vec![MockResponse::text("only one")]);
        let opts = GenerateOptions::default();

        let _ = mock.generate("a", &opts).await;
        assert!(mock.generate("b", &opts).await.is_err());
    }

    #[tokio::test]
    async fn always_repeats() {
        let mock = MockGenerator::always(MockResponse::Error(GenerationError::Other(
            "ollama unavailable".into(),
        )));
        let opts = GenerateOptions::default();
        for _ in 0..3 {
            let err = mock.generate("x", &opts).await.unwrap_err();
            assert_eq!(err.to_string(), "ollama unavailable");
        }
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn numbered_script() {
        let mock = MockGenerator::numbered(2, "Synthetic summary");
        let opts = GenerateOptions::default();
        assert_eq!(mock.generate("", &opts).await.unwrap(), "response-1");
        assert_eq!(mock.generate("", &opts).await.unwrap(), "response-2");
        assert_eq!(mock.generate("", &opts).await.unwrap(), "Synthetic summary");
    }

    #[tokio::test]
    async fn records_options() {
        let mock = MockGenerator::always(MockResponse::text("ok"));
        let opts = GenerateOptions {
            max_output_tokens: Some(64),
        };
        mock.generate("p", &opts).await.unwrap();
        assert_eq!(mock.calls()[0].options.max_output_tokens, Some(64));
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_response() {
        let mock = MockGenerator::new(vec![MockResponse::delayed(
            Duration::from_millis(50),
            MockResponse::text("after delay"),
        )]);

        let start = tokio::time::Instant::now();
        let reply = mock.generate("p", &GenerateOptions::default()).await.unwrap();
        assert_eq!(reply, "after delay");
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    #[should_panic(expected = "backend exploded")]
    async fn panic_response_panics() {
        let mock = MockGenerator::new(vec![MockResponse::Panic("backend exploded".into())]);
        let _ = mock.generate("p", &GenerateOptions::default()).await;
    }
}
