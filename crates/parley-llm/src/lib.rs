pub mod mock;
pub mod ollama;

pub use mock::{MockGenerator, MockResponse};
pub use ollama::OllamaGenerator;
