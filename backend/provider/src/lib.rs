pub mod mock;
pub mod ndjson;
pub mod ollama;

pub use mock::{MockBackend, MockReply};
pub use ollama::{OllamaClient, SamplingOptions};
