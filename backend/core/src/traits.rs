use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::QwenError;
use crate::turn::Turn;

/// A lazy, finite sequence of text fragments. Concatenating every `Ok`
/// fragment yields the full reply.
pub type TextStream = BoxStream<'static, Result<String, QwenError>>;

/// Chat capability of the inference server.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Backend name (e.g., "ollama", "mock").
    fn name(&self) -> &str;

    /// Start a streamed chat completion over the given turns.
    async fn chat_stream(&self, model: &str, turns: &[Turn]) -> Result<TextStream, QwenError>;

    /// Non-streaming chat completion: returns the whole reply at once.
    async fn chat(&self, model: &str, turns: &[Turn]) -> Result<String, QwenError>;

    /// Start a streamed one-shot completion for a bare prompt.
    async fn generate_stream(&self, model: &str, prompt: &str) -> Result<TextStream, QwenError>;

    /// Non-streaming one-shot completion.
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, QwenError>;
}

/// Model availability, listing and pulling.
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    /// Whether the backing service answers at all.
    async fn is_available(&self) -> bool;

    /// Installed models.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, QwenError>;

    /// Fetch a model. Yields human-readable progress lines until done.
    async fn pull_model(&self, model: &str) -> Result<TextStream, QwenError>;
}

/// An installed model as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified_at: Option<String>,
}

impl ModelInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: 0,
            modified_at: None,
        }
    }
}
