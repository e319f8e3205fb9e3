use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use qwen_core::{ChatBackend, ModelCatalog, ModelInfo, QwenError, TextStream, Turn};

use crate::ndjson::{frame_stream, Frame};

const DEFAULT_HOST: &str = "http://localhost:11434";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const LIST_TIMEOUT: Duration = Duration::from_secs(10);

/// Sampling knobs forwarded as Ollama `options`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SamplingOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

impl SamplingOptions {
    fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.top_p.is_none()
    }
}

/// Client for a local Ollama server.
pub struct OllamaClient {
    client: Client,
    base_url: String,
    options: SamplingOptions,
}

impl OllamaClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_HOST)
    }

    pub fn with_base_url(url: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: url.into().trim_end_matches('/').to_string(),
            options: SamplingOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SamplingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn options(&self) -> Option<SamplingOptions> {
        (!self.options.is_empty()).then_some(self.options)
    }

    fn transport_error(&self, e: reqwest::Error) -> QwenError {
        if e.is_connect() || e.is_timeout() {
            QwenError::ServiceUnavailable {
                host: self.base_url.clone(),
            }
        } else {
            QwenError::Other(anyhow::Error::new(e).context("Ollama HTTP request failed"))
        }
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
        model: &str,
    ) -> Result<Response, QwenError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        check_status(response, model).await
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

async fn check_status(response: Response, model: &str) -> Result<Response, QwenError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(QwenError::ModelNotFound(model.to_string()));
    }
    Err(QwenError::Http {
        status: status.as_u16(),
        body,
    })
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<SamplingOptions>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<SamplingOptions>,
}

#[derive(Serialize)]
struct PullRequest<'a> {
    name: &'a str,
    stream: bool,
}

#[derive(Deserialize, Default)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct PullChunk {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    completed: Option<u64>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

/// Frames that fail to parse are skipped; an `error` frame ends the stream.
pub(crate) fn decode_chat_frame(line: &str) -> Result<Frame, QwenError> {
    let Ok(chunk) = serde_json::from_str::<ChatChunk>(line) else {
        debug!(line, "Skipping malformed chat frame");
        return Ok(Frame::default());
    };
    if let Some(err) = chunk.error {
        return Err(QwenError::Protocol(err));
    }
    Ok(Frame {
        text: chunk.message.map(|m| m.content),
        done: chunk.done,
    })
}

pub(crate) fn decode_generate_frame(line: &str) -> Result<Frame, QwenError> {
    let Ok(chunk) = serde_json::from_str::<GenerateChunk>(line) else {
        debug!(line, "Skipping malformed generate frame");
        return Ok(Frame::default());
    };
    if let Some(err) = chunk.error {
        return Err(QwenError::Protocol(err));
    }
    Ok(Frame {
        text: chunk.response,
        done: chunk.done,
    })
}

/// Pull progress becomes one readable line per frame.
pub(crate) fn decode_pull_frame(model: &str, line: &str) -> Result<Frame, QwenError> {
    let Ok(chunk) = serde_json::from_str::<PullChunk>(line) else {
        return Ok(Frame {
            text: Some(line.to_string()),
            done: false,
        });
    };
    if let Some(reason) = chunk.error {
        return Err(QwenError::PullFailed {
            model: model.to_string(),
            reason,
        });
    }
    let status = chunk.status.unwrap_or_default();
    let done = status == "success";
    let text = match (chunk.completed, chunk.total) {
        (Some(done_bytes), Some(total)) if total > 0 => {
            format!("{status} {}%", done_bytes.saturating_mul(100) / total)
        }
        _ => status,
    };
    Ok(Frame {
        text: Some(text),
        done,
    })
}

#[async_trait]
impl ChatBackend for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn chat_stream(&self, model: &str, turns: &[Turn]) -> Result<TextStream, QwenError> {
        debug!(model, turns = turns.len(), "Sending streamed chat to Ollama");
        let body = ChatRequest {
            model,
            messages: turns,
            stream: true,
            options: self.options(),
        };
        let response = self.post("/api/chat", &body, model).await?;
        Ok(frame_stream(response.bytes_stream(), decode_chat_frame))
    }

    async fn chat(&self, model: &str, turns: &[Turn]) -> Result<String, QwenError> {
        debug!(model, turns = turns.len(), "Sending chat to Ollama");
        let body = ChatRequest {
            model,
            messages: turns,
            stream: false,
            options: self.options(),
        };
        let response = self.post("/api/chat", &body, model).await?;
        let chunk: ChatChunk = response
            .json()
            .await
            .map_err(|e| QwenError::Protocol(format!("Failed to parse Ollama chat response: {e}")))?;
        if let Some(err) = chunk.error {
            return Err(QwenError::Protocol(err));
        }
        Ok(chunk.message.unwrap_or_default().content)
    }

    async fn generate_stream(&self, model: &str, prompt: &str) -> Result<TextStream, QwenError> {
        debug!(model, "Sending streamed generate to Ollama");
        let body = GenerateRequest {
            model,
            prompt,
            stream: true,
            options: self.options(),
        };
        let response = self.post("/api/generate", &body, model).await?;
        Ok(frame_stream(response.bytes_stream(), decode_generate_frame))
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, QwenError> {
        debug!(model, "Sending generate to Ollama");
        let body = GenerateRequest {
            model,
            prompt,
            stream: false,
            options: self.options(),
        };
        let response = self.post("/api/generate", &body, model).await?;
        let chunk: GenerateChunk = response.json().await.map_err(|e| {
            QwenError::Protocol(format!("Failed to parse Ollama generate response: {e}"))
        })?;
        if let Some(err) = chunk.error {
            return Err(QwenError::Protocol(err));
        }
        Ok(chunk.response.unwrap_or_default())
    }
}

#[async_trait]
impl ModelCatalog for OllamaClient {
    async fn is_available(&self) -> bool {
        let probe = self
            .client
            .get(self.url("/api/tags"))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await;
        match probe {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(host = %self.base_url, error = %e, "Ollama probe failed");
                false
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, QwenError> {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .timeout(LIST_TIMEOUT)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = check_status(response, "").await?;
        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| QwenError::Protocol(format!("Failed to parse model list: {e}")))?;
        Ok(tags.models)
    }

    async fn pull_model(&self, model: &str) -> Result<TextStream, QwenError> {
        info!(model, "Pulling model");
        let body = PullRequest {
            name: model,
            stream: true,
        };
        let response = self.post("/api/pull", &body, model).await.map_err(|e| match e {
            QwenError::ModelNotFound(_) | QwenError::Http { .. } => QwenError::PullFailed {
                model: model.to_string(),
                reason: e.to_string(),
            },
            other => other,
        })?;
        let owned = model.to_string();
        Ok(frame_stream(response.bytes_stream(), move |line: &str| {
            decode_pull_frame(&owned, line)
        }))
    }
}
