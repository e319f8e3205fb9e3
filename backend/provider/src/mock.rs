use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use qwen_core::{ChatBackend, ModelCatalog, ModelInfo, QwenError, TextStream, Turn};

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Stream these fragments, then finish.
    Chunks(Vec<String>),
    /// Stream these fragments, then fail mid-stream.
    FailAfter(Vec<String>, String),
    /// Stream these fragments, then never finish.
    Hang(Vec<String>),
    /// Refuse the request before any fragment.
    Reject(String),
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Chunks(vec![text.into()])
    }
}

/// A scripted backend for tests. Replies are consumed in order; once the
/// script runs out every request gets "Mock response".
pub struct MockBackend {
    script: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<Vec<Turn>>>,
    available: bool,
    models: Vec<ModelInfo>,
    pull_lines: Vec<String>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            available: true,
            models: Vec::new(),
            pull_lines: vec!["pulling manifest".into(), "success".into()],
        }
    }

    pub fn with_reply(self, reply: MockReply) -> Self {
        self.lock_script().push_back(reply);
        self
    }

    pub fn with_replies(self, replies: impl IntoIterator<Item = MockReply>) -> Self {
        self.lock_script().extend(replies);
        self
    }

    pub fn with_models(mut self, names: &[&str]) -> Self {
        self.models = names.iter().map(|n| ModelInfo::named(*n)).collect();
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Turn lists sent to the backend, one entry per request.
    pub fn requests(&self) -> Vec<Vec<Turn>> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<MockReply>> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_reply(&self, turns: Vec<Turn>) -> MockReply {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(turns);
        }
        self.lock_script()
            .pop_front()
            .unwrap_or_else(|| MockReply::text("Mock response"))
    }

    fn play(reply: MockReply) -> Result<TextStream, QwenError> {
        let ok = |chunks: Vec<String>| chunks.into_iter().map(Ok::<String, QwenError>);
        match reply {
            MockReply::Chunks(chunks) => Ok(stream::iter(ok(chunks)).boxed()),
            MockReply::FailAfter(chunks, msg) => Ok(stream::iter(ok(chunks))
                .chain(stream::once(async move { Err(QwenError::Protocol(msg)) }))
                .boxed()),
            MockReply::Hang(chunks) => Ok(stream::iter(ok(chunks))
                .chain(stream::pending())
                .boxed()),
            MockReply::Reject(msg) => Err(QwenError::Protocol(msg)),
        }
    }

    async fn collect(stream: TextStream) -> Result<String, QwenError> {
        let parts: Vec<Result<String, QwenError>> = stream.collect().await;
        parts.into_iter().collect()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn chat_stream(&self, _model: &str, turns: &[Turn]) -> Result<TextStream, QwenError> {
        Self::play(self.next_reply(turns.to_vec()))
    }

    async fn chat(&self, model: &str, turns: &[Turn]) -> Result<String, QwenError> {
        let stream = self.chat_stream(model, turns).await?;
        Self::collect(stream).await
    }

    async fn generate_stream(&self, _model: &str, prompt: &str) -> Result<TextStream, QwenError> {
        Self::play(self.next_reply(vec![Turn::user(prompt)]))
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, QwenError> {
        let stream = self.generate_stream(model, prompt).await?;
        Self::collect(stream).await
    }
}

#[async_trait]
impl ModelCatalog for MockBackend {
    async fn is_available(&self) -> bool {
        self.available
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, QwenError> {
        if !self.available {
            return Err(QwenError::ServiceUnavailable {
                host: "mock".into(),
            });
        }
        Ok(self.models.clone())
    }

    async fn pull_model(&self, _model: &str) -> Result<TextStream, QwenError> {
        let lines = self.pull_lines.clone();
        Ok(stream::iter(lines.into_iter().map(Ok)).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_play_in_order_then_fall_back() {
        let mock = MockBackend::new()
            .with_reply(MockReply::Chunks(vec!["a".into(), "b".into()]))
            .with_reply(MockReply::text("c"));

        assert_eq!(mock.chat("m", &[Turn::user("1")]).await.unwrap(), "ab");
        assert_eq!(mock.chat("m", &[Turn::user("2")]).await.unwrap(), "c");
        assert_eq!(mock.chat("m", &[]).await.unwrap(), "Mock response");
        assert_eq!(mock.requests().len(), 3);
        assert_eq!(mock.requests()[1], vec![Turn::user("2")]);
    }

    #[tokio::test]
    async fn fail_after_yields_partial_then_error() {
        let mock = MockBackend::new().with_reply(MockReply::FailAfter(vec!["x".into()], "boom".into()));
        let items: Vec<_> = mock.chat_stream("m", &[]).await.unwrap().collect().await;
        assert_eq!(items.len(), 2);
        assert!(items[1].is_err());
    }

    #[tokio::test]
    async fn catalog_reports_models() {
        let mock = MockBackend::new().with_models(&["qwen:latest"]);
        assert!(mock.is_available().await);
        assert_eq!(mock.list_models().await.unwrap()[0].name, "qwen:latest");
        assert!(MockBackend::new().unavailable().list_models().await.is_err());
    }
}
