use thiserror::Error;

/// Errors raised while talking to the inference server.
#[derive(Debug, Error)]
pub enum QwenError {
    #[error("inference server is not reachable at {host}")]
    ServiceUnavailable { host: String },

    #[error("model '{0}' not found")]
    ModelNotFound(String),

    #[error("failed to pull model '{model}': {reason}")]
    PullFailed { model: String, reason: String },

    #[error("server returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("malformed response from server: {0}")]
    Protocol(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
