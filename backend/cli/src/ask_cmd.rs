//! `qwen ask`: one prompt, one answer, no history.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use futures::StreamExt;
use tracing::{error, info};

use qwen_agent::ASSISTANT_PREFIX;
use qwen_config::QwenConfig;
use qwen_core::{ChatBackend, QwenError};

use crate::model_check::{client_for, ensure_model, AskUser};
use crate::Exit;

#[derive(Args, Debug, Clone)]
pub struct AskArgs {
    /// The question; multiple words are joined with spaces
    #[arg(required = true)]
    pub prompt: Vec<String>,
    /// Model to use
    #[arg(short, long)]
    pub model: Option<String>,
    /// Ollama base URL
    #[arg(long)]
    pub host: Option<String>,
    /// Pull the model without asking if it is missing
    #[arg(short = 'y', long)]
    pub yes: bool,
    /// Wait for the whole answer instead of streaming it
    #[arg(long)]
    pub no_stream: bool,
}

impl AskArgs {
    pub fn prompt_text(&self) -> String {
        self.prompt.join(" ")
    }
}

pub async fn run(args: AskArgs, mut config: QwenConfig) -> Result<()> {
    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    qwen_config::check(&config)?;

    let client = client_for(&config);
    let mut stdout = std::io::stdout();
    ensure_model(&client, &config.host, &config.model, args.yes, &mut AskUser, &mut stdout).await?;

    let prompt = args.prompt_text();
    info!(model = %config.model, chars = prompt.len(), "Ask");
    write!(stdout, "\n{ASSISTANT_PREFIX}")?;
    stdout.flush()?;

    if let Err(e) = answer(&client, &config.model, &prompt, !args.no_stream, &mut stdout).await {
        writeln!(stdout)?;
        writeln!(stdout, "❌ Error generating response: {e}")?;
        error!(error = %e, "Ask failed");
        return Err(Exit(1).into());
    }
    Ok(())
}

/// Write the answer to `out` followed by a newline.
async fn answer<W: Write>(
    backend: &dyn ChatBackend,
    model: &str,
    prompt: &str,
    stream: bool,
    out: &mut W,
) -> Result<(), QwenError> {
    if stream {
        let mut fragments = backend.generate_stream(model, prompt).await?;
        while let Some(fragment) = fragments.next().await {
            let fragment = fragment?;
            out.write_all(fragment.as_bytes()).map_err(io_err)?;
            out.flush().map_err(io_err)?;
        }
    } else {
        let text = backend.generate(model, prompt).await?;
        out.write_all(text.as_bytes()).map_err(io_err)?;
    }
    writeln!(out).map_err(io_err)
}

fn io_err(e: std::io::Error) -> QwenError {
    QwenError::Other(e.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qwen_core::Turn;
    use qwen_provider::{MockBackend, MockReply};

    #[tokio::test]
    async fn streams_fragments_in_order() {
        let mock = MockBackend::new().with_reply(MockReply::Chunks(vec!["4".into(), ", of course".into()]));
        let mut out = Vec::new();
        answer(&mock, "qwen:latest", "2+2?", true, &mut out).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "4, of course\n");
        assert_eq!(mock.requests(), vec![vec![Turn::user("2+2?")]]);
    }

    #[tokio::test]
    async fn non_streaming_prints_whole_reply() {
        let mock = MockBackend::new().with_reply(MockReply::text("done"));
        let mut out = Vec::new();
        answer(&mock, "qwen:latest", "go", false, &mut out).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "done\n");
    }

    #[tokio::test]
    async fn mid_stream_failure_surfaces() {
        let mock = MockBackend::new().with_reply(MockReply::FailAfter(vec!["par".into()], "reset".into()));
        let mut out = Vec::new();
        let err = answer(&mock, "qwen:latest", "go", true, &mut out).await.unwrap_err();
        assert!(err.to_string().contains("reset"));
        assert_eq!(String::from_utf8(out).unwrap(), "par");
    }
}
