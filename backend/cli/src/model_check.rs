//! Pre-flight checks shared by `ask` and `chat`: the server must answer and
//! the model must be installed, pulling it on request.

use std::io::Write;

use anyhow::Result;
use dialoguer::Confirm;
use futures::StreamExt;
use tracing::{error, info, warn};

use qwen_config::QwenConfig;
use qwen_core::{ModelCatalog, ModelInfo};
use qwen_provider::{OllamaClient, SamplingOptions};

use crate::Exit;

/// Asks whether a missing model should be pulled.
pub trait PullPrompt {
    fn confirm_pull(&mut self, model: &str) -> bool;
}

/// Interactive yes/no on the terminal, defaulting to No.
pub struct AskUser;

impl PullPrompt for AskUser {
    fn confirm_pull(&mut self, model: &str) -> bool {
        let answer = Confirm::new()
            .with_prompt(format!("👉 Would you like to pull '{model}'?"))
            .default(false)
            .interact();
        match answer {
            Ok(yes) => yes,
            Err(e) => {
                warn!(error = %e, "Could not read pull confirmation; treating as no");
                false
            }
        }
    }
}

/// Client for the configured server with the configured sampling options.
pub fn client_for(config: &QwenConfig) -> OllamaClient {
    OllamaClient::with_base_url(&config.host).with_options(SamplingOptions {
        temperature: config.temperature,
        top_p: config.top_p,
    })
}

/// Exact name, or a bare name matching its `:latest` tag.
fn has_model(installed: &[ModelInfo], model: &str) -> bool {
    installed.iter().any(|m| {
        m.name == model
            || (!model.contains(':') && m.name.strip_suffix(":latest") == Some(model))
    })
}

/// Make sure the server is up and `model` is installed.
///
/// Every failure is explained on `out` and returned as [`Exit`] with code 1.
pub async fn ensure_model<C, W>(
    catalog: &C,
    host: &str,
    model: &str,
    assume_yes: bool,
    prompt: &mut dyn PullPrompt,
    out: &mut W,
) -> Result<()>
where
    C: ModelCatalog + ?Sized,
    W: Write,
{
    if !catalog.is_available().await {
        writeln!(out, "❌ Ollama is not running.")?;
        writeln!(out, "Please start Ollama: https://ollama.com")?;
        error!(host, "Ollama not running");
        return Err(Exit(1).into());
    }

    let installed = catalog.list_models().await?;
    if has_model(&installed, model) {
        return Ok(());
    }

    writeln!(out, "❌ Model '{model}' not found.")?;
    info!(model, "Model not found");
    if assume_yes {
        writeln!(out, "--yes provided; proceeding to pull model.")?;
        info!(model, "Auto-pulling model");
    } else {
        out.flush()?;
        if !prompt.confirm_pull(model) {
            writeln!(out, "❌ Cannot proceed without model.")?;
            return Err(Exit(1).into());
        }
    }

    writeln!(out, "📥 Pulling model '{model}'... (this may take a while)")?;
    writeln!(out, "Press Ctrl+C to cancel.")?;
    let mut progress = match catalog.pull_model(model).await {
        Ok(stream) => stream,
        Err(e) => return pull_failed(out, model, &e),
    };
    while let Some(line) = progress.next().await {
        match line {
            Ok(line) => {
                writeln!(out, " → {line}")?;
                out.flush()?;
            }
            Err(e) => return pull_failed(out, model, &e),
        }
    }
    info!(model, "Model pulled");
    Ok(())
}

fn pull_failed<W: Write>(out: &mut W, model: &str, e: &dyn std::fmt::Display) -> Result<()> {
    writeln!(out, "❌ Failed to pull model: {e}")?;
    writeln!(out, "❌ Cannot proceed without model.")?;
    error!(model, error = %e, "Model pull failed");
    Err(Exit(1).into())
}
