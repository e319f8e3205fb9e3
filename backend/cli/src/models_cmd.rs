//! `qwen models`: installed models on the Ollama server.

use std::io::Write;

use anyhow::Result;

use qwen_config::QwenConfig;
use qwen_core::{ModelCatalog, ModelInfo};

use crate::model_check::client_for;
use crate::terminal_output::{render_table, Column};
use crate::Exit;

pub async fn run(host: Option<String>, mut config: QwenConfig) -> Result<()> {
    if let Some(host) = host {
        config.host = host;
    }
    let client = client_for(&config);
    list(&client, &mut std::io::stdout()).await
}

async fn list<C, W>(catalog: &C, out: &mut W) -> Result<()>
where
    C: ModelCatalog + ?Sized,
    W: Write,
{
    if !catalog.is_available().await {
        writeln!(out, "❌ Ollama is not running.")?;
        writeln!(out, "Please start Ollama: https://ollama.com")?;
        return Err(Exit(1).into());
    }

    let models = catalog.list_models().await?;
    if models.is_empty() {
        writeln!(out, "No models installed. Try: ollama pull qwen")?;
        return Ok(());
    }

    let columns = [Column::left("NAME"), Column::right("SIZE"), Column::left("MODIFIED")];
    let rows: Vec<Vec<String>> = models.iter().map(row).collect();
    write!(out, "{}", render_table(&columns, &rows))?;
    Ok(())
}

fn row(model: &ModelInfo) -> Vec<String> {
    vec![
        model.name.clone(),
        format_size(model.size),
        model.modified_at.as_deref().map(short_date).unwrap_or("-").to_string(),
    ]
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1000 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = "B";
    for u in UNITS {
        if value < 1000.0 {
            break;
        }
        value /= 1000.0;
        unit = u;
    }
    format!("{value:.1} {unit}")
}

/// `2024-05-17T10:22:03.1+02:00` → `2024-05-17`
fn short_date(timestamp: &str) -> &str {
    timestamp.split('T').next().unwrap_or(timestamp)
}
