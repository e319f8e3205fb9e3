//! `qwen test`: run the workspace test suite.

use std::io::ErrorKind;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::info;

use crate::Exit;

pub async fn run(extra: &[String]) -> Result<ExitCode> {
    info!(args = ?extra, "Running workspace tests");
    let status = match Command::new("cargo")
        .args(["test", "--workspace"])
        .args(extra)
        .status()
        .await
    {
        Ok(status) => status,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            eprintln!("❌ cargo not found. Install the Rust toolchain to run the tests.");
            return Err(Exit(1).into());
        }
        Err(e) => return Err(e).context("failed to start cargo test"),
    };
    Ok(ExitCode::from(exit_code(status.code())))
}

/// Child exit status as our own; killed by a signal counts as failure.
fn exit_code(code: Option<i32>) -> u8 {
    match code {
        Some(c) => u8::try_from(c).unwrap_or(1),
        None => 1,
    }
}
