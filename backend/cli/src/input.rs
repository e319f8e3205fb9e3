//! Line input from stdin for the chat loop.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::warn;

use qwen_agent::{ctrl_c_signal, CancelSignal, InputEvent, InputSource};

/// Reads lines from stdin; Ctrl+C while waiting reports `Interrupted`.
pub struct StdinInput {
    lines: Lines<BufReader<Stdin>>,
    interrupt: CancelSignal,
}

impl StdinInput {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            interrupt: ctrl_c_signal(),
        }
    }
}

#[async_trait]
impl InputSource for StdinInput {
    async fn read_line(&mut self) -> InputEvent {
        let interrupted = (self.interrupt)();
        tokio::select! {
            line = self.lines.next_line() => match line {
                Ok(Some(line)) => InputEvent::Message(line),
                Ok(None) => InputEvent::Eof,
                Err(e) => {
                    warn!(error = %e, "Failed to read from stdin");
                    InputEvent::Eof
                }
            },
            _ = interrupted => InputEvent::Interrupted,
        }
    }
}
