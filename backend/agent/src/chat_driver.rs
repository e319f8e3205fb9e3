//! Interactive chat loop.
//!
//! One turn at a time: read a line, persist the user turn, stream the reply,
//! persist it, trim the in-memory window. Log failures and backend failures
//! are reported and the session carries on.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use qwen_commands::{ChatCommand, CommandRegistry, detect_command};
use qwen_core::{ChatBackend, QwenError, Turn};
use qwen_history::SessionLog;
use qwen_logging::{EventLogger, SessionEvent};
use qwen_understanding::FactExtractor;

use crate::context_window::ContextWindow;
use crate::session_state::SessionState;

pub const USER_PROMPT: &str = "🟢 You: ";
pub const ASSISTANT_PREFIX: &str = "🤖 Qwen: ";

/// Events produced by an input source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// User submitted a line.
    Message(String),
    /// End of input (Ctrl+D or closed pipe).
    Eof,
    /// Interrupt (Ctrl+C) while waiting for input.
    Interrupted,
}

#[async_trait]
pub trait InputSource: Send {
    async fn read_line(&mut self) -> InputEvent;
}

/// Builds a future that resolves when the reply in progress should stop.
/// Called once per reply.
pub type CancelSignal = Box<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Cancel on Ctrl+C. If the handler cannot be installed the signal never fires.
pub fn ctrl_c_signal() -> CancelSignal {
    Box::new(|| {
        Box::pin(async {
            if tokio::signal::ctrl_c().await.is_err() {
                futures::future::pending::<()>().await;
            }
        })
    })
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Command,
    Eof,
    Interrupted,
}

enum Reply {
    Complete(String),
    Cancelled(String),
    Failed(QwenError),
}

pub struct ChatDriver<W> {
    backend: Arc<dyn ChatBackend>,
    model: String,
    state: SessionState,
    window: ContextWindow,
    log: Option<SessionLog>,
    extractor: Option<Box<dyn FactExtractor>>,
    commands: CommandRegistry,
    cancel: CancelSignal,
    streaming: bool,
    out: W,
    session: String,
    log_warned: bool,
    started: bool,
}

impl<W: Write + Send> ChatDriver<W> {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        model: impl Into<String>,
        state: SessionState,
        max_keep: usize,
        out: W,
    ) -> Self {
        Self {
            backend,
            model: model.into(),
            state,
            window: ContextWindow::new(max_keep),
            log: None,
            extractor: None,
            commands: CommandRegistry::new(),
            cancel: ctrl_c_signal(),
            streaming: true,
            out,
            session: "chat".to_string(),
            log_warned: false,
            started: false,
        }
    }

    pub fn with_log(mut self, log: SessionLog) -> Self {
        if let Some(stem) = log.path().and_then(Path::file_stem) {
            self.session = stem.to_string_lossy().into_owned();
        }
        self.log = Some(log);
        self
    }

    pub fn with_extractor(mut self, extractor: Box<dyn FactExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn with_cancel_signal(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// Stream replies fragment by fragment (default) or fetch them whole.
    pub fn streaming(mut self, on: bool) -> Self {
        self.streaming = on;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn log(&self) -> Option<&SessionLog> {
        self.log.as_ref()
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Run until a quit command, end of input, or an interrupt at the prompt.
    pub async fn run(&mut self, input: &mut dyn InputSource) -> Result<EndReason> {
        self.begin()?;
        info!(model = %self.model, session = %self.session, "Chat started");

        let reason = loop {
            write!(self.out, "\n{USER_PROMPT}")?;
            self.out.flush()?;

            let line = match input.read_line().await {
                InputEvent::Message(line) => line,
                InputEvent::Eof => {
                    writeln!(self.out, "\n👋 Bye")?;
                    break EndReason::Eof;
                }
                InputEvent::Interrupted => {
                    writeln!(self.out, "\n👋 Bye")?;
                    break EndReason::Interrupted;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            match detect_command(&line, &self.commands) {
                Some(ChatCommand::Exit) => {
                    writeln!(self.out, "👋 Bye")?;
                    break EndReason::Command;
                }
                Some(ChatCommand::Reset) => self.reset()?,
                Some(ChatCommand::Help) => {
                    writeln!(self.out, "Commands:\n{}", self.commands.help_text())?;
                }
                None => self.handle_message(line).await?,
            }
        };

        if let Some(log) = self.log.as_mut() {
            log.close();
        }
        info!(?reason, "Chat ended");
        Ok(reason)
    }

    /// Trim a replayed history and put the system turn at the top of the log.
    fn begin(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        let dropped = self.window.trim_in_place(self.state.turns_mut());
        if dropped > 0 {
            debug!(dropped, "Trimmed replayed history to the context window");
        }
        let system = self.state.system().clone();
        self.persist(&system)
    }

    fn reset(&mut self) -> Result<()> {
        let dropped = self.state.reset();
        writeln!(self.out, "♻️  Context reset.")?;
        info!(dropped, "Context reset by user");
        EventLogger::log_event(&self.session, SessionEvent::Reset { dropped });
        Ok(())
    }

    async fn handle_message(&mut self, text: String) -> Result<()> {
        if let Some(extractor) = &self.extractor {
            let found = extractor.extract(&text);
            if !found.is_empty() {
                self.state.merge_facts(found);
            }
        }

        let user = Turn::user(text);
        self.persist(&user)?;
        self.state.push(user);

        let outbound = self.state.outbound();
        write!(self.out, "{ASSISTANT_PREFIX}")?;
        self.out.flush()?;

        match self.request(&outbound).await? {
            Reply::Complete(text) => {
                writeln!(self.out)?;
                self.finish_turn(text)?;
            }
            Reply::Cancelled(text) => {
                writeln!(self.out, "\n⏹️  Reply interrupted.")?;
                EventLogger::log_event(
                    &self.session,
                    SessionEvent::ReplyInterrupted {
                        partial: text.clone(),
                    },
                );
                if text.is_empty() {
                    debug!("Interrupted before any text; no assistant turn recorded");
                } else {
                    self.finish_turn(text)?;
                }
            }
            Reply::Failed(e) => {
                writeln!(self.out, "\n❌ Error: {e}")?;
                warn!(error = %e, "Chat request failed; reply dropped");
                EventLogger::log_event(
                    &self.session,
                    SessionEvent::TurnFailed {
                        error_msg: e.to_string(),
                    },
                );
                self.window.trim_in_place(self.state.turns_mut());
            }
        }
        Ok(())
    }

    fn finish_turn(&mut self, text: String) -> Result<()> {
        let assistant = Turn::assistant(text);
        self.persist(&assistant)?;
        self.state.push(assistant);
        self.window.trim_in_place(self.state.turns_mut());
        Ok(())
    }

    /// Ask the backend for a reply, echoing fragments as they arrive.
    /// Only output errors are returned as `Err`.
    async fn request(&mut self, outbound: &[Turn]) -> Result<Reply> {
        let backend = Arc::clone(&self.backend);
        let mut cancel = (self.cancel)();

        if !self.streaming {
            let result = tokio::select! {
                biased;
                res = backend.chat(&self.model, outbound) => res,
                _ = &mut cancel => return Ok(Reply::Cancelled(String::new())),
            };
            return match result {
                Ok(text) => {
                    write!(self.out, "{text}")?;
                    Ok(Reply::Complete(text))
                }
                Err(e) => Ok(Reply::Failed(e)),
            };
        }

        let opened = tokio::select! {
            biased;
            res = backend.chat_stream(&self.model, outbound) => res,
            _ = &mut cancel => return Ok(Reply::Cancelled(String::new())),
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => return Ok(Reply::Failed(e)),
        };

        let mut text = String::new();
        loop {
            let next = tokio::select! {
                biased;
                next = stream.next() => next,
                _ = &mut cancel => return Ok(Reply::Cancelled(text)),
            };
            match next {
                Some(Ok(fragment)) => {
                    write!(self.out, "{fragment}")?;
                    self.out.flush()?;
                    text.push_str(&fragment);
                }
                Some(Err(e)) => return Ok(Reply::Failed(e)),
                None => return Ok(Reply::Complete(text)),
            }
        }
    }

    /// Append a turn to the session log. A failed write is skipped; the user
    /// hears about the first one only.
    fn persist(&mut self, turn: &Turn) -> Result<()> {
        let Some(log) = self.log.as_mut() else {
            return Ok(());
        };
        match log.write(turn) {
            Ok(outcome) => {
                if outcome.rotated {
                    writeln!(self.out, "📝 Rolled log to: {}", outcome.path.display())?;
                    EventLogger::log_event(
                        &self.session,
                        SessionEvent::LogRotated {
                            path: outcome.path.clone(),
                        },
                    );
                }
                EventLogger::log_event(
                    &self.session,
                    SessionEvent::TurnPersisted {
                        role: turn.role.to_string(),
                        content: turn.content.clone(),
                        path: outcome.path,
                    },
                );
            }
            Err(e) => {
                warn!(error = %e, role = %turn.role, "Session log write failed; turn not persisted");
                if !self.log_warned {
                    self.log_warned = true;
                    writeln!(
                        self.out,
                        "⚠️  Could not write session log: {e}. The chat continues; unsaved turns are skipped."
                    )?;
                }
            }
        }
        Ok(())
    }
}
