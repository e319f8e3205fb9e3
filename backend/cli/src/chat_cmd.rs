//! `qwen chat`: the interactive session.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tracing::{info, warn};

use qwen_agent::{ChatDriver, SessionState};
use qwen_config::QwenConfig;
use qwen_core::Turn;
use qwen_history::{load, resolve_session_path, SessionLoad, SessionLog};
use qwen_understanding::RegexFactExtractor;

use crate::input::StdinInput;
use crate::model_check::{client_for, ensure_model, AskUser};

#[derive(Args, Debug, Default, Clone)]
pub struct ChatArgs {
    /// Model to use
    #[arg(short, long)]
    pub model: Option<String>,
    /// Ollama base URL
    #[arg(long)]
    pub host: Option<String>,
    /// System prompt for this session
    #[arg(long)]
    pub system: Option<String>,
    /// Number of most recent non-system turns kept in context
    #[arg(long)]
    pub max_messages: Option<usize>,
    /// Pull the model without asking if it is missing
    #[arg(short = 'y', long)]
    pub yes: bool,
    /// Do not write a session log
    #[arg(long)]
    pub no_log: bool,
    /// Resume from a session file path or id
    #[arg(long)]
    pub session: Option<String>,
    /// Directory for session logs
    #[arg(long)]
    pub history_dir: Option<String>,
    /// Title used in log file names
    #[arg(long)]
    pub title: Option<String>,
    /// Wait for whole replies instead of streaming them
    #[arg(long)]
    pub no_stream: bool,
}

impl ChatArgs {
    /// Flags win over file and environment values.
    pub fn apply(&self, config: &mut QwenConfig) {
        if let Some(v) = &self.model {
            config.model = v.clone();
        }
        if let Some(v) = &self.host {
            config.host = v.clone();
        }
        if let Some(v) = &self.system {
            config.system_prompt = v.clone();
        }
        if let Some(v) = self.max_messages {
            config.max_messages = v;
        }
        if let Some(v) = &self.history_dir {
            config.history_dir = v.clone();
        }
        if let Some(v) = &self.title {
            config.title = v.clone();
        }
    }
}

pub async fn run(args: ChatArgs, mut config: QwenConfig) -> Result<()> {
    args.apply(&mut config);
    qwen_config::check(&config)?;

    let client = Arc::new(client_for(&config));
    let mut stdout = std::io::stdout();
    ensure_model(client.as_ref(), &config.host, &config.model, args.yes, &mut AskUser, &mut stdout).await?;

    writeln!(
        stdout,
        "\n💬 Interactive chat started. Type '/exit' to quit, '/reset' to clear."
    )?;

    let history_dir = config.history_dir_path();
    let history = match &args.session {
        Some(session) => replay(session, &history_dir, &mut stdout)?,
        None => Vec::new(),
    };
    let state = SessionState::with_history(config.system_prompt.clone(), history);

    let log = if args.no_log {
        None
    } else {
        open_log(&history_dir, &config, &mut stdout)?
    };

    let mut driver = ChatDriver::new(client, config.model.clone(), state, config.max_messages, stdout)
        .with_extractor(Box::new(RegexFactExtractor::new()))
        .streaming(!args.no_stream);
    if let Some(log) = log {
        driver = driver.with_log(log);
    }

    let reason = driver.run(&mut StdinInput::new()).await?;
    info!(?reason, turns = driver.state().turns().len(), "Chat session closed");
    Ok(())
}

/// Load a prior session for replay. Missing or unreadable files are reported
/// and the chat starts fresh.
fn replay<W: Write>(session: &str, history_dir: &Path, out: &mut W) -> Result<Vec<Turn>> {
    let path = resolve_session_path(session, history_dir);
    match load(&path) {
        Ok(SessionLoad::Loaded(loaded)) => {
            writeln!(out, "📜 Loaded history: {}", loaded.path.display())?;
            if loaded.skipped > 0 {
                warn!(path = %loaded.path.display(), skipped = loaded.skipped, "Dropped malformed session lines");
            }
            Ok(loaded.turns)
        }
        Ok(SessionLoad::NotFound(path)) => {
            writeln!(out, "⚠️  Session not found: {}", path.display())?;
            Ok(Vec::new())
        }
        Err(e) => {
            writeln!(out, "⚠️  Could not load session history: {e}")?;
            warn!(error = %e, "Session replay failed");
            Ok(Vec::new())
        }
    }
}

/// Open the session log. A failure is reported and the chat runs unlogged.
fn open_log<W: Write>(history_dir: &Path, config: &QwenConfig, out: &mut W) -> Result<Option<SessionLog>> {
    match SessionLog::open(history_dir, &config.title, config.history_max_bytes) {
        Ok(log) => {
            if let Some(path) = log.path() {
                writeln!(out, "📝 Logging to: {}", path.display())?;
            }
            Ok(Some(log))
        }
        Err(e) => {
            writeln!(out, "⚠️  Could not open log file: {e}")?;
            warn!(error = %e, dir = %history_dir.display(), "Session logging disabled");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn text(out: Vec<u8>) -> String {
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn flags_override_config() {
        let mut config = QwenConfig::default();
        let args = ChatArgs {
            model: Some("qwen2.5:7b".into()),
            max_messages: Some(4),
            title: Some("work".into()),
            ..ChatArgs::default()
        };
        args.apply(&mut config);
        assert_eq!(config.model, "qwen2.5:7b");
        assert_eq!(config.max_messages, 4);
        assert_eq!(config.title, "work");
        assert_eq!(config.host, QwenConfig::default().host);
    }

    #[test]
    fn replay_by_id_from_history_dir() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("work-2024-05-17-1.jsonl"),
            "{\"role\":\"system\",\"content\":\"old\"}\nnot json\n{\"role\":\"user\",\"content\":\"hi\"}\n",
        )
        .unwrap();

        let mut out = Vec::new();
        let turns = replay("work-2024-05-17-1", tmp.path(), &mut out).unwrap();
        assert_eq!(turns, vec![Turn::system("old"), Turn::user("hi")]);
        assert!(text(out).starts_with("📜 Loaded history: "));
    }

    #[test]
    fn replay_of_missing_session_starts_fresh() {
        let tmp = tempfile::tempdir().unwrap();
        let mut out = Vec::new();
        let turns = replay("nope", tmp.path(), &mut out).unwrap();
        assert!(turns.is_empty());
        assert!(text(out).starts_with("⚠️  Session not found: "));
    }

    #[test]
    fn open_log_reports_path() {
        let tmp = tempfile::tempdir().unwrap();
        let config = QwenConfig {
            title: "Work Notes".into(),
            ..QwenConfig::default()
        };
        let mut out = Vec::new();
        let log = open_log(tmp.path(), &config, &mut out).unwrap().unwrap();
        let path = log.path().unwrap().to_path_buf();
        assert!(path.starts_with(tmp.path()));
        assert!(text(out).contains(&path.display().to_string()));
    }

    #[test]
    fn open_log_failure_is_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let mut out = Vec::new();
        let log = open_log(&blocker.join("history"), &QwenConfig::default(), &mut out).unwrap();
        assert!(log.is_none());
        assert!(text(out).starts_with("⚠️  Could not open log file: "));
    }
}
