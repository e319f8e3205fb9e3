//! Structured Logger
//!
//! JSON lines to a daily-rolled file under the log directory, an optional
//! human-readable layer on stderr, and environment-based level control.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_PREFIX: &str = "qwen-cli";
const LOG_FILE_SUFFIX: &str = "log";
const MAX_LOG_FILES: usize = 5;
const DEFAULT_LOG_DIR: &str = "./logs";
const DEFAULT_LEVEL: &str = "info";

/// Where and how much to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub dir: PathBuf,
    pub level: String,
    /// Mirror log lines to stderr.
    pub console: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_LOG_DIR),
            level: DEFAULT_LEVEL.to_string(),
            console: false,
        }
    }
}

impl LogSettings {
    /// Read `QWEN_LOG_DIR`, `QWEN_LOG_LEVEL` and `QWEN_LOG_TO_CONSOLE`.
    pub fn from_env() -> Self {
        let vars: HashMap<String, String> = ["QWEN_LOG_DIR", "QWEN_LOG_LEVEL", "QWEN_LOG_TO_CONSOLE"]
            .iter()
            .filter_map(|name| std::env::var(name).ok().map(|v| (name.to_string(), v)))
            .collect();
        Self::from_vars(&vars)
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let mut settings = Self::default();
        if let Some(dir) = vars.get("QWEN_LOG_DIR").filter(|d| !d.trim().is_empty()) {
            settings.dir = PathBuf::from(dir);
        }
        if let Some(level) = vars.get("QWEN_LOG_LEVEL").filter(|l| !l.trim().is_empty()) {
            settings.level = level.trim().to_lowercase();
        }
        settings.console = vars
            .get("QWEN_LOG_TO_CONSOLE")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);
        settings
    }
}

/// Initialize the global logger.
///
/// Returns the directory receiving the JSON log, or `None` when the file
/// layer had to be skipped. A logger that is already installed is left alone.
pub fn init_logger(settings: &LogSettings) -> Option<PathBuf> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},hyper=warn,reqwest=warn", settings.level)));

    let file_layer = match file_appender(&settings.dir) {
        Ok(appender) => Some(
            fmt::layer()
                .json()
                .with_writer(appender)
                .with_ansi(false),
        ),
        Err(e) => {
            eprintln!("⚠️  File logging disabled: {e:#}");
            None
        }
    };
    let file_dir = file_layer.as_ref().map(|_| settings.dir.clone());

    let console_layer = settings.console.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(true)
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    file_dir
}

fn file_appender(dir: &Path) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
        .with_context(|| format!("cannot open log file in {}", dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_without_env() {
        let settings = LogSettings::from_vars(&HashMap::new());
        assert_eq!(settings, LogSettings::default());
        assert!(!settings.console);
    }

    #[test]
    fn env_overrides_dir_level_and_console() {
        let settings = LogSettings::from_vars(&vars(&[
            ("QWEN_LOG_DIR", "/var/log/qwen"),
            ("QWEN_LOG_LEVEL", "DEBUG"),
            ("QWEN_LOG_TO_CONSOLE", "1"),
        ]));
        assert_eq!(settings.dir, PathBuf::from("/var/log/qwen"));
        assert_eq!(settings.level, "debug");
        assert!(settings.console);
    }

    #[test]
    fn console_flag_rejects_other_values() {
        let settings = LogSettings::from_vars(&vars(&[("QWEN_LOG_TO_CONSOLE", "0")]));
        assert!(!settings.console);
    }

    #[test]
    fn appender_creates_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("a").join("b");
        assert!(file_appender(&dir).is_ok());
        assert!(dir.is_dir());
    }

    #[test]
    fn appender_fails_when_dir_is_a_file() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("logs");
        std::fs::write(&blocker, "").unwrap();
        assert!(file_appender(&blocker).is_err());
    }
}
