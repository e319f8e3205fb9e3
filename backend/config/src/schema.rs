//! qwen-cli configuration schema.
//!
//! One flat JSON object with snake_case keys. Missing keys take their
//! defaults; unknown keys are rejected so typos surface instead of being
//! silently ignored.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::defaults;

/// Root configuration for qwen-cli.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QwenConfig {
    /// Model identifier passed to the inference server
    pub model: String,

    /// Base URL of the inference server
    pub host: String,

    /// Directory holding session logs (`~` is expanded)
    pub history_dir: String,

    /// Turns kept in memory after the system prompt
    pub max_messages: usize,

    /// System prompt that opens every session
    pub system_prompt: String,

    /// Default session title used in log file names
    pub title: String,

    /// Size at which a session log rolls to the next file
    pub history_max_bytes: u64,

    /// Sampling temperature forwarded to the server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Nucleus sampling forwarded to the server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

/// Every key accepted by `config get` / `config set`.
pub const KEYS: &[&str] = &[
    "model",
    "host",
    "history_dir",
    "max_messages",
    "system_prompt",
    "title",
    "history_max_bytes",
    "temperature",
    "top_p",
];

impl Default for QwenConfig {
    fn default() -> Self {
        Self {
            model: defaults::DEFAULT_MODEL.to_string(),
            host: defaults::DEFAULT_HOST.to_string(),
            history_dir: defaults::DEFAULT_HISTORY_DIR.to_string(),
            max_messages: defaults::DEFAULT_MAX_MESSAGES,
            system_prompt: defaults::DEFAULT_SYSTEM_PROMPT.to_string(),
            title: defaults::DEFAULT_TITLE.to_string(),
            history_max_bytes: defaults::DEFAULT_HISTORY_MAX_BYTES,
            temperature: None,
            top_p: None,
        }
    }
}

impl QwenConfig {
    /// History directory with a leading `~` expanded to the home directory.
    pub fn history_dir_path(&self) -> PathBuf {
        expand_home(&self.history_dir)
    }
}

/// Expand a leading `~` or `~/` using the current user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_in_defaults() {
        let cfg: QwenConfig = serde_json::from_str(r#"{"model": "qwen:custom"}"#).unwrap();
        assert_eq!(cfg.model, "qwen:custom");
        assert_eq!(cfg.max_messages, defaults::DEFAULT_MAX_MESSAGES);
        assert_eq!(cfg.host, defaults::DEFAULT_HOST);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let parsed = serde_json::from_str::<QwenConfig>(r#"{"modle": "typo"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn optional_sampling_keys_are_omitted_when_unset() {
        let json = serde_json::to_value(QwenConfig::default()).unwrap();
        assert!(json.get("temperature").is_none());
        assert_eq!(json.as_object().unwrap().len(), KEYS.len() - 2);
    }

    #[test]
    fn absolute_history_dir_is_untouched() {
        assert_eq!(expand_home("/tmp/qwen"), PathBuf::from("/tmp/qwen"));
    }
}
