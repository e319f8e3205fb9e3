//! Default values for a fresh configuration.

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "qwen:latest";

/// Default inference server URL.
pub const DEFAULT_HOST: &str = "http://localhost:11434";

/// Default session log directory.
pub const DEFAULT_HISTORY_DIR: &str = "~/.qwen/history";

/// Default number of turns kept after the system prompt.
pub const DEFAULT_MAX_MESSAGES: usize = 20;

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are Qwen, a helpful assistant running locally. Be concise and accurate.";

pub const DEFAULT_TITLE: &str = "session";

/// Session log rotation threshold (1 MiB).
pub const DEFAULT_HISTORY_MAX_BYTES: u64 = 1024 * 1024;

/// Above this, `max_messages` is still accepted but flagged.
pub const MAX_MESSAGES_WARN_ABOVE: usize = 500;
