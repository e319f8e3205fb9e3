//! `qwen-history`: chat session persistence.
//!
//! Provides:
//! - `SessionLog`: append-only JSONL writer that rolls to the next indexed file
//!   once the current one reaches a size threshold
//! - `load`: best-effort reader for a prior session file
//! - title sanitizing and session path resolution

pub mod error;
pub mod loader;
pub mod paths;
pub mod title;
pub mod writer;

pub use error::HistoryError;
pub use loader::{load, parse_line, LoadedSession, SessionLoad};
pub use paths::resolve_session_path;
pub use title::sanitize_title;
pub use writer::{log_file_name, SessionLog, WriteOutcome, DEFAULT_MAX_BYTES};
