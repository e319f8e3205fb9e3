//! Diagnostic logging for qwen-cli.
//!
//! Handles log redaction, the JSON file logger with daily rotation, and
//! structured session events.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{EventLogEntry, EventLogger, SessionEvent};
pub use logger::{LogSettings, init_logger};
pub use redact::redact_sensitive_data;
