//! Session Event Logger
//!
//! Structured chat-session events written through `tracing` into the JSON log.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    TurnPersisted {
        role: String,
        content: String,
        path: PathBuf,
    },
    LogRotated {
        path: PathBuf,
    },
    Reset {
        dropped: usize,
    },
    ReplyInterrupted {
        partial: String,
    },
    TurnFailed {
        error_msg: String,
    },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub session: String,
    pub timestamp: DateTime<Utc>,
    pub event: SessionEvent,
}

impl EventLogEntry {
    /// Stamp an event and redact any chat text it carries.
    pub fn new(session: &str, mut event: SessionEvent) -> Self {
        match &mut event {
            SessionEvent::TurnPersisted { content, .. } => {
                *content = redact_sensitive_data(content);
            }
            SessionEvent::ReplyInterrupted { partial } => {
                *partial = redact_sensitive_data(partial);
            }
            SessionEvent::TurnFailed { error_msg } => {
                *error_msg = redact_sensitive_data(error_msg);
            }
            SessionEvent::LogRotated { .. } | SessionEvent::Reset { .. } => {}
        }

        Self {
            session: session.into(),
            timestamp: Utc::now(),
            event,
        }
    }
}

pub struct EventLogger;

impl EventLogger {
    pub fn log_event(session: &str, event: SessionEvent) {
        let entry = EventLogEntry::new(session, event);
        match serde_json::to_string(&entry) {
            Ok(json) => info!(target: "session_events", event = %json, "Session event"),
            Err(e) => warn!(target: "session_events", "Failed to encode session event: {}", e),
        }
    }
}
