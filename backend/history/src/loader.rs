//! Best-effort reader for prior session logs.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use qwen_core::Turn;

use crate::error::HistoryError;

/// A session file that was found and read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSession {
    pub path: PathBuf,
    pub turns: Vec<Turn>,
    /// Non-blank lines that were dropped as malformed.
    pub skipped: usize,
}

/// Outcome of `load`. A missing file is reported separately from a file that
/// yielded no turns; both amount to an empty history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionLoad {
    NotFound(PathBuf),
    Loaded(LoadedSession),
}

impl SessionLoad {
    pub fn turns(&self) -> &[Turn] {
        match self {
            SessionLoad::NotFound(_) => &[],
            SessionLoad::Loaded(session) => &session.turns,
        }
    }

    pub fn into_turns(self) -> Vec<Turn> {
        match self {
            SessionLoad::NotFound(_) => Vec::new(),
            SessionLoad::Loaded(session) => session.turns,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, SessionLoad::Loaded(_))
    }
}

/// Parse one log line. Returns `None` for anything that is not a well-formed
/// `{"role": system|user|assistant, "content": <string>}` object.
pub fn parse_line(line: &str) -> Option<Turn> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    serde_json::from_str(line).ok()
}

/// Read every valid turn from a JSONL file, in file order.
///
/// Malformed lines (bad UTF-8, bad JSON, unknown role, non-string content) are
/// skipped. Only failures to open or read the file itself are errors.
pub fn load(path: &Path) -> Result<SessionLoad, HistoryError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "Session file not found");
            return Ok(SessionLoad::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(HistoryError::io(path, e)),
    };

    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    let mut turns = Vec::new();
    let mut skipped = 0;

    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| HistoryError::io(path, e))?;
        if n == 0 {
            break;
        }

        let Ok(text) = std::str::from_utf8(&buf) else {
            skipped += 1;
            continue;
        };
        if text.trim().is_empty() {
            continue;
        }
        match parse_line(text) {
            Some(turn) => turns.push(turn),
            None => skipped += 1,
        }
    }

    info!(path = %path.display(), turns = turns.len(), skipped, "Loaded session file");
    Ok(SessionLoad::Loaded(LoadedSession {
        path: path.to_path_buf(),
        turns,
        skipped,
    }))
}
