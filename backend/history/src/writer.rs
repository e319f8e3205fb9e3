//! Rotating JSONL session log.
//!
//! Files are named `{title}-{YYYY-MM-DD}-{index}.jsonl`. The size check runs
//! before every write, so a file can end up at most one line over the
//! threshold before the next write rolls to `index + 1`.

use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use tracing::{debug, info};

use qwen_core::Turn;

use crate::error::HistoryError;
use crate::title::sanitize_title;

/// Default rotation threshold: 1 MiB.
pub const DEFAULT_MAX_BYTES: u64 = 1024 * 1024;

/// Build the file name for one rotation index of a session.
pub fn log_file_name(title: &str, date: &str, index: u32) -> String {
    format!("{title}-{date}-{index}.jsonl")
}

/// Result of a single write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// File the line landed in.
    pub path: PathBuf,
    /// True if this write opened a new file first.
    pub rotated: bool,
}

struct OpenFile {
    path: PathBuf,
    file: File,
}

/// Append-only writer for one session.
///
/// Owns the open handle; it is released on `close()` or when the writer is
/// dropped, whichever comes first.
pub struct SessionLog {
    dir: PathBuf,
    title: String,
    date: String,
    max_bytes: u64,
    index: u32,
    current: Option<OpenFile>,
    written: Vec<PathBuf>,
}

impl SessionLog {
    /// Open a log for `title` dated today (local time).
    pub fn open(dir: impl AsRef<Path>, title: &str, max_bytes: u64) -> Result<Self, HistoryError> {
        Self::open_on(dir, title, Local::now().date_naive(), max_bytes)
    }

    /// Open a log for `title` on an explicit calendar date.
    pub fn open_on(
        dir: impl AsRef<Path>,
        title: &str,
        date: NaiveDate,
        max_bytes: u64,
    ) -> Result<Self, HistoryError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| HistoryError::io(&dir, e))?;

        let title = sanitize_title(title);
        let date = date.format("%Y-%m-%d").to_string();
        let start = lowest_unused_index(&dir, &title, &date)?;

        let mut log = Self {
            dir,
            title,
            date,
            max_bytes,
            index: start,
            current: None,
            written: Vec::new(),
        };
        log.open_from(start)?;
        if let Some(path) = log.path() {
            info!(path = %path.display(), "Opened session log");
        }
        Ok(log)
    }

    /// Path of the file currently receiving writes.
    pub fn path(&self) -> Option<&Path> {
        self.current.as_ref().map(|f| f.path.as_path())
    }

    /// Every file this writer has opened, in rotation order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.written
    }

    /// Current rotation index.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Append one turn as a single JSON line and flush it.
    pub fn write(&mut self, turn: &Turn) -> Result<WriteOutcome, HistoryError> {
        let size = {
            let current = self.current.as_ref().ok_or(HistoryError::Closed)?;
            current
                .file
                .metadata()
                .map_err(|e| HistoryError::io(&current.path, e))?
                .len()
        };

        let rotated = size >= self.max_bytes;
        if rotated {
            self.rotate()?;
        }

        let mut line = serde_json::to_string(turn)?;
        line.push('\n');

        let current = self.current.as_mut().ok_or(HistoryError::Closed)?;
        current
            .file
            .write_all(line.as_bytes())
            .and_then(|_| current.file.flush())
            .map_err(|e| HistoryError::io(&current.path, e))?;

        Ok(WriteOutcome {
            path: current.path.clone(),
            rotated,
        })
    }

    /// Flush and release the handle. Safe to call any number of times.
    pub fn close(&mut self) {
        if let Some(mut open) = self.current.take() {
            let _ = open.file.flush();
            debug!(path = %open.path.display(), "Closed session log");
        }
    }

    /// Open the next file before letting go of the current one, so a failed
    /// roll leaves the old handle in place and the next write retries it.
    fn rotate(&mut self) -> Result<(), HistoryError> {
        let next = self.create_from(self.index + 1)?;
        self.close();
        self.install(next);
        if let Some(path) = self.path() {
            info!(index = self.index, path = %path.display(), "Rolled session log");
        }
        Ok(())
    }

    fn open_from(&mut self, index: u32) -> Result<(), HistoryError> {
        let next = self.create_from(index)?;
        self.install(next);
        Ok(())
    }

    fn install(&mut self, (index, open): (u32, OpenFile)) {
        self.index = index;
        self.written.push(open.path.clone());
        self.current = Some(open);
    }

    /// Create the first free file at or above `index`.
    fn create_from(&self, mut index: u32) -> Result<(u32, OpenFile), HistoryError> {
        loop {
            let path = self.dir.join(log_file_name(&self.title, &self.date, index));
            match OpenOptions::new().append(true).create_new(true).open(&path) {
                Ok(file) => return Ok((index, OpenFile { path, file })),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "Log index taken; trying next");
                    index += 1;
                }
                Err(e) => return Err(HistoryError::io(path, e)),
            }
        }
    }
}

impl Drop for SessionLog {
    fn drop(&mut self) {
        self.close();
    }
}

/// Lowest positive index not yet used by `title` on `date`.
fn lowest_unused_index(dir: &Path, title: &str, date: &str) -> Result<u32, HistoryError> {
    let prefix = format!("{title}-{date}-");
    let entries = fs::read_dir(dir).map_err(|e| HistoryError::io(dir, e))?;

    let used: BTreeSet<u32> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_owned))
        .filter_map(|name| {
            name.strip_prefix(&prefix)?
                .strip_suffix(".jsonl")?
                .parse::<u32>()
                .ok()
        })
        .collect();

    Ok((1..).find(|i| !used.contains(i)).unwrap_or(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{load, SessionLoad};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    fn read_turns(paths: &[PathBuf]) -> Vec<Turn> {
        paths
            .iter()
            .flat_map(|p| match load(p).unwrap() {
                SessionLoad::Loaded(s) => s.turns,
                SessionLoad::NotFound(_) => panic!("missing {}", p.display()),
            })
            .collect()
    }

    #[test]
    fn test_open_creates_directory_and_first_index() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("history");
        let log = SessionLog::open_on(&dir, "My Chat", date(), DEFAULT_MAX_BYTES).unwrap();

        let path = log.path().unwrap();
        assert_eq!(path, dir.join("My-Chat-2024-05-17-1.jsonl"));
        assert!(path.exists());
        assert_eq!(log.index(), 1);
    }

    #[test]
    fn test_open_skips_existing_indices() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("t-2024-05-17-1.jsonl"), "").unwrap();
        fs::write(tmp.path().join("t-2024-05-17-2.jsonl"), "").unwrap();
        // Other titles and dates do not count.
        fs::write(tmp.path().join("other-2024-05-17-9.jsonl"), "").unwrap();
        fs::write(tmp.path().join("t-2024-05-16-7.jsonl"), "").unwrap();

        let log = SessionLog::open_on(tmp.path(), "t", date(), DEFAULT_MAX_BYTES).unwrap();
        assert_eq!(log.index(), 3);
    }

    #[test]
    fn test_open_fills_the_lowest_gap() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("t-2024-05-17-1.jsonl"), "").unwrap();
        fs::write(tmp.path().join("t-2024-05-17-3.jsonl"), "").unwrap();

        let mut log = SessionLog::open_on(tmp.path(), "t", date(), 1).unwrap();
        assert_eq!(log.index(), 2);
        assert_eq!(log.path().unwrap(), tmp.path().join("t-2024-05-17-2.jsonl"));

        // Rolling from the gap steps over the file that is already there.
        log.write(&Turn::user("a")).unwrap();
        let outcome = log.write(&Turn::user("b")).unwrap();
        assert!(outcome.rotated);
        assert_eq!(log.index(), 4);
        assert_eq!(fs::read_to_string(tmp.path().join("t-2024-05-17-3.jsonl")).unwrap(), "");
    }

    #[test]
    fn test_write_appends_one_json_line_per_turn() {
        let tmp = tempfile::tempdir().unwrap();
        let mut log = SessionLog::open_on(tmp.path(), "s", date(), DEFAULT_MAX_BYTES).unwrap();
        log.write(&Turn::system("sys")).unwrap();
        log.write(&Turn::user("hi")).unwrap();

        let raw = fs::read_to_string(log.path().unwrap()).unwrap();
        assert_eq!(
            raw,
            "{\"role\":\"system\",\"content\":\"sys\"}\n{\"role\":\"user\",\"content\":\"hi\"}\n"
        );
    }

    #[test]
    fn test_rotates_when_file_reaches_one_mebibyte() {
        let tmp = tempfile::tempdir().unwrap();
        let mut log = SessionLog::open_on(tmp.path(), "big", date(), DEFAULT_MAX_BYTES).unwrap();

        let overhead = serde_json::to_string(&Turn::user("")).unwrap().len() as u64 + 1;
        let filler = "x".repeat((DEFAULT_MAX_BYTES - overhead) as usize);
        let first = log.write(&Turn::user(filler)).unwrap();
        assert!(!first.rotated);
        assert_eq!(fs::metadata(&first.path).unwrap().len(), DEFAULT_MAX_BYTES);

        let second = log.write(&Turn::assistant("next")).unwrap();
        assert!(second.rotated);
        assert_eq!(second.path, tmp.path().join("big-2024-05-17-2.jsonl"));
        assert_eq!(log.index(), 2);
    }

    #[test]
    fn test_rotation_keeps_every_turn_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let mut log = SessionLog::open_on(tmp.path(), "r", date(), 100).unwrap();

        let turns: Vec<Turn> = (0..25)
            .map(|i| {
                if i % 2 == 0 {
                    Turn::user(format!("question {i}"))
                } else {
                    Turn::assistant(format!("answer number {i} with some padding"))
                }
            })
            .collect();

        for turn in &turns {
            let size_before = log
                .path()
                .map(|p| fs::metadata(p).unwrap().len())
                .unwrap_or(0);
            let outcome = log.write(turn).unwrap();
            if !outcome.rotated {
                assert!(size_before < 100, "wrote into a file already at the threshold");
            }
        }

        assert!(log.paths().len() > 1);
        assert_eq!(read_turns(log.paths()), turns);
    }

    #[test]
    fn test_rotation_skips_index_created_meanwhile() {
        let tmp = tempfile::tempdir().unwrap();
        let mut log = SessionLog::open_on(tmp.path(), "c", date(), 1).unwrap();
        log.write(&Turn::user("a")).unwrap();
        fs::write(tmp.path().join("c-2024-05-17-2.jsonl"), "").unwrap();

        let outcome = log.write(&Turn::user("b")).unwrap();
        assert!(outcome.rotated);
        assert_eq!(log.index(), 3);
    }

    #[test]
    fn test_failed_rotation_keeps_logging_alive() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("history");
        let mut log = SessionLog::open_on(&dir, "f", date(), 1).unwrap();
        log.write(&Turn::user("a")).unwrap();

        // The next file cannot be created while the directory is gone.
        fs::remove_dir_all(&dir).unwrap();
        assert!(matches!(log.write(&Turn::user("lost")), Err(HistoryError::Io { .. })));
        assert!(log.path().is_some());
        assert_eq!(log.index(), 1);

        fs::create_dir_all(&dir).unwrap();
        let outcome = log.write(&Turn::user("c")).unwrap();
        assert!(outcome.rotated);
        assert_eq!(outcome.path, dir.join("f-2024-05-17-2.jsonl"));
        assert_eq!(read_turns(&[outcome.path]), vec![Turn::user("c")]);
    }

    #[test]
    fn test_round_trip_preserves_content() {
        let tmp = tempfile::tempdir().unwrap();
        let mut log = SessionLog::open_on(tmp.path(), "rt", date(), DEFAULT_MAX_BYTES).unwrap();
        let tricky = Turn::assistant("line one\nline \"two\"\t— ünïcødé 🚀\\");
        log.write(&tricky).unwrap();

        assert_eq!(read_turns(log.paths()), vec![tricky]);
    }

    #[test]
    fn test_close_is_idempotent_and_blocks_writes() {
        let tmp = tempfile::tempdir().unwrap();
        let mut log = SessionLog::open_on(tmp.path(), "x", date(), DEFAULT_MAX_BYTES).unwrap();
        log.close();
        log.close();
        assert!(log.path().is_none());
        assert!(matches!(log.write(&Turn::user("late")), Err(HistoryError::Closed)));
    }
}
