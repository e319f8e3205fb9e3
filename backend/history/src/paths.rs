use std::path::{Component, Path, PathBuf};

const LOG_SUFFIX: &str = ".jsonl";

/// Resolve the `--session` argument to a file path.
///
/// An existing path is used as given. Otherwise a bare identifier (no
/// directory part) is looked up in `history_dir`, with `.jsonl` appended when
/// missing. Anything else is returned unchanged so the caller can report it.
pub fn resolve_session_path(arg: &str, history_dir: &Path) -> PathBuf {
    let candidate = PathBuf::from(arg);
    if candidate.exists() || !is_bare(&candidate) {
        return candidate;
    }

    let file_name = if arg.ends_with(LOG_SUFFIX) {
        arg.to_string()
    } else {
        format!("{arg}{LOG_SUFFIX}")
    };
    history_dir.join(file_name)
}

fn is_bare(path: &Path) -> bool {
    let mut components = path.components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
