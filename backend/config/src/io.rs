//! Config file read/write with atomic backup rotation.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::ConfigError;
use crate::schema::{QwenConfig, KEYS};

const CONFIG_FILE_NAME: &str = "config.json";

/// Number of rolling backups to keep.
const MAX_BACKUPS: usize = 3;

/// Keys whose value may be cleared with `null`.
const OPTIONAL_KEYS: &[&str] = &["temperature", "top_p"];

/// Resolve the qwen-cli config directory (`~/.qwen`).
pub fn config_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".qwen"),
        None => PathBuf::from(".qwen"),
    }
}

/// Resolve the config file path.
/// Priority: `QWEN_CONFIG` env > `~/.qwen/config.json`
pub fn config_file_path() -> PathBuf {
    config_file_path_from(std::env::var("QWEN_CONFIG").ok())
}

fn config_file_path_from(env_value: Option<String>) -> PathBuf {
    match env_value {
        Some(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => config_dir().join(CONFIG_FILE_NAME),
    }
}

/// Load and parse the config from disk.
///
/// Returns `Ok(Default::default())` if the file doesn't exist (first run).
/// The defaults are not written back.
pub async fn load_config(path: &Path) -> Result<QwenConfig, ConfigError> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Config file does not exist; using defaults");
            return Ok(QwenConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let config: QwenConfig = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Write config to disk atomically (write to temp file, rename).
///
/// The previous file is kept as `config.json.bak.1`, older backups shift up.
pub async fn write_config(config: &QwenConfig, path: &Path) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    if fs::try_exists(path).await.unwrap_or(false) {
        rotate_backups(path).await;
    }

    let mut json = serde_json::to_string_pretty(config)?;
    json.push('\n');

    let tmp_path = sibling(path, ".tmp");
    fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(write_err)?;
    fs::rename(&tmp_path, path).await.map_err(write_err)?;

    info!(path = %path.display(), "Wrote config");
    Ok(())
}

/// Shift `.bak.1` → `.bak.2` → ... and copy the current file to `.bak.1`.
async fn rotate_backups(path: &Path) {
    for i in (1..MAX_BACKUPS).rev() {
        let old = sibling(path, &format!(".bak.{i}"));
        let new = sibling(path, &format!(".bak.{}", i + 1));
        if fs::try_exists(&old).await.unwrap_or(false) {
            if let Err(e) = fs::rename(&old, &new).await {
                warn!("Failed to rotate backup {}: {}", old.display(), e);
            }
        }
    }

    let bak = sibling(path, ".bak.1");
    if let Err(e) = fs::copy(path, &bak).await {
        warn!("Failed to create backup {}: {}", bak.display(), e);
    }
}

/// `config.json` + `.bak.1` → `config.json.bak.1`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Read a single key as JSON. Unset optional keys come back as `null`.
pub fn get_key(config: &QwenConfig, key: &str) -> Result<Value, ConfigError> {
    ensure_known(key)?;
    let value = serde_json::to_value(config)?;
    Ok(value.get(key).cloned().unwrap_or(Value::Null))
}

/// Set a single key from its command-line text and return the updated config.
///
/// Numeric keys are parsed as JSON numbers; `null` clears an optional key;
/// everything else is taken as a string.
pub fn set_key(config: &QwenConfig, key: &str, raw: &str) -> Result<QwenConfig, ConfigError> {
    ensure_known(key)?;
    let current = get_key(config, key)?;

    let value = if raw == "null" {
        if !OPTIONAL_KEYS.contains(&key) {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                reason: "only optional keys can be cleared".into(),
            });
        }
        Value::Null
    } else if current.is_number() || OPTIONAL_KEYS.contains(&key) {
        serde_json::from_str::<Value>(raw)
            .ok()
            .filter(Value::is_number)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: key.to_string(),
                reason: format!("'{raw}' is not a number"),
            })?
    } else {
        Value::String(raw.to_string())
    };

    let patch = serde_json::json!({ key: value });
    apply_merge_patch(config, &patch)
}

fn ensure_known(key: &str) -> Result<(), ConfigError> {
    if KEYS.contains(&key) {
        Ok(())
    } else {
        Err(ConfigError::UnknownKey(key.to_string()))
    }
}

/// Patch config with a JSON Merge Patch (RFC 7396).
pub fn apply_merge_patch(config: &QwenConfig, patch: &Value) -> Result<QwenConfig, ConfigError> {
    let mut value = serde_json::to_value(config)?;
    json_merge_patch(&mut value, patch);
    serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
        key: patch
            .as_object()
            .and_then(|m| m.keys().next().cloned())
            .unwrap_or_default(),
        reason: e.to_string(),
    })
}

/// RFC 7396 JSON Merge Patch algorithm.
fn json_merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    let Value::Object(target_map) = target else {
        *target = patch.clone();
        return;
    };
    for (key, patch_val) in patch_map {
        if patch_val.is_null() {
            target_map.remove(key);
        } else {
            let entry = target_map.entry(key.clone()).or_insert(Value::Null);
            json_merge_patch(entry, patch_val);
        }
    }
}
