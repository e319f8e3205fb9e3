//! Environment variable overrides.
//!
//! Applied after the file is read and before CLI flags. Each variable maps
//! onto exactly one config key.

use std::collections::HashMap;
use std::str::FromStr;

use tracing::debug;

use crate::error::ConfigError;
use crate::schema::QwenConfig;

/// Variables consulted, paired with the key they override.
pub const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("QWEN_MODEL", "model"),
    ("QWEN_OLLAMA_HOST", "host"),
    ("QWEN_SYSTEM", "system_prompt"),
    ("QWEN_MAX_MESSAGES", "max_messages"),
    ("QWEN_HISTORY_DIR", "history_dir"),
    ("QWEN_SESSION_TITLE", "title"),
    ("QWEN_HISTORY_MAX_BYTES", "history_max_bytes"),
];

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: &mut QwenConfig) -> Result<(), ConfigError> {
    let vars: HashMap<String, String> = ENV_OVERRIDES
        .iter()
        .filter_map(|(name, _)| std::env::var(name).ok().map(|v| (name.to_string(), v)))
        .collect();
    apply_env_overrides_with(config, &vars)
}

/// Apply overrides from an explicit map (for testing).
pub fn apply_env_overrides_with(
    config: &mut QwenConfig,
    vars: &HashMap<String, String>,
) -> Result<(), ConfigError> {
    for (name, key) in ENV_OVERRIDES {
        let Some(raw) = vars.get(*name) else { continue };
        debug!(var = name, key, "Applying environment override");
        match *key {
            "model" => config.model = raw.clone(),
            "host" => config.host = raw.clone(),
            "system_prompt" => config.system_prompt = raw.clone(),
            "history_dir" => config.history_dir = raw.clone(),
            "title" => config.title = raw.clone(),
            "max_messages" => config.max_messages = parse_number(name, raw)?,
            "history_max_bytes" => config.history_max_bytes = parse_number(name, raw)?,
            _ => {}
        }
    }
    Ok(())
}

fn parse_number<T>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue {
            key: name.to_string(),
            reason: format!("'{raw}' is not a valid number ({e})"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn overrides_string_and_numeric_keys() {
        let mut cfg = QwenConfig::default();
        let vars = env(&[
            ("QWEN_MODEL", "qwen2.5:7b"),
            ("QWEN_OLLAMA_HOST", "http://gpu-box:11434"),
            ("QWEN_MAX_MESSAGES", " 8 "),
            ("QWEN_HISTORY_MAX_BYTES", "4096"),
        ]);
        apply_env_overrides_with(&mut cfg, &vars).unwrap();
        assert_eq!(cfg.model, "qwen2.5:7b");
        assert_eq!(cfg.host, "http://gpu-box:11434");
        assert_eq!(cfg.max_messages, 8);
        assert_eq!(cfg.history_max_bytes, 4096);
    }

    #[test]
    fn unset_vars_leave_config_alone() {
        let mut cfg = QwenConfig::default();
        apply_env_overrides_with(&mut cfg, &env(&[("UNRELATED", "x")])).unwrap();
        assert_eq!(cfg, QwenConfig::default());
    }

    #[test]
    fn bad_number_is_an_error() {
        let mut cfg = QwenConfig::default();
        let err = apply_env_overrides_with(&mut cfg, &env(&[("QWEN_MAX_MESSAGES", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "QWEN_MAX_MESSAGES"));
    }
}
