//! `qwen config`: inspect and edit the config file.
//!
//! Works on the file as stored; environment overrides are not applied here.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use clap::Subcommand;
use serde_json::Value;
use tracing::info;

use qwen_config::{check, get_key, load_config, set_key, write_config};

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print the config file location
    Path,
    /// Print one value
    Get { key: String },
    /// Set one value and save
    Set { key: String, value: String },
    /// Print the whole config as JSON
    List,
}

pub async fn run<W: Write>(action: ConfigAction, path: &Path, out: &mut W) -> Result<()> {
    match action {
        ConfigAction::Path => writeln!(out, "{}", path.display())?,
        ConfigAction::Get { key } => {
            let config = load_config(path).await?;
            match get_key(&config, &key)? {
                Value::Null => writeln!(out)?,
                Value::String(s) => writeln!(out, "{s}")?,
                other => writeln!(out, "{other}")?,
            }
        }
        ConfigAction::Set { key, value } => {
            let config = load_config(path).await?;
            let updated = set_key(&config, &key, &value)?;
            check(&updated)?;
            write_config(&updated, path).await?;
            info!(key = %key, path = %path.display(), "Config value saved");
            writeln!(out, "✅ Saved {key} to {}", path.display())?;
        }
        ConfigAction::List => {
            let config = load_config(path).await?;
            writeln!(out, "{}", serde_json::to_string_pretty(&config)?)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qwen_config::{ConfigError, QwenConfig};

    async fn exec(action: ConfigAction, path: &Path) -> Result<String> {
        let mut out = Vec::new();
        run(action, path, &mut out).await?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn set_then_get_round_trips_through_the_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");

        let saved = exec(
            ConfigAction::Set { key: "max_messages".into(), value: "8".into() },
            &path,
        )
        .await
        .unwrap();
        assert!(saved.starts_with("✅ Saved max_messages to "));

        let got = exec(ConfigAction::Get { key: "max_messages".into() }, &path).await.unwrap();
        assert_eq!(got, "8\n");
        let model = exec(ConfigAction::Get { key: "model".into() }, &path).await.unwrap();
        assert_eq!(model, format!("{}\n", QwenConfig::default().model));
        let unset = exec(ConfigAction::Get { key: "temperature".into() }, &path).await.unwrap();
        assert_eq!(unset, "\n");
    }

    #[tokio::test]
    async fn invalid_value_is_not_saved() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        let err = exec(
            ConfigAction::Set { key: "host".into(), value: "localhost:11434".into() },
            &path,
        )
        .await
        .unwrap_err();
        assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::Invalid(_))));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn unknown_key_is_a_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = exec(ConfigAction::Get { key: "colour".into() }, &tmp.path().join("c.json"))
            .await
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::UnknownKey(_))));
    }

    #[tokio::test]
    async fn list_prints_defaults_when_file_is_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let listed = exec(ConfigAction::List, &tmp.path().join("config.json")).await.unwrap();
        let parsed: QwenConfig = serde_json::from_str(&listed).unwrap();
        assert_eq!(parsed, QwenConfig::default());
    }
}
