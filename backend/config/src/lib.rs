//! `qwen-config`: qwen-cli runtime configuration.
//!
//! Provides:
//! - Typed config schema with defaults
//! - JSON read/write with atomic backup rotation
//! - `QWEN_*` environment overrides
//! - Value validation
//! - Single-key get/set via JSON merge patch

pub mod defaults;
pub mod env;
pub mod error;
pub mod io;
pub mod schema;
pub mod validation;

pub use env::{apply_env_overrides, apply_env_overrides_with, ENV_OVERRIDES};
pub use error::ConfigError;
pub use io::{apply_merge_patch, config_dir, config_file_path, get_key, load_config, set_key, write_config};
pub use schema::{expand_home, QwenConfig, KEYS};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use std::path::Path;

use tracing::warn;

/// Load the file, apply environment overrides, and validate.
///
/// This is the main entry point for loading a config at runtime. Warnings
/// are logged; any validation error fails the load.
pub async fn load_and_prepare(path: &Path) -> Result<QwenConfig, ConfigError> {
    let mut config = load_config(path).await?;
    apply_env_overrides(&mut config)?;
    check(&config)?;
    Ok(config)
}

/// Validate and log warnings; errors are returned as `ConfigError::Invalid`.
pub fn check(config: &QwenConfig) -> Result<(), ConfigError> {
    let report = validate(config);
    for w in &report.warnings {
        warn!("{}", w);
    }
    if report.is_valid() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(report))
    }
}
