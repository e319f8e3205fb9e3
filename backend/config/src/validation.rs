//! Config validation: value checks with user-friendly error messages.

use std::fmt;

use crate::defaults::MAX_MESSAGES_WARN_ABOVE;
use crate::schema::QwenConfig;
use thiserror::Error;

/// A config validation error with key and message.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// Every problem found in one pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        write!(f, "{}", lines.join("; "))
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &QwenConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_server(config, &mut report);
    validate_session(config, &mut report);
    validate_sampling(config, &mut report);
    report
}

fn validate_server(config: &QwenConfig, report: &mut ValidationReport) {
    if config.model.trim().is_empty() {
        report.error("model", "Model cannot be empty");
    }
    if !(config.host.starts_with("http://") || config.host.starts_with("https://")) {
        report.error(
            "host",
            format!("Host must start with http:// or https:// (got '{}')", config.host),
        );
    }
}

fn validate_session(config: &QwenConfig, report: &mut ValidationReport) {
    if config.history_max_bytes == 0 {
        report.error("history_max_bytes", "Rotation threshold must be greater than 0");
    }
    if config.history_dir.trim().is_empty() {
        report.error("history_dir", "History directory cannot be empty");
    }
    if config.system_prompt.trim().is_empty() {
        report.warn("system_prompt", "System prompt is empty");
    }
    if config.max_messages > MAX_MESSAGES_WARN_ABOVE {
        report.warn(
            "max_messages",
            format!(
                "{} turns is a large context; requests may become slow",
                config.max_messages
            ),
        );
    }
}

fn validate_sampling(config: &QwenConfig, report: &mut ValidationReport) {
    if let Some(t) = config.temperature {
        if !(0.0..=2.0).contains(&t) {
            report.error("temperature", format!("Must be between 0 and 2 (got {t})"));
        }
    }
    if let Some(p) = config.top_p {
        if !(0.0..=1.0).contains(&p) {
            report.error("top_p", format!("Must be between 0 and 1 (got {p})"));
        }
    }
}
