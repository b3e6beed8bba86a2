//! Configuration for dispatcher logging.

use super::constants::{
    DEFAULT_REDACTION_REPLACEMENT, DEFAULT_SENSITIVE_FIELDS, DEFAULT_SLOW_THRESHOLD_MS,
};
use super::types::LogLevel;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Returns the default set of fields to redact.
fn default_redacted_fields() -> HashSet<String> {
    DEFAULT_SENSITIVE_FIELDS
        .iter()
        .map(|field| field.to_string())
        .collect()
}

/// Configuration for RPC logging.
///
/// Controls the level of per-call events, whether inputs are logged,
/// redaction settings, and the slow batch threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level at which completed calls are logged.
    pub level: LogLevel,
    /// Whether to log call inputs (always redacted).
    pub log_inputs: bool,
    /// Field names to redact from logs (substring match ignoring case, `_` and `-`).
    pub redacted_fields: HashSet<String>,
    /// Replacement string for redacted values.
    pub redaction_replacement: String,
    /// Paths whose calls are not logged individually.
    pub excluded_paths: HashSet<String>,
    /// Optional threshold in milliseconds for slow batch warnings.
    pub slow_batch_threshold_ms: Option<u64>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Debug,
            log_inputs: false,
            redacted_fields: default_redacted_fields(),
            redaction_replacement: DEFAULT_REDACTION_REPLACEMENT.to_string(),
            excluded_paths: HashSet::new(),
            slow_batch_threshold_ms: Some(DEFAULT_SLOW_THRESHOLD_MS),
        }
    }
}

impl LogConfig {
    /// Creates a new logging configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the level for completed calls.
    #[must_use = "This method returns a new LogConfig and does not modify self"]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets whether to log call inputs (will be redacted).
    #[must_use = "This method returns a new LogConfig and does not modify self"]
    pub fn with_input_logging(mut self, enabled: bool) -> Self {
        self.log_inputs = enabled;
        self
    }

    /// Adds a field name to the redaction list.
    #[must_use = "This method returns a new LogConfig and does not modify self"]
    pub fn redact_field(mut self, field: impl Into<String>) -> Self {
        self.redacted_fields.insert(field.into());
        self
    }

    /// Clears all redacted fields (removes default sensitive fields).
    #[must_use = "This method returns a new LogConfig and does not modify self"]
    pub fn clear_redacted_fields(mut self) -> Self {
        self.redacted_fields.clear();
        self
    }

    /// Sets the replacement string for redacted values.
    #[must_use = "This method returns a new LogConfig and does not modify self"]
    pub fn with_redaction_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.redaction_replacement = replacement.into();
        self
    }

    /// Excludes a path from per-call logging.
    #[must_use = "This method returns a new LogConfig and does not modify self"]
    pub fn exclude_path(mut self, path: impl Into<String>) -> Self {
        self.excluded_paths.insert(path.into());
        self
    }

    /// Sets the threshold in milliseconds for slow batch warnings.
    #[must_use = "This method returns a new LogConfig and does not modify self"]
    pub fn with_slow_batch_threshold(mut self, threshold_ms: u64) -> Self {
        self.slow_batch_threshold_ms = Some(threshold_ms);
        self
    }

    /// Disables slow batch logging.
    #[must_use = "This method returns a new LogConfig and does not modify self"]
    pub fn without_slow_batch_logging(mut self) -> Self {
        self.slow_batch_threshold_ms = None;
        self
    }

    /// Checks if a path should be logged (not in excluded paths).
    pub fn should_log_path(&self, path: &str) -> bool {
        !self.excluded_paths.contains(path)
    }

    /// Whether a batch of this duration counts as slow.
    pub fn is_slow(&self, duration_ms: u64) -> bool {
        self.slow_batch_threshold_ms
            .is_some_and(|threshold| threshold > 0 && duration_ms > threshold)
    }
}
