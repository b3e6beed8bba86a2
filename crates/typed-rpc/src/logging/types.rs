//! Core types for the logging module.
//!
//! - RequestId: Unique identifier correlating every log line of one wire request
//! - LogLevel: Configurable log levels with ordering

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::constants::SHORT_ID_LENGTH;

/// Unique identifier for a wire request, used for tracing and correlation.
///
/// Uses UUID v7 for time-ordered, sortable identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(uuid::Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext)))
    }

    /// Returns the short form of the request ID (first N characters).
    pub fn short(&self) -> String {
        let full = self.0.to_string();
        full.chars().take(SHORT_ID_LENGTH).collect()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<uuid::Uuid> for RequestId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl FromStr for RequestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

/// Level at which successful calls are logged. Failed calls are always
/// logged at `warn` or above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// `trace`
    Trace,
    /// `debug`
    #[default]
    Debug,
    /// `info`
    Info,
    /// `warn`
    Warn,
    /// `error`
    Error,
    /// No per-call lines
    Off,
}

impl LogLevel {
    /// Whether a message at `target` passes a filter set to `self`.
    pub fn should_log(&self, target: LogLevel) -> bool {
        match (self.severity(), target.severity()) {
            (Some(threshold), Some(severity)) => severity >= threshold,
            _ => false,
        }
    }

    fn severity(&self) -> Option<u8> {
        match self {
            LogLevel::Trace => Some(0),
            LogLevel::Debug => Some(1),
            LogLevel::Info => Some(2),
            LogLevel::Warn => Some(3),
            LogLevel::Error => Some(4),
            LogLevel::Off => None,
        }
    }

    /// The matching `tracing` level; `None` for `Off`.
    pub fn to_tracing_level(&self) -> Option<tracing::Level> {
        match self {
            LogLevel::Trace => Some(tracing::Level::TRACE),
            LogLevel::Debug => Some(tracing::Level::DEBUG),
            LogLevel::Info => Some(tracing::Level::INFO),
            LogLevel::Warn => Some(tracing::Level::WARN),
            LogLevel::Error => Some(tracing::Level::ERROR),
            LogLevel::Off => None,
        }
    }

    /// Lowercase name, usable as an env-filter directive.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "off" => Ok(LogLevel::Off),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}
