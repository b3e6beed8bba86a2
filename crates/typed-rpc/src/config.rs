//! Server and client configuration.
//!
//! [`RpcConfig`] tunes the dispatcher and HTTP adapter; [`ClientConfig`]
//! tunes the batching client. Both deserialize from JSON with every field
//! optional, and both are checked once with `validate()` before use.
//!
//! # Example
//! ```rust,ignore
//! use typed_rpc::{BatchConfig, RpcConfig};
//!
//! let config = RpcConfig::new()
//!     .with_max_input_size(512 * 1024)
//!     .with_context_timeout(Duration::from_secs(2))
//!     .with_batch_config(BatchConfig::new().with_max_batch_size(50));
//! config.validate()?;
//! ```

use crate::batch::BatchConfig;
use crate::logging::LogConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Error type for configuration validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigValidationError {
    /// max_input_size must be greater than 0
    #[error("max_input_size must be greater than 0")]
    InvalidMaxInputSize,
    /// max_body_size must be at least max_input_size
    #[error("max_body_size ({body}) must be at least max_input_size ({input})")]
    InvalidMaxBodySize {
        /// Configured body limit
        body: usize,
        /// Configured input limit
        input: usize,
    },
    /// context_timeout_ms must be greater than 0
    #[error("context_timeout_ms must be greater than 0")]
    InvalidContextTimeout,
    /// request_timeout_ms must be greater than 0
    #[error("request_timeout_ms must be greater than 0")]
    InvalidRequestTimeout,
    /// Client max_batch_size must be greater than 0
    #[error("max_batch_size must be greater than 0")]
    InvalidClientBatchSize,
    /// BatchConfig validation failed
    #[error("invalid batch config: {0}")]
    InvalidBatchConfig(String),
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Dispatcher and HTTP adapter configuration.
///
/// * `max_input_size` - Maximum serialized size of one call's input in bytes.
///   Larger inputs fail that call with `PayloadTooLarge`. Default: 1MB.
///
/// * `max_body_size` - Maximum HTTP request body in bytes. Default: 4MB.
///
/// * `context_timeout_ms` - Upper bound on context creation. Default: 5000.
///
/// * `batch_config` - Batch size limit and execution mode.
///
/// * `logging` - Per-call logging and redaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Maximum input JSON size in bytes (default: 1MB)
    pub max_input_size: usize,
    /// Maximum HTTP body size in bytes (default: 4MB)
    pub max_body_size: usize,
    /// Context creation timeout in milliseconds (default: 5000)
    pub context_timeout_ms: u64,
    /// Batch request configuration
    pub batch_config: BatchConfig,
    /// Logging configuration
    pub logging: LogConfig,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            max_input_size: 1024 * 1024,
            max_body_size: 4 * 1024 * 1024,
            context_timeout_ms: 5000,
            batch_config: BatchConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl RpcConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Validate the configuration and return an error if invalid.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `max_input_size` is 0
    /// - `max_body_size` is smaller than `max_input_size`
    /// - `context_timeout_ms` is 0
    /// - `batch_config` is invalid (e.g., max_batch_size is 0)
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.max_input_size == 0 {
            return Err(ConfigValidationError::InvalidMaxInputSize);
        }
        if self.max_body_size < self.max_input_size {
            return Err(ConfigValidationError::InvalidMaxBodySize {
                body: self.max_body_size,
                input: self.max_input_size,
            });
        }
        if self.context_timeout_ms == 0 {
            return Err(ConfigValidationError::InvalidContextTimeout);
        }
        self.batch_config
            .validate()
            .map_err(ConfigValidationError::InvalidBatchConfig)?;
        Ok(())
    }

    /// Context creation timeout as a duration.
    pub fn context_timeout(&self) -> Duration {
        Duration::from_millis(self.context_timeout_ms)
    }

    /// Set the maximum input size.
    #[must_use = "This method returns a new RpcConfig and does not modify self"]
    pub fn with_max_input_size(mut self, size: usize) -> Self {
        self.max_input_size = size;
        self
    }

    /// Set the maximum HTTP body size.
    #[must_use = "This method returns a new RpcConfig and does not modify self"]
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Set the context creation timeout.
    #[must_use = "This method returns a new RpcConfig and does not modify self"]
    pub fn with_context_timeout(mut self, timeout: Duration) -> Self {
        self.context_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the batch configuration.
    #[must_use = "This method returns a new RpcConfig and does not modify self"]
    pub fn with_batch_config(mut self, config: BatchConfig) -> Self {
        self.batch_config = config;
        self
    }

    /// Set the logging configuration.
    #[must_use = "This method returns a new RpcConfig and does not modify self"]
    pub fn with_logging(mut self, config: LogConfig) -> Self {
        self.logging = config;
        self
    }
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Batching client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Maximum calls per wire request; larger batches are split (default: 100)
    pub max_batch_size: usize,
    /// Extra collection window in milliseconds; 0 means the same tick only
    pub batch_window_ms: u64,
    /// Round-trip timeout in milliseconds (default: 30000)
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            batch_window_ms: 0,
            request_timeout_ms: 30_000,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.max_batch_size == 0 {
            return Err(ConfigValidationError::InvalidClientBatchSize);
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigValidationError::InvalidRequestTimeout);
        }
        Ok(())
    }

    /// Extra collection window, if any.
    pub fn batch_window(&self) -> Option<Duration> {
        (self.batch_window_ms > 0).then(|| Duration::from_millis(self.batch_window_ms))
    }

    /// Round-trip timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Set the maximum calls per wire request.
    #[must_use = "This method returns a new ClientConfig and does not modify self"]
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    /// Set the extra collection window.
    #[must_use = "This method returns a new ClientConfig and does not modify self"]
    pub fn with_batch_window(mut self, window: Duration) -> Self {
        self.batch_window_ms = window.as_millis() as u64;
        self
    }

    /// Set the round-trip timeout.
    #[must_use = "This method returns a new ClientConfig and does not modify self"]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }
}
