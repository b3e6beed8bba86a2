//! Structured logging for dispatch
//!
//! Every wire request gets a [`RequestId`] (UUID v7). The dispatcher logs
//! each call at the configured [`LogLevel`], one summary line per batch,
//! and a warning when a batch is slower than the configured threshold.
//! Inputs are only logged when enabled, and always pass through the
//! [`RedactionEngine`] first.
//!
//! ```rust,ignore
//! use typed_rpc::logging::{LogConfig, LogLevel};
//!
//! let config = LogConfig::new()
//!     .with_level(LogLevel::Info)
//!     .with_input_logging(true)
//!     .redact_field("bloodType")
//!     .exclude_path("health")
//!     .with_slow_batch_threshold(250);
//! ```
//!
//! Output goes through `tracing`; installing a subscriber is left to the
//! binary.

// =============================================================================
// Submodules
// =============================================================================

mod config;
mod constants;
mod events;
mod lifecycle;
mod redaction;
mod types;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use constants::{
    DEFAULT_REDACTION_REPLACEMENT, DEFAULT_SENSITIVE_FIELDS, DEFAULT_SLOW_THRESHOLD_MS,
    SHORT_ID_LENGTH,
};

pub use types::{LogLevel, RequestId};

pub use config::LogConfig;

pub use redaction::RedactionEngine;

pub use events::{
    log_batch_rejected, log_batch_request, log_call, log_call_panicked, log_context_failure,
    log_malformed_call, log_slow_batch,
};

pub use lifecycle::{
    log_procedure_registered, log_router_built, log_server_listening, log_server_shutdown,
};
