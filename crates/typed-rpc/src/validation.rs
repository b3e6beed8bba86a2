//! Field issues and structural checks
//!
//! [`FieldIssue`] is the unit of schema failure reporting: one entry per
//! violated field, addressed by a dotted path (`address.zip`, `tags[2]`).
//! The helpers at the bottom check router segments at composition time and
//! input sizes at dispatch time.

use crate::{RpcConfig, RpcError};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Validation failure for a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    /// Dotted path of the offending field; empty for the input root
    pub path: String,
    /// Human-readable error message
    pub message: String,
    /// Machine-readable failure code
    pub code: String,
}

impl FieldIssue {
    /// Create a new field issue
    pub fn new(path: impl Into<String>, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            code: code.into(),
        }
    }

    /// Required field is absent or null
    pub fn required(path: &str) -> Self {
        Self::new(path, format!("{} is required", display(path)), "required")
    }

    /// Value has the wrong JSON type
    pub fn invalid_type(path: &str, expected: &str, received: &str) -> Self {
        Self::new(
            path,
            format!("Expected {}, received {}", expected, received),
            "invalid_type",
        )
    }

    /// String shorter than allowed
    pub fn min_length(path: &str, min: usize) -> Self {
        Self::new(
            path,
            format!("{} must be at least {} characters", display(path), min),
            "min_length",
        )
    }

    /// String longer than allowed
    pub fn max_length(path: &str, max: usize) -> Self {
        Self::new(
            path,
            format!("{} must be at most {} characters", display(path), max),
            "max_length",
        )
    }

    /// Number below its lower bound
    pub fn too_small(path: &str, bound: f64, exclusive: bool) -> Self {
        let relation = if exclusive { "greater than" } else { "at least" };
        Self::new(
            path,
            format!("{} must be {} {}", display(path), relation, bound),
            "too_small",
        )
    }

    /// Number above its upper bound
    pub fn too_big(path: &str, bound: f64) -> Self {
        Self::new(
            path,
            format!("{} must be at most {}", display(path), bound),
            "too_big",
        )
    }

    /// Number with a fractional part where an integer is required
    pub fn not_integer(path: &str) -> Self {
        Self::new(path, format!("{} must be an integer", display(path)), "integer")
    }

    /// String failing the email shape check
    pub fn email(path: &str) -> Self {
        Self::new(
            path,
            format!("{} must be a valid email address", display(path)),
            "email",
        )
    }

    /// String failing a regex pattern
    pub fn pattern(path: &str, pattern: &str) -> Self {
        Self::new(
            path,
            format!("{} must match pattern {}", display(path), pattern),
            "pattern",
        )
    }

    /// Value outside an enumerated set
    pub fn invalid_enum(path: &str, allowed: &[String]) -> Self {
        Self::new(
            path,
            format!("{} must be one of: {}", display(path), allowed.join(", ")),
            "invalid_enum",
        )
    }

    /// Field not declared by a strict object schema
    pub fn unrecognized_key(path: &str) -> Self {
        Self::new(path, format!("Unrecognized field {}", path), "unrecognized_key")
    }
}

fn display(path: &str) -> &str {
    if path.is_empty() { "input" } else { path }
}

// =============================================================================
// Structural Checks
// =============================================================================

/// Reason a router segment was rejected.
pub(crate) fn segment_problem(segment: &str) -> Option<String> {
    if segment.is_empty() {
        return Some("segment cannot be empty".to_string());
    }
    if segment.contains('.') {
        return Some("segment cannot contain '.'".to_string());
    }
    segment
        .chars()
        .find(|&ch| !ch.is_ascii_alphanumeric() && ch != '_')
        .map(|ch| format!("segment contains invalid character '{}'", ch))
}

/// Validate a dotted procedure path shape before resolution.
///
/// Any failure means the path cannot name a procedure, so the dispatcher
/// reports it as `NotFound`.
pub fn validate_path(path: &str) -> Result<(), RpcError> {
    if let Some(problem) = path.split('.').find_map(segment_problem) {
        trace!(path = %path, problem = %problem, "Rejecting malformed procedure path");
        return Err(RpcError::procedure_not_found(path).with_cause(problem));
    }
    Ok(())
}

/// Validate input size against configuration limit.
///
/// Scalars are estimated without serializing; composite values are measured.
///
/// # Errors
///
/// Returns `RpcError::payload_too_large` if the input exceeds the configured maximum size.
pub fn validate_input_size(input: &serde_json::Value, config: &RpcConfig) -> Result<(), RpcError> {
    use serde_json::Value;

    let size = match input {
        Value::Null => 4,
        Value::Bool(_) => 5,
        Value::Number(_) => 20,
        Value::String(s) => s.len() + 2,
        Value::Array(arr) if arr.is_empty() => 2,
        Value::Object(obj) if obj.is_empty() => 2,
        _ => serde_json::to_vec(input).map(|v| v.len())?,
    };

    if size > config.max_input_size {
        return Err(RpcError::payload_too_large(format!(
            "Input size {} bytes exceeds maximum {} bytes",
            size, config.max_input_size
        )));
    }
    Ok(())
}
