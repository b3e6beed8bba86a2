//! Error types for RPC operations
//!
//! Every failure that can reach a caller is an [`RpcError`] tagged with an
//! [`RpcErrorCode`]. Codes serialize in PascalCase (`"BadRequest"`,
//! `"InternalError"`) and are the stable part of the wire contract.
//!
//! # Propagation
//!
//! Resolution and validation failures are raised by the dispatcher itself.
//! Handlers may raise the domain codes ([`RpcErrorCode::NotFound`],
//! [`RpcErrorCode::BadRequest`], [`RpcErrorCode::Conflict`]) and those travel
//! to the client verbatim. Anything else is downgraded by
//! [`RpcError::into_wire`] to a generic `InternalError` before it leaves the
//! server.
//!
//! # Example
//! ```rust,ignore
//! use typed_rpc::{RpcError, RpcErrorCode};
//!
//! let error = RpcError::new(RpcErrorCode::NotFound, "User not found");
//! let error = RpcError::not_found("User not found"); // Convenience method
//! ```

use crate::validation::FieldIssue;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Message sent in place of any server-side fault.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

/// Type-safe error codes for RPC operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RpcErrorCode {
    // Client errors (4xx equivalent)
    /// Kind mismatch, schema violation or malformed request
    BadRequest,
    /// Procedure path or domain entity is absent
    NotFound,
    /// Domain-level uniqueness or state violation
    Conflict,
    /// Input or batch exceeds configured limits
    PayloadTooLarge,

    // Server errors (5xx equivalent)
    /// Unexpected fault; details are withheld from the wire
    InternalError,

    // Client-side only
    /// Network fault, timeout or malformed response observed by the client
    TransportError,
}

impl RpcErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadRequest => "BadRequest",
            Self::NotFound => "NotFound",
            Self::Conflict => "Conflict",
            Self::PayloadTooLarge => "PayloadTooLarge",
            Self::InternalError => "InternalError",
            Self::TransportError => "TransportError",
        }
    }

    /// Returns true if this is a client error (4xx equivalent).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::BadRequest | Self::NotFound | Self::Conflict | Self::PayloadTooLarge
        )
    }

    /// Returns true if this is a server error (5xx equivalent).
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::InternalError)
    }

    /// HTTP status used when the error rejects a whole wire request.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::PayloadTooLarge => 413,
            Self::InternalError => 500,
            Self::TransportError => 502,
        }
    }
}

impl fmt::Display for RpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// RPC error with type-safe code and message.
///
/// `cause` is for server logs only; it is never serialized.
///
/// # Example
/// ```rust,ignore
/// use typed_rpc::RpcError;
///
/// let error = RpcError::conflict("Email already registered")
///     .with_details(serde_json::json!({ "field": "email" }))
///     .with_cause("unique index users.email");
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("[{code}] {message}")]
pub struct RpcError {
    /// Type-safe error code
    pub code: RpcErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Per-field violations (schema failures)
    #[serde(default)]
    pub field_issues: Vec<FieldIssue>,
    /// Optional additional details (JSON value)
    #[serde(default)]
    pub details: Option<serde_json::Value>,
    /// Optional cause for debugging, never sent to clients
    #[serde(skip)]
    pub cause: Option<String>,
}

impl RpcError {
    /// Create a new error with code and message.
    pub fn new(code: RpcErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field_issues: Vec::new(),
            details: None,
            cause: None,
        }
    }

    /// Add details to the error.
    pub fn with_details(mut self, details: impl Serialize) -> Self {
        self.details = serde_json::to_value(details).ok();
        self
    }

    /// Add a cause string for debugging.
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Attach field-level violations.
    pub fn with_field_issues(mut self, issues: Vec<FieldIssue>) -> Self {
        self.field_issues = issues;
        self
    }

    /// True for codes a handler may raise and have delivered verbatim.
    pub fn is_domain_error(&self) -> bool {
        matches!(
            self.code,
            RpcErrorCode::NotFound | RpcErrorCode::BadRequest | RpcErrorCode::Conflict
        )
    }

    /// Sanitize a server error for client response.
    pub fn sanitize(mut self) -> Self {
        if self.code.is_server_error() {
            debug!(
                original_message = %self.message,
                "Sanitizing internal error for client response"
            );
            self.message = INTERNAL_ERROR_MESSAGE.to_string();
            self.field_issues.clear();
            self.details = None;
        }
        self.cause = None;
        self
    }

    /// Shape a handler-raised error for the wire.
    ///
    /// Domain errors pass through without their cause. Every other code,
    /// including client-only codes a handler has no business raising, becomes
    /// a sanitized `InternalError`.
    pub fn into_wire(self) -> Self {
        if self.is_domain_error() {
            return Self {
                cause: None,
                ..self
            };
        }
        Self::new(RpcErrorCode::InternalError, self.message).sanitize()
    }

    // Convenience constructors

    /// Create a NotFound error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::NotFound, message)
    }

    /// Create a BadRequest error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::BadRequest, message)
    }

    /// Create a Conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::Conflict, message)
    }

    /// Create an InternalError.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::InternalError, message)
    }

    /// Create a PayloadTooLarge error.
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::PayloadTooLarge, message)
    }

    /// Create a TransportError.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::TransportError, message)
    }

    /// NotFound for a path the router does not serve.
    pub fn procedure_not_found(path: &str) -> Self {
        Self::not_found(format!("Procedure '{}' not found", path))
    }

    /// BadRequest carrying every schema violation.
    pub fn invalid_input(issues: Vec<FieldIssue>) -> Self {
        Self::bad_request("Input validation failed").with_field_issues(issues)
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal("JSON serialization failed").with_cause(err.to_string())
    }
}

impl From<std::io::Error> for RpcError {
    fn from(err: std::io::Error) -> Self {
        Self::internal("IO failure").with_cause(err.to_string())
    }
}

impl Serialize for RpcError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("RpcError", 4)?;
        state.serialize_field("code", &self.code)?;
        state.serialize_field("message", &self.message)?;

        if !self.field_issues.is_empty() {
            state.serialize_field("fieldIssues", &self.field_issues)?;
        }

        if let Some(ref details) = self.details {
            state.serialize_field("details", details)?;
        }

        state.end()
    }
}

/// Result type alias for RPC operations.
pub type RpcResult<T> = Result<T, RpcError>;

// =============================================================================
// Tests
// =============================================================================
