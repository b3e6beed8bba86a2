//! Batch wire types
//!
//! A wire request is a JSON array of [`Call`]s; the response is a JSON array
//! of [`Envelope`]s of the same length. Position is the only correlation key:
//! `response[i]` answers `request[i]`.
//!
//! ```json
//! [{"path": "user.getById", "type": "query", "input": {"id": 1}},
//!  {"path": "user.create", "type": "mutation", "input": {"email": "bad"}}]
//!
//! [{"ok": true, "data": {"id": 1, "email": "a@b.com"}},
//!  {"ok": false, "error": {"code": "BadRequest", "message": "...", "fieldIssues": [...]}}]
//! ```

use crate::logging::RequestId;
use crate::procedure::ProcedureKind;
use crate::{RpcError, RpcResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{trace, warn};

// =============================================================================
// Batch Configuration
// =============================================================================

/// Configuration for batch request processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum number of calls allowed in a single wire request.
    /// Larger requests are rejected before any call runs.
    pub max_batch_size: usize,
    /// Whether calls of one batch run concurrently.
    /// When false, they run one after another in request order.
    pub parallel_execution: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            parallel_execution: true,
        }
    }
}

impl BatchConfig {
    /// Create a new batch configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum batch size.
    #[must_use = "This method returns a new BatchConfig and does not modify self"]
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        trace!(max_batch_size = size, "Setting batch max size");
        self.max_batch_size = size;
        self
    }

    /// Set whether to execute calls concurrently.
    #[must_use = "This method returns a new BatchConfig and does not modify self"]
    pub fn with_parallel_execution(mut self, parallel: bool) -> Self {
        self.parallel_execution = parallel;
        self
    }

    /// Reject a wire request of `len` calls when it is over the limit.
    pub fn check_size(&self, len: usize) -> RpcResult<()> {
        if len > self.max_batch_size {
            warn!(
                batch_size = len,
                max_size = self.max_batch_size,
                "Batch rejected: size exceeds maximum"
            );
            return Err(RpcError::payload_too_large(format!(
                "Batch size {} exceeds maximum allowed size {}",
                len, self.max_batch_size
            )));
        }
        Ok(())
    }

    /// Validate the batch configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_batch_size == 0 {
            warn!("BatchConfig validation failed: max_batch_size must be greater than 0");
            return Err("max_batch_size must be greater than 0".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Calls
// =============================================================================

/// One logical procedure invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    /// Dotted procedure path (e.g., "user.getById")
    pub path: String,
    /// Declared kind; must match the procedure
    #[serde(rename = "type")]
    pub kind: ProcedureKind,
    /// Raw input, `null` when omitted
    #[serde(default)]
    pub input: Value,
}

impl Call {
    /// A query call.
    pub fn query(path: impl Into<String>, input: Value) -> Self {
        Self {
            path: path.into(),
            kind: ProcedureKind::Query,
            input,
        }
    }

    /// A mutation call.
    pub fn mutation(path: impl Into<String>, input: Value) -> Self {
        Self {
            path: path.into(),
            kind: ProcedureKind::Mutation,
            input,
        }
    }

    /// Decode one element of a wire request.
    ///
    /// A malformed element (missing `path`, unknown `type`) fails with
    /// `BadRequest` for that position only.
    pub fn decode(raw: Value) -> RpcResult<Self> {
        serde_json::from_value(raw).map_err(|e| {
            trace!(error = %e, "Malformed call");
            RpcError::bad_request(format!("Malformed call: {}", e))
        })
    }
}

/// Ordered calls of one wire request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchRequest {
    /// The calls, in caller order.
    pub calls: Vec<Call>,
}

impl BatchRequest {
    /// Create a new empty batch request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a call.
    #[must_use = "This method returns a new BatchRequest and does not modify self"]
    pub fn add(mut self, call: Call) -> Self {
        trace!(path = %call.path, kind = %call.kind, "Adding call to batch");
        self.calls.push(call);
        self
    }

    /// Append a query call.
    #[must_use = "This method returns a new BatchRequest and does not modify self"]
    pub fn query(self, path: impl Into<String>, input: Value) -> Self {
        self.add(Call::query(path, input))
    }

    /// Append a mutation call.
    #[must_use = "This method returns a new BatchRequest and does not modify self"]
    pub fn mutation(self, path: impl Into<String>, input: Value) -> Self {
        self.add(Call::mutation(path, input))
    }

    /// Get the number of calls in the batch.
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// Check if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Validate the batch against configuration limits.
    ///
    /// An empty batch is valid and yields an empty response.
    pub fn validate(&self, config: &BatchConfig) -> RpcResult<()> {
        config.check_size(self.calls.len())
    }
}

impl From<Vec<Call>> for BatchRequest {
    fn from(calls: Vec<Call>) -> Self {
        Self { calls }
    }
}

// =============================================================================
// Envelopes
// =============================================================================

/// Wire result of one call.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// `{"ok": true, "data": ...}`
    Success(Value),
    /// `{"ok": false, "error": {...}}`
    Failure(RpcError),
}

impl Envelope {
    /// Check if this envelope is successful.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Get the data if successful.
    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Success(data) => Some(data),
            Self::Failure(_) => None,
        }
    }

    /// Get the error if failed.
    pub fn error(&self) -> Option<&RpcError> {
        match self {
            Self::Success(_) => None,
            Self::Failure(error) => Some(error),
        }
    }

    /// Convert into a result for the waiting caller.
    pub fn into_result(self) -> RpcResult<Value> {
        match self {
            Self::Success(data) => Ok(data),
            Self::Failure(error) => Err(error),
        }
    }
}

impl From<RpcResult<Value>> for Envelope {
    fn from(result: RpcResult<Value>) -> Self {
        match result {
            Ok(data) => Self::Success(data),
            Err(error) => Self::Failure(error),
        }
    }
}

impl Serialize for Envelope {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Envelope", 2)?;
        match self {
            Self::Success(data) => {
                state.serialize_field("ok", &true)?;
                state.serialize_field("data", data)?;
            }
            Self::Failure(error) => {
                state.serialize_field("ok", &false)?;
                state.serialize_field("error", error)?;
            }
        }
        state.end()
    }
}

#[derive(Deserialize)]
struct RawEnvelope {
    ok: bool,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    error: Option<RpcError>,
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawEnvelope::deserialize(deserializer)?;
        match (raw.ok, raw.error) {
            (true, _) => Ok(Self::Success(raw.data)),
            (false, Some(error)) => Ok(Self::Failure(error)),
            (false, None) => Err(serde::de::Error::missing_field("error")),
        }
    }
}

/// Envelopes of one wire request, index-aligned with its calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchResponse {
    /// Envelopes, in request order.
    pub envelopes: Vec<Envelope>,
}

impl BatchResponse {
    /// Create a new batch response with the given envelopes.
    pub fn new(envelopes: Vec<Envelope>) -> Self {
        Self { envelopes }
    }

    /// Get the number of envelopes.
    pub fn len(&self) -> usize {
        self.envelopes.len()
    }

    /// Check if the response is empty.
    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }

    /// Count successful envelopes.
    pub fn success_count(&self) -> usize {
        self.envelopes.iter().filter(|e| e.is_ok()).count()
    }

    /// Count error envelopes.
    pub fn error_count(&self) -> usize {
        self.len() - self.success_count()
    }

    /// Check if all envelopes are successful.
    pub fn all_success(&self) -> bool {
        self.envelopes.iter().all(Envelope::is_ok)
    }

    /// Envelope at `index`.
    pub fn get(&self, index: usize) -> Option<&Envelope> {
        self.envelopes.get(index)
    }
}

impl IntoIterator for BatchResponse {
    type Item = Envelope;
    type IntoIter = std::vec::IntoIter<Envelope>;

    fn into_iter(self) -> Self::IntoIter {
        self.envelopes.into_iter()
    }
}

// =============================================================================
// Batch Metrics
// =============================================================================

/// Metrics collected during batch execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchMetrics {
    /// Id under which the request was logged and its context created
    pub request_id: RequestId,
    /// Total number of calls in the batch
    pub total_requests: usize,
    /// Number of successful calls
    pub success_count: usize,
    /// Number of failed calls
    pub error_count: usize,
    /// Total execution duration in milliseconds
    pub duration_ms: u64,
}

impl BatchMetrics {
    /// Empty metrics for the wire request `request_id`.
    pub fn new(request_id: RequestId, total_requests: usize) -> Self {
        Self {
            request_id,
            total_requests,
            success_count: 0,
            error_count: 0,
            duration_ms: 0,
        }
    }

    /// Tally a finished response.
    pub fn record(&mut self, response: &BatchResponse) {
        self.success_count = response.success_count();
        self.error_count = response.error_count();
    }
}

// =============================================================================
// Tests
// =============================================================================
