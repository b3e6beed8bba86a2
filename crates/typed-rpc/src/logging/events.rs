//! Logging functions for dispatch events.

use super::types::{LogLevel, RequestId};
use crate::RpcError;
use serde_json::Value;

// =============================================================================
// Call Logging
// =============================================================================

/// Log one completed call at the configured level.
///
/// Failures that surface as `InternalError` are always logged at Warn,
/// with the hidden cause, since the caller never sees it.
pub fn log_call(
    level: LogLevel,
    request_id: &RequestId,
    path: &str,
    duration_us: u64,
    input: Option<&Value>,
    outcome: Result<(), &RpcError>,
) {
    let request_id = request_id.short();
    if let Err(error) = outcome
        && !error.is_domain_error()
    {
        tracing::warn!(
            request_id = %request_id,
            path = %path,
            duration_us = %duration_us,
            error_code = %error.code,
            cause = ?error.cause,
            "Call failed"
        );
        return;
    }

    let success = outcome.is_ok();
    let error_code = outcome.err().map(|e| e.code.as_str()).unwrap_or("");
    macro_rules! emit {
        ($lvl:ident) => {
            tracing::$lvl!(
                request_id = %request_id,
                path = %path,
                duration_us = %duration_us,
                success = %success,
                error_code = %error_code,
                input = ?input,
                "Call completed"
            )
        };
    }
    match level {
        LogLevel::Trace => emit!(trace),
        LogLevel::Debug => emit!(debug),
        LogLevel::Info => emit!(info),
        LogLevel::Warn => emit!(warn),
        LogLevel::Error => emit!(error),
        LogLevel::Off => {}
    }
}

/// Log a handler panic. Logged at Error level.
pub fn log_call_panicked(request_id: &RequestId, path: &str, message: &str) {
    tracing::error!(
        request_id = %request_id.short(),
        path = %path,
        panic = %message,
        "Handler panicked"
    );
}

/// Log a wire element that could not be decoded as a call.
pub fn log_malformed_call(request_id: &RequestId, error: &RpcError) {
    tracing::warn!(
        request_id = %request_id.short(),
        error_message = %error.message,
        "Malformed call"
    );
}

// =============================================================================
// Batch Request Logging
// =============================================================================

/// Log a batch request.
///
/// Records batch size, success/error counts, and total duration.
pub fn log_batch_request(
    request_id: &str,
    batch_size: usize,
    success_count: usize,
    error_count: usize,
    duration_ms: u64,
) {
    tracing::info!(
        request_id = %request_id,
        batch_size = %batch_size,
        success_count = %success_count,
        error_count = %error_count,
        duration_ms = %duration_ms,
        "Batch request completed"
    );
}

/// Log a batch that exceeded the slow threshold.
pub fn log_slow_batch(request_id: &str, batch_size: usize, duration_ms: u64, threshold_ms: u64) {
    tracing::warn!(
        request_id = %request_id,
        batch_size = %batch_size,
        duration_ms = %duration_ms,
        threshold_ms = %threshold_ms,
        "Slow batch request"
    );
}

/// Log a batch rejected before any call ran.
pub fn log_batch_rejected(request_id: &str, batch_size: usize, error: &RpcError) {
    tracing::warn!(
        request_id = %request_id,
        batch_size = %batch_size,
        error_code = %error.code,
        error_message = %error.message,
        "Batch request rejected"
    );
}

/// Log a context factory failure or timeout.
pub fn log_context_failure(request_id: &str, batch_size: usize, error: &RpcError) {
    tracing::error!(
        request_id = %request_id,
        batch_size = %batch_size,
        error_message = %error.message,
        cause = ?error.cause,
        "Context creation failed"
    );
}
