//! Startup and shutdown logging functions.

/// Log a procedure registration. Logged at Trace level.
pub fn log_procedure_registered(path: &str, procedure_type: &str) {
    tracing::trace!(
        path = %path,
        procedure_type = %procedure_type,
        "Procedure registered"
    );
}

/// Log a finished router build. Logged at Debug level.
///
/// ```rust,ignore
/// log_router_built(9, "3f2a91c0");
/// ```
pub fn log_router_built(procedure_count: usize, fingerprint: &str) {
    tracing::debug!(
        procedure_count = %procedure_count,
        fingerprint = %fingerprint,
        "Router built"
    );
}

/// Log the HTTP server binding. Logged at Info level.
pub fn log_server_listening(addr: &str) {
    tracing::info!(addr = %addr, "RPC server listening");
}

/// Log the HTTP server stopping. Logged at Info level.
pub fn log_server_shutdown() {
    tracing::info!("RPC server shutting down");
}
