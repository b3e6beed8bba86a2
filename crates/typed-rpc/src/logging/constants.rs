//! Logging defaults.

/// Characters of the request id kept in log lines.
pub const SHORT_ID_LENGTH: usize = 8;

/// Batches slower than this are logged as slow.
pub const DEFAULT_SLOW_THRESHOLD_MS: u64 = 1000;

/// Written in place of a redacted value.
pub const DEFAULT_REDACTION_REPLACEMENT: &str = "[REDACTED]";

/// Field names redacted from logged inputs.
///
/// Matched case-insensitively as substrings of the key, so `password`
/// also hides `newPassword` and `passwordDigest`.
pub const DEFAULT_SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "secret",
    "token",
    "apikey",
    "api_key",
    "authorization",
    "credential",
    "private_key",
    "privatekey",
    "digest",
];
