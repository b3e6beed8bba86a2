use std::collections::HashSet;

use crate::logging::{
    DEFAULT_REDACTION_REPLACEMENT, LogConfig, LogLevel, RedactionEngine, RequestId,
};

use proptest::prelude::*;
use serde_json::json;

#[test]
fn test_request_id_uniqueness() {
    let ids: Vec<RequestId> = (0..100).map(|_| RequestId::new()).collect();
    let unique: HashSet<_> = ids.iter().map(|id| id.to_string()).collect();
    assert_eq!(ids.len(), unique.len());
}

#[test]
fn test_request_id_short() {
    let id: RequestId = "12345678-1234-4567-89ab-123456789abc".parse().unwrap();
    assert_eq!(id.short(), "12345678");
    assert_eq!(id.to_string(), "12345678-1234-4567-89ab-123456789abc");
}

#[test]
fn test_log_level_should_log() {
    assert!(LogLevel::Info.should_log(LogLevel::Error));
    assert!(LogLevel::Info.should_log(LogLevel::Info));
    assert!(!LogLevel::Info.should_log(LogLevel::Debug));
    assert!(!LogLevel::Off.should_log(LogLevel::Error));
    assert!(LogLevel::Trace.should_log(LogLevel::Error));
}

#[test]
fn test_log_level_parsing() {
    assert_eq!("WARN".parse::<LogLevel>(), Ok(LogLevel::Warn));
    assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
    assert_eq!("off".parse::<LogLevel>(), Ok(LogLevel::Off));
    assert!("loud".parse::<LogLevel>().is_err());
    assert_eq!(LogLevel::Debug.to_string(), "debug");
    assert_eq!(LogLevel::Off.to_tracing_level(), None);
}

#[test]
fn test_redacts_nested_sensitive_fields() {
    let engine = RedactionEngine::default();
    let input = json!({
        "email": "a@b.com",
        "password": "secret1",
        "profile": {"apiKey": "k", "bloodType": "O+"},
        "history": [{"newPassword": "x"}, {"note": "fine"}]
    });

    let redacted = engine.redact(&input);

    assert_eq!(redacted["email"], "a@b.com");
    assert_eq!(redacted["password"], DEFAULT_REDACTION_REPLACEMENT);
    assert_eq!(redacted["profile"]["apiKey"], DEFAULT_REDACTION_REPLACEMENT);
    assert_eq!(redacted["profile"]["bloodType"], "O+");
    assert_eq!(redacted["history"][0]["newPassword"], DEFAULT_REDACTION_REPLACEMENT);
    assert_eq!(redacted["history"][1]["note"], "fine");
}

#[test]
fn test_custom_redaction() {
    let config = LogConfig::new()
        .clear_redacted_fields()
        .redact_field("bloodType")
        .with_redaction_replacement("***");
    let engine = RedactionEngine::new(&config);

    let redacted = engine.redact(&json!({"password": "p", "bloodType": "AB-"}));
    assert_eq!(redacted, json!({"password": "p", "bloodType": "***"}));
}

#[test]
fn test_slow_threshold() {
    let config = LogConfig::new().with_slow_batch_threshold(100);
    assert!(config.is_slow(101));
    assert!(!config.is_slow(100));
    assert!(!config.without_slow_batch_logging().is_slow(10_000));
}

#[test]
fn test_excluded_paths() {
    let config = LogConfig::new().exclude_path("health");
    assert!(!config.should_log_path("health"));
    assert!(config.should_log_path("user.list"));
}

proptest! {
    /// Property 10: Redaction leaves values without sensitive keys untouched
    #[test]
    fn prop_redaction_preserves_safe_values(
        entries in proptest::collection::btree_map("[a-z]{1,6}", any::<i32>(), 0..8)
    ) {
        let engine = RedactionEngine::default();
        let value = serde_json::to_value(&entries).unwrap();
        let sensitive = entries.keys().any(|key| {
            LogConfig::default()
                .redacted_fields
                .iter()
                .any(|field| key.contains(&field.to_lowercase()))
        });
        prop_assume!(!sensitive);

        prop_assert_eq!(engine.redact(&value), value);
    }
}
