//! Masking of sensitive fields in logged call inputs.
//!
//! Keys are compared after folding case and dropping `_` and `-`, so one
//! configured name covers `api_key`, `apiKey` and `API-KEY`. A key matches
//! when its folded form contains a configured name.

use super::config::LogConfig;
use serde_json::Value;

/// Masks sensitive object members anywhere inside a JSON value.
#[derive(Debug, Clone)]
pub struct RedactionEngine {
    needles: Vec<String>,
    replacement: Value,
}

impl RedactionEngine {
    /// Build an engine from the configured field names and replacement.
    pub fn new(config: &LogConfig) -> Self {
        let mut needles: Vec<String> = config
            .redacted_fields
            .iter()
            .map(|field| fold_key(field))
            .filter(|needle| !needle.is_empty())
            .collect();
        needles.sort();
        needles.dedup();

        Self {
            needles,
            replacement: Value::String(config.redaction_replacement.clone()),
        }
    }

    /// Copy of `value` with every sensitive member replaced.
    pub fn redact(&self, value: &Value) -> Value {
        self.redact_owned(value.clone())
    }

    /// Mask `value` in place and hand it back.
    pub fn redact_owned(&self, mut value: Value) -> Value {
        self.mask(&mut value);
        value
    }

    /// Whether a member named `key` is masked.
    pub fn is_sensitive(&self, key: &str) -> bool {
        let folded = fold_key(key);
        self.needles.iter().any(|needle| folded.contains(needle.as_str()))
    }

    fn mask(&self, value: &mut Value) {
        match value {
            Value::Object(map) => {
                for (key, member) in map.iter_mut() {
                    if self.is_sensitive(key) {
                        *member = self.replacement.clone();
                    } else {
                        self.mask(member);
                    }
                }
            }
            Value::Array(items) => items.iter_mut().for_each(|item| self.mask(item)),
            _ => {}
        }
    }
}

impl Default for RedactionEngine {
    fn default() -> Self {
        Self::new(&LogConfig::default())
    }
}

fn fold_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_separator_and_case_insensitive() {
        let engine = RedactionEngine::default();
        assert!(engine.is_sensitive("api_key"));
        assert!(engine.is_sensitive("apiKey"));
        assert!(engine.is_sensitive("X-API-KEY"));
        assert!(engine.is_sensitive("passwordDigest"));
        assert!(!engine.is_sensitive("email"));
    }

    #[test]
    fn test_sensitive_container_masked_whole() {
        let engine = RedactionEngine::default();
        let out = engine.redact(&json!({"credentials": {"user": "a", "pin": 1}, "id": 3}));
        assert_eq!(out["credentials"], crate::logging::DEFAULT_REDACTION_REPLACEMENT);
        assert_eq!(out["id"], 3);
    }

    #[test]
    fn test_empty_names_ignored() {
        let config = LogConfig::new().clear_redacted_fields().redact_field("_");
        let engine = RedactionEngine::new(&config);
        let value = json!({"a_b": 1});
        assert_eq!(engine.redact(&value), value);
    }
}
