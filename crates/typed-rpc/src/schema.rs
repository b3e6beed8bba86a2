//! Declarative input schemas
//!
//! A [`Schema`] describes the shape a procedure accepts and turns an untyped
//! JSON value into a normalized one, or into the full list of field-level
//! violations. Schemas are immutable after construction and carry no state,
//! so one instance serves every concurrent call.
//!
//! # Example
//!
//! ```rust,ignore
//! use typed_rpc::schema::Schema;
//!
//! let create_user = Schema::object()
//!     .field("email", Schema::string().email())
//!     .field("nickname", Schema::string().min_length(2).max_length(32))
//!     .field("password", Schema::string().min_length(6))
//!     .field("referrer", Schema::string().optional());
//!
//! let typed = create_user.validate(&json!({
//!     "email": "a@b.com", "nickname": "Al", "password": "secret1", "extra": 1
//! }))?;
//! assert!(typed.get("extra").is_none()); // unknown fields are dropped
//! ```
//!
//! # Semantics
//!
//! - Violations are collected for every field; validation never stops early.
//! - Unknown object fields are dropped unless the object is [`Schema::strict`].
//! - `null` for an optional field is treated as absent.
//! - Validating a previously validated value returns it unchanged.

use crate::validation::FieldIssue;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$").ok());

// =============================================================================
// Schema
// =============================================================================

/// Declarative description of an accepted input value.
#[derive(Debug, Clone)]
pub struct Schema {
    kind: SchemaKind,
    optional: bool,
    nullable: bool,
    description: Option<String>,
}

#[derive(Debug, Clone)]
enum SchemaKind {
    Any,
    NoInput,
    Boolean,
    String(StringRules),
    Number(NumberRules),
    Enum(Vec<String>),
    Array(Box<Schema>),
    Object(ObjectRules),
}

#[derive(Debug, Clone, Default)]
struct StringRules {
    min_length: Option<usize>,
    max_length: Option<usize>,
    email: bool,
    pattern: Option<Regex>,
}

#[derive(Debug, Clone, Default)]
struct NumberRules {
    integer: bool,
    // (bound, exclusive)
    minimum: Option<(f64, bool)>,
    maximum: Option<f64>,
}

#[derive(Debug, Clone, Default)]
struct ObjectRules {
    fields: Vec<(String, Schema)>,
    strict: bool,
}

impl Schema {
    fn of(kind: SchemaKind) -> Self {
        Self {
            kind,
            optional: false,
            nullable: false,
            description: None,
        }
    }

    /// Accepts any JSON value unchanged.
    pub fn any() -> Self {
        Self::of(SchemaKind::Any)
    }

    /// For procedures without input: accepts `null` or an object, yields `null`.
    pub fn no_input() -> Self {
        Self::of(SchemaKind::NoInput)
    }

    /// A boolean.
    pub fn boolean() -> Self {
        Self::of(SchemaKind::Boolean)
    }

    /// A string.
    pub fn string() -> Self {
        Self::of(SchemaKind::String(StringRules::default()))
    }

    /// Any JSON number.
    pub fn number() -> Self {
        Self::of(SchemaKind::Number(NumberRules::default()))
    }

    /// A number without fractional part.
    pub fn integer() -> Self {
        Self::of(SchemaKind::Number(NumberRules {
            integer: true,
            ..NumberRules::default()
        }))
    }

    /// A string drawn from a fixed set.
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::of(SchemaKind::Enum(values.into_iter().map(Into::into).collect()))
    }

    /// An array whose items all satisfy `items`.
    pub fn array(items: Schema) -> Self {
        Self::of(SchemaKind::Array(Box::new(items)))
    }

    /// An object with no declared fields yet; add them with [`Schema::field`].
    pub fn object() -> Self {
        Self::of(SchemaKind::Object(ObjectRules::default()))
    }

    /// Declare an object field. Fields are checked in declaration order.
    ///
    /// Has no effect on non-object schemas.
    #[must_use = "This method returns a new Schema and does not modify self"]
    pub fn field(mut self, name: impl Into<String>, schema: Schema) -> Self {
        if let SchemaKind::Object(rules) = &mut self.kind {
            rules.fields.push((name.into(), schema));
        }
        self
    }

    /// Reject undeclared object fields instead of dropping them.
    #[must_use = "This method returns a new Schema and does not modify self"]
    pub fn strict(mut self) -> Self {
        if let SchemaKind::Object(rules) = &mut self.kind {
            rules.strict = true;
        }
        self
    }

    /// The value may be absent (or `null`) when used as an object field.
    #[must_use = "This method returns a new Schema and does not modify self"]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// `null` is an accepted value and is kept in the output.
    #[must_use = "This method returns a new Schema and does not modify self"]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Human-readable description carried into the contract.
    #[must_use = "This method returns a new Schema and does not modify self"]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Minimum string length in characters.
    #[must_use = "This method returns a new Schema and does not modify self"]
    pub fn min_length(mut self, min: usize) -> Self {
        if let SchemaKind::String(rules) = &mut self.kind {
            rules.min_length = Some(min);
        }
        self
    }

    /// Maximum string length in characters.
    #[must_use = "This method returns a new Schema and does not modify self"]
    pub fn max_length(mut self, max: usize) -> Self {
        if let SchemaKind::String(rules) = &mut self.kind {
            rules.max_length = Some(max);
        }
        self
    }

    /// String must look like an email address.
    #[must_use = "This method returns a new Schema and does not modify self"]
    pub fn email(mut self) -> Self {
        if let SchemaKind::String(rules) = &mut self.kind {
            rules.email = true;
        }
        self
    }

    /// String must match `pattern`.
    #[must_use = "This method returns a new Schema and does not modify self"]
    pub fn pattern(mut self, pattern: Regex) -> Self {
        if let SchemaKind::String(rules) = &mut self.kind {
            rules.pattern = Some(pattern);
        }
        self
    }

    /// Number must be strictly greater than zero.
    #[must_use = "This method returns a new Schema and does not modify self"]
    pub fn positive(mut self) -> Self {
        if let SchemaKind::Number(rules) = &mut self.kind {
            rules.minimum = Some((0.0, true));
        }
        self
    }

    /// Number must be an integer.
    #[must_use = "This method returns a new Schema and does not modify self"]
    pub fn int(mut self) -> Self {
        if let SchemaKind::Number(rules) = &mut self.kind {
            rules.integer = true;
        }
        self
    }

    /// Inclusive lower bound.
    #[must_use = "This method returns a new Schema and does not modify self"]
    pub fn min(mut self, min: f64) -> Self {
        if let SchemaKind::Number(rules) = &mut self.kind {
            rules.minimum = Some((min, false));
        }
        self
    }

    /// Inclusive upper bound.
    #[must_use = "This method returns a new Schema and does not modify self"]
    pub fn max(mut self, max: f64) -> Self {
        if let SchemaKind::Number(rules) = &mut self.kind {
            rules.maximum = Some(max);
        }
        self
    }

    /// Whether an object field using this schema may be omitted.
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Validate `input`, returning the normalized value or every violation.
    pub fn validate(&self, input: &Value) -> Result<Value, Vec<FieldIssue>> {
        let mut issues = Vec::new();
        let output = self.check(input, "", &mut issues);
        if issues.is_empty() {
            Ok(output)
        } else {
            Err(issues)
        }
    }

    fn check(&self, value: &Value, path: &str, issues: &mut Vec<FieldIssue>) -> Value {
        if value.is_null() {
            let accepts_null = self.nullable
                || self.optional
                || matches!(self.kind, SchemaKind::Any | SchemaKind::NoInput);
            if !accepts_null {
                issues.push(FieldIssue::required(path));
            }
            return Value::Null;
        }

        match &self.kind {
            SchemaKind::Any => value.clone(),
            SchemaKind::NoInput => {
                if !value.is_object() {
                    issues.push(FieldIssue::invalid_type(path, "null", type_name(value)));
                }
                Value::Null
            }
            SchemaKind::Boolean => {
                if !value.is_boolean() {
                    issues.push(FieldIssue::invalid_type(path, "boolean", type_name(value)));
                }
                value.clone()
            }
            SchemaKind::String(rules) => rules.check(value, path, issues),
            SchemaKind::Number(rules) => rules.check(value, path, issues),
            SchemaKind::Enum(allowed) => {
                match value.as_str() {
                    Some(s) if allowed.iter().any(|a| a == s) => {}
                    Some(_) => issues.push(FieldIssue::invalid_enum(path, allowed)),
                    None => issues.push(FieldIssue::invalid_type(path, "string", type_name(value))),
                }
                value.clone()
            }
            SchemaKind::Array(items) => {
                let Some(elements) = value.as_array() else {
                    issues.push(FieldIssue::invalid_type(path, "array", type_name(value)));
                    return value.clone();
                };
                let checked = elements
                    .iter()
                    .enumerate()
                    .map(|(i, element)| items.check(element, &format!("{}[{}]", path, i), issues))
                    .collect();
                Value::Array(checked)
            }
            SchemaKind::Object(rules) => rules.check(value, path, issues),
        }
    }

    /// JSON-Schema-like description used in the router contract.
    pub fn type_schema(&self) -> TypeSchema {
        let mut schema = match &self.kind {
            SchemaKind::Any => TypeSchema::named("any"),
            SchemaKind::NoInput => TypeSchema::named("null"),
            SchemaKind::Boolean => TypeSchema::named("boolean"),
            SchemaKind::String(rules) => TypeSchema {
                min_length: rules.min_length,
                max_length: rules.max_length,
                format: rules.email.then(|| "email".to_string()),
                pattern: rules.pattern.as_ref().map(|re| re.as_str().to_string()),
                ..TypeSchema::named("string")
            },
            SchemaKind::Number(rules) => {
                let name = if rules.integer { "integer" } else { "number" };
                let (minimum, exclusive_minimum) = match rules.minimum {
                    Some((bound, true)) => (None, Some(bound)),
                    Some((bound, false)) => (Some(bound), None),
                    None => (None, None),
                };
                TypeSchema {
                    minimum,
                    exclusive_minimum,
                    maximum: rules.maximum,
                    ..TypeSchema::named(name)
                }
            }
            SchemaKind::Enum(values) => TypeSchema {
                enum_values: Some(values.clone()),
                ..TypeSchema::named("string")
            },
            SchemaKind::Array(items) => TypeSchema {
                items: Some(Box::new(items.type_schema())),
                ..TypeSchema::named("array")
            },
            SchemaKind::Object(rules) => TypeSchema {
                properties: Some(
                    rules
                        .fields
                        .iter()
                        .map(|(name, field)| (name.clone(), field.type_schema()))
                        .collect(),
                ),
                required: rules
                    .fields
                    .iter()
                    .filter(|(_, field)| !field.optional)
                    .map(|(name, _)| name.clone())
                    .collect(),
                additional_properties: rules.strict.then_some(false),
                ..TypeSchema::named("object")
            },
        };
        schema.description = self.description.clone();
        schema.nullable = self.nullable;
        schema
    }
}

impl StringRules {
    fn check(&self, value: &Value, path: &str, issues: &mut Vec<FieldIssue>) -> Value {
        let Some(s) = value.as_str() else {
            issues.push(FieldIssue::invalid_type(path, "string", type_name(value)));
            return value.clone();
        };

        let len = s.chars().count();
        if let Some(min) = self.min_length
            && len < min
        {
            issues.push(FieldIssue::min_length(path, min));
        }
        if let Some(max) = self.max_length
            && len > max
        {
            issues.push(FieldIssue::max_length(path, max));
        }
        if self.email && !is_email(s) {
            issues.push(FieldIssue::email(path));
        }
        if let Some(pattern) = &self.pattern
            && !pattern.is_match(s)
        {
            issues.push(FieldIssue::pattern(path, pattern.as_str()));
        }
        value.clone()
    }
}

impl NumberRules {
    fn check(&self, value: &Value, path: &str, issues: &mut Vec<FieldIssue>) -> Value {
        let Some(number) = value.as_f64() else {
            issues.push(FieldIssue::invalid_type(path, "number", type_name(value)));
            return value.clone();
        };

        let whole = value.is_i64() || value.is_u64() || number.fract() == 0.0;
        if self.integer && !whole {
            issues.push(FieldIssue::not_integer(path));
        }
        match self.minimum {
            Some((bound, true)) if number <= bound => {
                issues.push(FieldIssue::too_small(path, bound, true));
            }
            Some((bound, false)) if number < bound => {
                issues.push(FieldIssue::too_small(path, bound, false));
            }
            _ => {}
        }
        if let Some(max) = self.maximum
            && number > max
        {
            issues.push(FieldIssue::too_big(path, max));
        }

        // 3.0 becomes 3 so integer-typed handlers can deserialize it
        if self.integer && whole && value.is_f64() && number.abs() < i64::MAX as f64 {
            return Value::from(number as i64);
        }
        value.clone()
    }
}

impl ObjectRules {
    fn check(&self, value: &Value, path: &str, issues: &mut Vec<FieldIssue>) -> Value {
        let Some(map) = value.as_object() else {
            issues.push(FieldIssue::invalid_type(path, "object", type_name(value)));
            return value.clone();
        };

        let mut output = Map::new();
        for (name, field) in &self.fields {
            let field_path = join(path, name);
            match map.get(name) {
                None if field.optional => {}
                Some(Value::Null) if field.optional && !field.nullable => {}
                None => issues.push(FieldIssue::required(&field_path)),
                Some(raw) => {
                    let checked = field.check(raw, &field_path, issues);
                    output.insert(name.clone(), checked);
                }
            }
        }

        if self.strict {
            for key in map.keys() {
                if !self.fields.iter().any(|(name, _)| name == key) {
                    issues.push(FieldIssue::unrecognized_key(&join(path, key)));
                }
            }
        }

        Value::Object(output)
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

fn is_email(s: &str) -> bool {
    EMAIL_RE.as_ref().is_some_and(|re| re.is_match(s))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Type Description
// =============================================================================

/// Serializable description of a schema, shaped after JSON Schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeSchema {
    /// Type name (e.g., "string", "integer", "object")
    #[serde(rename = "type")]
    pub type_name: String,
    /// For object types, the properties
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, TypeSchema>>,
    /// Required properties for object types
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// `Some(false)` when undeclared properties are rejected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<bool>,
    /// For array types, the item type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<TypeSchema>>,
    /// Description of the type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Enum values (for string enums)
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    /// Format hint (e.g., "email")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Inclusive minimum (for numbers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    /// Exclusive minimum (for numbers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<f64>,
    /// Inclusive maximum (for numbers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    /// Minimum length (for strings)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// Maximum length (for strings)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Pattern (for strings)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Whether the value can be null
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
}

impl TypeSchema {
    fn named(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            properties: None,
            required: Vec::new(),
            additional_properties: None,
            items: None,
            description: None,
            enum_values: None,
            format: None,
            minimum: None,
            exclusive_minimum: None,
            maximum: None,
            min_length: None,
            max_length: None,
            pattern: None,
            nullable: false,
        }
    }
}
