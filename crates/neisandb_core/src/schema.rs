//! Document schema validation.
//!
//! A [`Schema`] describes the fields a collection accepts: their types,
//! whether they are required, defaults, and simple range/length
//! constraints. Validation returns per-field messages so callers can
//! surface them next to the offending input.

use crate::document::Document;
use crate::error::FieldErrors;
use neisandb_codec::Value;
use std::collections::BTreeMap;

/// Expected type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Boolean.
    Bool,
    /// Signed integer.
    Integer,
    /// UTF-8 text.
    Text,
    /// Byte string.
    Bytes,
    /// Array of values.
    Array,
    /// Nested document.
    Map,
    /// Any value.
    Any,
}

impl FieldType {
    fn matches(self, value: &Value) -> bool {
        match self {
            FieldType::Bool => matches!(value, Value::Bool(_)),
            FieldType::Integer => matches!(value, Value::Integer(_)),
            FieldType::Text => matches!(value, Value::Text(_)),
            FieldType::Bytes => matches!(value, Value::Bytes(_)),
            FieldType::Array => matches!(value, Value::Array(_)),
            FieldType::Map => matches!(value, Value::Map(_)),
            FieldType::Any => true,
        }
    }

    fn name(self) -> &'static str {
        match self {
            FieldType::Bool => "bool",
            FieldType::Integer => "integer",
            FieldType::Text => "text",
            FieldType::Bytes => "bytes",
            FieldType::Array => "array",
            FieldType::Map => "map",
            FieldType::Any => "any",
        }
    }
}

/// Specification of a single field.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    ty: FieldType,
    required: bool,
    default: Option<Value>,
    min: Option<i64>,
    max: Option<i64>,
    min_len: Option<usize>,
    max_len: Option<usize>,
}

impl FieldSpec {
    /// A field of the given type, optional by default.
    #[must_use]
    pub fn of(ty: FieldType) -> Self {
        Self {
            ty,
            required: false,
            default: None,
            min: None,
            max: None,
            min_len: None,
            max_len: None,
        }
    }

    /// Shorthand for a text field.
    #[must_use]
    pub fn text() -> Self {
        Self::of(FieldType::Text)
    }

    /// Shorthand for an integer field.
    #[must_use]
    pub fn integer() -> Self {
        Self::of(FieldType::Integer)
    }

    /// Shorthand for a boolean field.
    #[must_use]
    pub fn boolean() -> Self {
        Self::of(FieldType::Bool)
    }

    /// Marks the field required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Supplies a default applied when the field is absent.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Minimum integer value (inclusive).
    #[must_use]
    pub const fn min(mut self, min: i64) -> Self {
        self.min = Some(min);
        self
    }

    /// Maximum integer value (inclusive).
    #[must_use]
    pub const fn max(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }

    /// Minimum length for text, bytes, or arrays.
    #[must_use]
    pub const fn min_len(mut self, min_len: usize) -> Self {
        self.min_len = Some(min_len);
        self
    }

    /// Maximum length for text, bytes, or arrays.
    #[must_use]
    pub const fn max_len(mut self, max_len: usize) -> Self {
        self.max_len = Some(max_len);
        self
    }

    /// Checks a value against this spec.
    fn check(&self, value: &Value) -> Result<(), String> {
        if !self.ty.matches(value) {
            return Err(format!(
                "expected {}, got {}",
                self.ty.name(),
                value.type_name()
            ));
        }

        if let Value::Integer(n) = value {
            if let Some(min) = self.min {
                if *n < min {
                    return Err(format!("must be >= {min}"));
                }
            }
            if let Some(max) = self.max {
                if *n > max {
                    return Err(format!("must be <= {max}"));
                }
            }
        }

        let len = match value {
            Value::Text(s) => Some(s.chars().count()),
            Value::Bytes(b) => Some(b.len()),
            Value::Array(a) => Some(a.len()),
            _ => None,
        };
        if let Some(len) = len {
            if let Some(min_len) = self.min_len {
                if len < min_len {
                    return Err(format!("length must be >= {min_len}"));
                }
            }
            if let Some(max_len) = self.max_len {
                if len > max_len {
                    return Err(format!("length must be <= {max_len}"));
                }
            }
        }

        Ok(())
    }
}

/// A collection's document schema.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: BTreeMap<String, FieldSpec>,
    deny_unknown: bool,
}

impl Schema {
    /// Creates an empty schema accepting unknown fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field specification.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(name.into(), spec);
        self
    }

    /// Rejects documents carrying fields the schema does not declare.
    #[must_use]
    pub const fn deny_unknown_fields(mut self) -> Self {
        self.deny_unknown = true;
        self
    }

    /// Validates a document.
    ///
    /// On success returns the parsed document with defaults applied for
    /// absent optional fields. On failure returns a map from field name
    /// to a human-readable message.
    pub fn validate(&self, doc: &Document) -> Result<Document, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut parsed = doc.clone();

        for (name, spec) in &self.fields {
            match doc.get(name) {
                Some(value) => {
                    if let Err(message) = spec.check(value) {
                        errors.insert(name.clone(), message);
                    }
                }
                None => {
                    if let Some(default) = &spec.default {
                        parsed.set(name.clone(), default.clone());
                    } else if spec.required {
                        errors.insert(name.clone(), "is required".to_string());
                    }
                }
            }
        }

        if self.deny_unknown {
            for (name, _) in doc.iter() {
                if !self.fields.contains_key(name) {
                    errors.insert(name.clone(), "unknown field".to_string());
                }
            }
        }

        if errors.is_empty() {
            Ok(parsed)
        } else {
            Err(errors)
        }
    }

    /// Validates a single field value, as the model layer does on
    /// property sets.
    pub fn validate_field(&self, name: &str, value: &Value) -> Result<(), String> {
        match self.fields.get(name) {
            Some(spec) => spec.check(value),
            None if self.deny_unknown => Err("unknown field".to_string()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_schema() -> Schema {
        Schema::new()
            .field("email", FieldSpec::text().required())
            .field("password", FieldSpec::text().required().min_len(8))
            .field("attempts", FieldSpec::integer().min(0).default_value(0i64))
    }

    #[test]
    fn accepts_valid_document_and_applies_defaults() {
        let doc = Document::new()
            .with("email", "a@x.com")
            .with("password", "Passw0rd!");

        let parsed = user_schema().validate(&doc).unwrap();
        assert_eq!(parsed.get("attempts").unwrap().as_integer(), Some(0));
        assert_eq!(parsed.get("email").unwrap().as_text(), Some("a@x.com"));
    }

    #[test]
    fn missing_required_field() {
        let doc = Document::new().with("email", "a@x.com");
        let errors = user_schema().validate(&doc).unwrap_err();
        assert_eq!(errors.get("password").unwrap(), "is required");
    }

    #[test]
    fn type_mismatch() {
        let doc = Document::new()
            .with("email", 42i64)
            .with("password", "Passw0rd!");
        let errors = user_schema().validate(&doc).unwrap_err();
        assert!(errors.get("email").unwrap().contains("expected text"));
    }

    #[test]
    fn integer_range() {
        let doc = Document::new()
            .with("email", "a@x.com")
            .with("password", "Passw0rd!")
            .with("attempts", -1i64);
        let errors = user_schema().validate(&doc).unwrap_err();
        assert_eq!(errors.get("attempts").unwrap(), "must be >= 0");
    }

    #[test]
    fn length_constraints() {
        let doc = Document::new()
            .with("email", "a@x.com")
            .with("password", "short");
        let errors = user_schema().validate(&doc).unwrap_err();
        assert_eq!(errors.get("password").unwrap(), "length must be >= 8");
    }

    #[test]
    fn unknown_fields_pass_unless_denied() {
        let doc = Document::new()
            .with("email", "a@x.com")
            .with("password", "Passw0rd!")
            .with("extra", true);

        assert!(user_schema().validate(&doc).is_ok());

        let strict = user_schema().deny_unknown_fields();
        let errors = strict.validate(&doc).unwrap_err();
        assert_eq!(errors.get("extra").unwrap(), "unknown field");
    }

    #[test]
    fn validate_single_field() {
        let schema = user_schema();
        assert!(schema.validate_field("attempts", &Value::Integer(3)).is_ok());
        assert!(schema
            .validate_field("attempts", &Value::Integer(-2))
            .is_err());
        assert!(schema.validate_field("unlisted", &Value::Null).is_ok());
    }

    #[test]
    fn multiple_errors_reported_together() {
        let doc = Document::new().with("attempts", -5i64);
        let errors = user_schema().validate(&doc).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
