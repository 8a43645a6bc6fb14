//! Document payloads.

use crate::error::{CoreError, CoreResult};
use neisandb_codec::Value;
use std::collections::BTreeMap;

/// A schema-validated document: an ordered map of field names to values.
///
/// `Document` is what the engine stores, scans, and compares. The typed
/// [`Model`](crate::Model) layer sits above it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    fields: BTreeMap<String, Value>,
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, returning the document for chaining.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Sets a field.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Gets a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Removes a field, returning its previous value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Returns true if the field is present.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Converts the document into a codec map value.
    pub fn to_value(&self) -> Value {
        Value::map(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Builds a document from a codec value.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ModelDecode`] if the value is not a map.
    pub fn from_value(value: &Value) -> CoreResult<Self> {
        let pairs = value
            .as_map()
            .ok_or_else(|| CoreError::model_decode(format!("expected map, got {}", value.type_name())))?;
        let mut fields = BTreeMap::new();
        for (key, val) in pairs {
            fields.insert(key.clone(), val.clone());
        }
        Ok(Self { fields })
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
