//! Flat field-map documents as kept by the document store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A single stored field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    StringList(Vec<String>),
}

impl FieldValue {
    /// Ordering between values of compatible types; integers and floats compare numerically
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Bool(a), FieldValue::Bool(b)) => Some(a.cmp(b)),
            (FieldValue::Integer(a), FieldValue::Integer(b)) => Some(a.cmp(b)),
            (FieldValue::Float(a), FieldValue::Float(b)) => a.partial_cmp(b),
            (FieldValue::Integer(a), FieldValue::Float(b)) => (*a as f64).partial_cmp(b),
            (FieldValue::Float(a), FieldValue::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (FieldValue::String(a), FieldValue::String(b)) => Some(a.cmp(b)),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::StringList(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// A stored record: a generated string id and a flat map of named fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: BTreeMap<String, FieldValue>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Set a field; `None` values are stored as explicit nulls
    pub fn set(&mut self, field: &str, value: impl Into<FieldValue>) -> &mut Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field).filter(|value| !value.is_null())
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        match self.get(field) {
            Some(FieldValue::String(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn get_string(&self, field: &str) -> Option<String> {
        self.get_str(field).map(str::to_string)
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        match self.get(field) {
            Some(FieldValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        match self.get(field) {
            Some(FieldValue::Integer(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_i32(&self, field: &str) -> Option<i32> {
        self.get_i64(field).and_then(|value| i32::try_from(value).ok())
    }

    /// Floats, also accepting integers written by other clients
    pub fn get_f64(&self, field: &str) -> Option<f64> {
        match self.get(field) {
            Some(FieldValue::Float(value)) => Some(*value),
            Some(FieldValue::Integer(value)) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn get_timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
        match self.get(field) {
            Some(FieldValue::Timestamp(value)) => Some(*value),
            _ => None,
        }
    }

    /// String lists, an absent field reads as empty
    pub fn get_string_list(&self, field: &str) -> Vec<String> {
        match self.get(field) {
            Some(FieldValue::StringList(values)) => values.clone(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_stored_as_null() {
        let mut document = Document::new("doc-1");
        document.set("amountMl", None::<f64>);
        assert_eq!(document.fields.get("amountMl"), Some(&FieldValue::Null));
        assert_eq!(document.get_f64("amountMl"), None);
    }

    #[test]
    fn test_typed_getters() {
        let mut document = Document::new("doc-1");
        document
            .set("name", "Ada")
            .set("count", 3_i64)
            .set("weight", 3.5)
            .set("tags", vec!["a".to_string()]);

        assert_eq!(document.get_str("name"), Some("Ada"));
        assert_eq!(document.get_i32("count"), Some(3));
        assert_eq!(document.get_f64("count"), Some(3.0));
        assert_eq!(document.get_f64("weight"), Some(3.5));
        assert_eq!(document.get_str("weight"), None);
        assert_eq!(document.get_string_list("tags"), vec!["a".to_string()]);
        assert!(document.get_string_list("missing").is_empty());
    }

    #[test]
    fn test_compare_mixed_numbers() {
        assert_eq!(
            FieldValue::Integer(2).compare(&FieldValue::Float(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(FieldValue::String("a".into()).compare(&FieldValue::Integer(1)), None);
    }
}
