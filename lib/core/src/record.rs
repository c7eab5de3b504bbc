//! School records
//!
//! A record is one school: a `name` key plus a flat bag of attributes.
//! Only the eight declared attributes feed the feature model; everything
//! else (coordinates, addresses, ...) is carried through to results.

use crate::{Error, Result};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Numeric attributes, in the order their columns appear in the feature matrix.
pub const NUMERIC_ATTRIBUTES: [&str; 4] = ["rating", "tuition", "student_teacher_ratio", "test_scores"];

/// Categorical attributes, in the order their one-hot groups appear.
pub const CATEGORICAL_ATTRIBUTES: [&str; 4] = ["type", "curriculum", "focus", "facilities"];

/// One school row.
///
/// Serializes as a single flat JSON object: `{"name": "...", "rating": 4.2, ...}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchoolRecord {
    pub name: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl SchoolRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Map::new(),
        }
    }

    /// Builder-style setter for an attribute.
    #[must_use]
    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(attribute.into(), value.into());
        self
    }

    #[inline]
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.fields.get(attribute)
    }

    #[inline]
    pub fn has(&self, attribute: &str) -> bool {
        self.fields.contains_key(attribute)
    }

    /// Read a numeric attribute. Numeric strings are accepted.
    pub fn numeric(&self, attribute: &str) -> Result<f64> {
        let value = self
            .get(attribute)
            .ok_or_else(|| Error::MissingColumns(vec![attribute.to_string()]))?;

        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };

        match parsed {
            Some(v) if v.is_finite() => Ok(v),
            _ => Err(self.invalid(attribute, format!("expected a finite number, got {value}"))),
        }
    }

    /// Read a categorical attribute as its string label.
    pub fn categorical(&self, attribute: &str) -> Result<String> {
        let value = self
            .get(attribute)
            .ok_or_else(|| Error::MissingColumns(vec![attribute.to_string()]))?;

        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(self.invalid(attribute, format!("expected a category label, got {other}"))),
        }
    }

    fn invalid(&self, attribute: &str, reason: String) -> Error {
        Error::InvalidValue {
            school: self.name.clone(),
            attribute: attribute.to_string(),
            reason,
        }
    }
}

/// Attributes from `required` that are absent from at least one record,
/// in `required` order.
pub fn missing_columns<S: AsRef<str>>(records: &[SchoolRecord], required: &[S]) -> Vec<String> {
    required
        .iter()
        .map(AsRef::as_ref)
        .filter(|attribute| records.iter().any(|r| !r.has(attribute)))
        .map(str::to_string)
        .collect()
}

/// Name -> row lookup. The first row carrying a name wins.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    rows: AHashMap<String, usize>,
}

impl NameIndex {
    pub fn build(records: &[SchoolRecord]) -> Self {
        let mut rows = AHashMap::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            rows.entry(record.name.clone()).or_insert(idx);
        }
        Self { rows }
    }

    #[inline]
    pub fn resolve(&self, name: &str) -> Option<usize> {
        self.rows.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
