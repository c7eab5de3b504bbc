//! Feature schema and attribute weights
//!
//! Declares which record attributes feed the feature model, how each one is
//! encoded, and how strongly each one pulls on Euclidean distance.

use ahash::AHashSet;
use schoolrec_core::{CATEGORICAL_ATTRIBUTES, NUMERIC_ATTRIBUTES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Attribute declaration for the feature pipeline.
///
/// Numeric attributes are standardized, categorical attributes are one-hot
/// encoded. The list order is the output column order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureSchema {
    /// Schema version for future compatibility
    #[serde(default = "default_version")]
    pub version: u32,
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
}

fn default_version() -> u32 {
    1
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::new(
            NUMERIC_ATTRIBUTES.iter().map(|s| s.to_string()).collect(),
            CATEGORICAL_ATTRIBUTES.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl FeatureSchema {
    pub fn new(numeric: Vec<String>, categorical: Vec<String>) -> Self {
        Self {
            version: 1,
            numeric,
            categorical,
        }
    }

    /// Every attribute a record must carry, numeric first.
    pub fn required(&self) -> Vec<&str> {
        self.numeric
            .iter()
            .chain(self.categorical.iter())
            .map(String::as_str)
            .collect()
    }

    /// Reject empty schemas and attributes declared twice.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.numeric.is_empty() && self.categorical.is_empty() {
            return Err(SchemaError::EmptySchema);
        }
        let mut seen = AHashSet::new();
        for name in self.required() {
            if !seen.insert(name) {
                return Err(SchemaError::DuplicateAttribute(name.to_string()));
            }
        }
        Ok(())
    }
}

/// Per-attribute importance weights.
///
/// Weights multiply the attribute's columns after transformation and are
/// never normalized, so they do not need to sum to anything.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct FeatureWeights {
    weights: BTreeMap<String, f64>,
}

impl Default for FeatureWeights {
    fn default() -> Self {
        Self::from_pairs([
            ("type", 1.0),
            ("curriculum", 1.0),
            ("focus", 1.0),
            ("facilities", 0.8),
            ("rating", 1.5),
            ("tuition", 1.5),
            ("student_teacher_ratio", 0.6),
            ("test_scores", 1.2),
        ])
    }
}

impl FeatureWeights {
    pub fn new(weights: BTreeMap<String, f64>) -> Self {
        Self { weights }
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            weights: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Load a weight mapping from a JSON object such as `{"rating": 2.0}`.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> schoolrec_core::Result<Self> {
        let data = std::fs::read(path)?;
        let weights: Self = serde_json::from_slice(&data)?;
        weights.validate()?;
        Ok(weights)
    }

    pub fn get(&self, attribute: &str) -> Option<f64> {
        self.weights.get(attribute).copied()
    }

    /// Override or add a single weight.
    pub fn set(&mut self, attribute: impl Into<String>, weight: f64) {
        self.weights.insert(attribute.into(), weight);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }

    /// Weights must be finite and non-negative.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for (name, weight) in &self.weights {
            if !weight.is_finite() {
                return Err(SchemaError::NonFiniteWeight(name.clone()));
            }
            if *weight < 0.0 {
                return Err(SchemaError::NegativeWeight(name.clone()));
            }
        }
        Ok(())
    }
}

/// Errors that can occur during schema validation
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchemaError {
    #[error("Schema cannot be empty")]
    EmptySchema,

    #[error("Attribute '{0}' is declared more than once")]
    DuplicateAttribute(String),

    #[error("Attribute '{0}' has negative weight")]
    NegativeWeight(String),

    #[error("Attribute '{0}' has a non-finite weight")]
    NonFiniteWeight(String),
}

impl From<SchemaError> for schoolrec_core::Error {
    fn from(e: SchemaError) -> Self {
        schoolrec_core::Error::InvalidConfig(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_order() {
        let schema = FeatureSchema::default();
        assert_eq!(schema.version, 1);
        assert_eq!(
            schema.required(),
            vec![
                "rating",
                "tuition",
                "student_teacher_ratio",
                "test_scores",
                "type",
                "curriculum",
                "focus",
                "facilities"
            ]
        );
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_duplicate_attribute_error() {
        let schema = FeatureSchema::new(vec!["rating".into()], vec!["rating".into()]);
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::DuplicateAttribute(_))
        ));
        assert!(matches!(
            FeatureSchema::new(vec![], vec![]).validate(),
            Err(SchemaError::EmptySchema)
        ));
    }

    #[test]
    fn test_default_weights_are_not_normalized() {
        let weights = FeatureWeights::default();
        assert_eq!(weights.len(), 8);
        assert_eq!(weights.get("rating"), Some(1.5));
        assert_eq!(weights.get("facilities"), Some(0.8));
        let total: f64 = weights.iter().map(|(_, w)| w).sum();
        assert!((total - 8.6).abs() < 1e-9);
    }

    #[test]
    fn test_negative_weight_error() {
        let mut weights = FeatureWeights::default();
        weights.set("tuition", -1.0);
        assert!(matches!(
            weights.validate(),
            Err(SchemaError::NegativeWeight(_))
        ));

        weights.set("tuition", f64::NAN);
        assert!(matches!(
            weights.validate(),
            Err(SchemaError::NonFiniteWeight(_))
        ));
    }

    #[test]
    fn test_weights_serde_roundtrip() {
        let weights = FeatureWeights::from_pairs([("rating", 2.0), ("type", 0.5)]);
        let json = serde_json::to_string(&weights).unwrap();
        assert_eq!(json, r#"{"rating":2.0,"type":0.5}"#);
        let parsed: FeatureWeights = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, weights);
    }

    #[test]
    fn test_weights_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.json");
        std::fs::write(&path, r#"{"rating": 3.0}"#).unwrap();
        let weights = FeatureWeights::from_json_file(&path).unwrap();
        assert_eq!(weights.get("rating"), Some(3.0));
        assert_eq!(weights.get("tuition"), None);

        std::fs::write(&path, r#"{"rating": -3.0}"#).unwrap();
        assert!(matches!(
            FeatureWeights::from_json_file(&path),
            Err(schoolrec_core::Error::InvalidConfig(_))
        ));
    }
}
