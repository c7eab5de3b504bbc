//! One-hot encoding of categorical attributes.

use ahash::{AHashMap, AHashSet};
use ndarray::Array2;
use schoolrec_core::{Result, SchoolRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Vocabulary learned for a single attribute, in encounter order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryVocabulary {
    pub attribute: String,
    pub categories: Vec<String>,
}

impl CategoryVocabulary {
    fn lookup(&self) -> AHashMap<&str, usize> {
        self.categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect()
    }
}

/// One-hot encoder over record attributes.
///
/// Every value seen at fit time gets its own column named
/// `{attribute}_{value}`. Values never seen during fit encode to an all-zero
/// group instead of failing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OneHotEncoder {
    vocabularies: Vec<CategoryVocabulary>,
}

impl OneHotEncoder {
    pub fn fit<S: AsRef<str>>(records: &[SchoolRecord], attributes: &[S]) -> Result<Self> {
        let mut vocabularies = Vec::with_capacity(attributes.len());

        for attribute in attributes.iter().map(AsRef::as_ref) {
            let mut seen = AHashSet::new();
            let mut categories = Vec::new();
            for record in records {
                let value = record.categorical(attribute)?;
                if seen.insert(value.clone()) {
                    categories.push(value);
                }
            }
            debug!(attribute, categories = categories.len(), "learned vocabulary");
            vocabularies.push(CategoryVocabulary {
                attribute: attribute.to_string(),
                categories,
            });
        }

        Ok(Self { vocabularies })
    }

    pub fn transform(&self, records: &[SchoolRecord]) -> Result<Array2<f64>> {
        let mut out = Array2::zeros((records.len(), self.n_features()));
        let mut offset = 0;

        for vocab in &self.vocabularies {
            let lookup = vocab.lookup();
            for (row, record) in records.iter().enumerate() {
                let value = record.categorical(&vocab.attribute)?;
                if let Some(&col) = lookup.get(value.as_str()) {
                    out[[row, offset + col]] = 1.0;
                }
            }
            offset += vocab.categories.len();
        }

        Ok(out)
    }

    /// Output column names, grouped by attribute.
    pub fn feature_names(&self) -> Vec<String> {
        self.vocabularies
            .iter()
            .flat_map(|v| {
                v.categories
                    .iter()
                    .map(move |c| format!("{}_{}", v.attribute, c))
            })
            .collect()
    }

    pub fn n_features(&self) -> usize {
        self.vocabularies.iter().map(|v| v.categories.len()).sum()
    }

    pub fn vocabularies(&self) -> &[CategoryVocabulary] {
        &self.vocabularies
    }
}
