//! Attribute weighting of transformed columns.

use crate::schema::FeatureWeights;
use ndarray::Array2;
use schoolrec_core::{Error, Result};

/// True when `column` belongs to `attribute`: an exact match, or a one-hot
/// column `{attribute}_{value}`.
#[inline]
pub fn column_matches(column: &str, attribute: &str) -> bool {
    match column.strip_prefix(attribute) {
        Some(rest) => rest.is_empty() || rest.starts_with('_'),
        None => false,
    }
}

/// Effective multiplier per column. Every matching weight applies, so a
/// column claimed by two attributes gets both factors.
pub fn column_weights(feature_names: &[String], weights: &FeatureWeights) -> Vec<f64> {
    feature_names
        .iter()
        .map(|column| {
            weights
                .iter()
                .filter(|(attribute, _)| column_matches(column, attribute))
                .map(|(_, w)| w)
                .product()
        })
        .collect()
}

/// Scale the columns of `x` in place by their attribute weights.
pub fn apply_feature_weights(x: &mut Array2<f64>, feature_names: &[String], weights: &FeatureWeights) -> Result<()> {
    if x.ncols() != feature_names.len() {
        return Err(Error::InvalidDimension {
            expected: feature_names.len(),
            actual: x.ncols(),
        });
    }

    for (mut column, factor) in x.columns_mut().into_iter().zip(column_weights(feature_names, weights)) {
        if factor != 1.0 {
            column.mapv_inplace(|v| v * factor);
        }
    }
    Ok(())
}
