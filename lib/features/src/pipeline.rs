//! The full record -> reduced vector pipeline.

use crate::pca::Pca;
use crate::preprocessor::Preprocessor;
use crate::schema::{FeatureSchema, FeatureWeights};
use crate::weighting::apply_feature_weights;
use ndarray::Array2;
use schoolrec_core::{Error, Result, SchoolRecord};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Fitted preprocessing, weighting and reduction, applied in that order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeaturePipeline {
    preprocessor: Preprocessor,
    weights: FeatureWeights,
    pca: Pca,
}

impl FeaturePipeline {
    /// Fit every stage on `records` and return the reduced matrix, one row per record.
    pub fn fit(
        records: &[SchoolRecord],
        schema: FeatureSchema,
        weights: FeatureWeights,
        variance_threshold: f64,
    ) -> Result<(Self, Array2<f64>)> {
        weights.validate()?;

        let (preprocessor, mut features) = Preprocessor::fit_transform(schema, records)?;
        let feature_names = preprocessor.feature_names();
        apply_feature_weights(&mut features, &feature_names, &weights)?;

        let (pca, reduced) = Pca::fit_transform(&features, variance_threshold)?;
        info!(
            "Reduced dimensions from {} to {}",
            features.ncols(),
            reduced.ncols()
        );

        Ok((
            Self {
                preprocessor,
                weights,
                pca,
            },
            reduced,
        ))
    }

    /// Reassemble a pipeline from persisted stages, checking that they line up.
    pub fn from_parts(preprocessor: Preprocessor, weights: FeatureWeights, pca: Pca) -> Result<Self> {
        if preprocessor.n_features() != pca.n_features() {
            return Err(Error::InvalidDimension {
                expected: preprocessor.n_features(),
                actual: pca.n_features(),
            });
        }
        Ok(Self {
            preprocessor,
            weights,
            pca,
        })
    }

    /// Project records with the fitted parameters. Unknown categories are
    /// encoded as zeros; nothing is refitted.
    pub fn transform(&self, records: &[SchoolRecord]) -> Result<Array2<f64>> {
        let mut features = self.preprocessor.transform(records)?;
        apply_feature_weights(&mut features, &self.preprocessor.feature_names(), &self.weights)?;
        self.pca.transform(&features)
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn weights(&self) -> &FeatureWeights {
        &self.weights
    }

    pub fn pca(&self) -> &Pca {
        &self.pca
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.preprocessor.schema()
    }

    /// Width of the weighted space before reduction.
    pub fn input_dim(&self) -> usize {
        self.preprocessor.n_features()
    }

    /// Width of the reduced space.
    pub fn output_dim(&self) -> usize {
        self.pca.n_components()
    }
}
