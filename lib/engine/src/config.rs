use schoolrec_core::{Error, Result};
use schoolrec_features::{FeatureSchema, FeatureWeights, DEFAULT_VARIANCE_THRESHOLD};
use std::path::{Path, PathBuf};

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory holding the persisted model artifacts
    pub model_dir: PathBuf,
    pub schema: FeatureSchema,
    pub feature_weights: FeatureWeights,
    /// Share of variance the reduced space must keep
    pub variance_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            schema: FeatureSchema::default(),
            feature_weights: FeatureWeights::default(),
            variance_threshold: DEFAULT_VARIANCE_THRESHOLD,
        }
    }
}

impl EngineConfig {
    pub fn new<P: AsRef<Path>>(model_dir: P) -> Self {
        Self {
            model_dir: model_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_feature_weights(mut self, weights: FeatureWeights) -> Self {
        self.feature_weights = weights;
        self
    }

    #[must_use]
    pub fn with_schema(mut self, schema: FeatureSchema) -> Self {
        self.schema = schema;
        self
    }

    #[must_use]
    pub fn with_variance_threshold(mut self, threshold: f64) -> Self {
        self.variance_threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.schema.validate()?;
        self.feature_weights.validate()?;
        if !(self.variance_threshold > 0.0 && self.variance_threshold <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "variance threshold must be in (0, 1], got {}",
                self.variance_threshold
            )));
        }
        Ok(())
    }
}
