//! The fitted model: pipeline, reduced matrix and the records it was built from.

use crate::config::EngineConfig;
use crate::query::{self, Recommendation};
use chrono::{DateTime, Utc};
use ndarray::Array2;
use schoolrec_core::{Error, NameIndex, Result, SchoolRecord};
use schoolrec_features::{FeaturePipeline, FeatureWeights};
use schoolrec_storage::{records_digest, ModelMetadata, ModelSnapshot, FORMAT_VERSION};
use uuid::Uuid;

/// Immutable once built. A retrain produces a new `Model` that replaces
/// the old one as a whole.
#[derive(Debug, Clone)]
pub struct Model {
    pipeline: FeaturePipeline,
    /// One reduced row per record, standard (row-major) layout.
    features_matrix: Array2<f64>,
    records: Vec<SchoolRecord>,
    index: NameIndex,
    last_training_time: DateTime<Utc>,
    generation: Uuid,
}

impl Model {
    /// Fit a fresh model on `records`.
    pub fn build(records: Vec<SchoolRecord>, config: &EngineConfig) -> Result<Self> {
        let (pipeline, features_matrix) = FeaturePipeline::fit(
            &records,
            config.schema.clone(),
            config.feature_weights.clone(),
            config.variance_threshold,
        )?;

        Self::assemble(pipeline, features_matrix, records, Utc::now(), Uuid::new_v4())
    }

    /// Rebuild a model from persisted artifacts.
    pub fn from_snapshot(snapshot: ModelSnapshot) -> Result<Self> {
        snapshot.check_consistency()?;
        let ModelSnapshot {
            preprocessor,
            pca,
            features_matrix,
            records,
            metadata,
        } = snapshot;

        let pipeline = FeaturePipeline::from_parts(preprocessor, metadata.feature_weights, pca)?;
        Self::assemble(
            pipeline,
            features_matrix,
            records,
            metadata.last_training_time,
            metadata.generation,
        )
    }

    fn assemble(
        pipeline: FeaturePipeline,
        features_matrix: Array2<f64>,
        records: Vec<SchoolRecord>,
        last_training_time: DateTime<Utc>,
        generation: Uuid,
    ) -> Result<Self> {
        if features_matrix.nrows() != records.len() {
            return Err(Error::InvalidDimension {
                expected: records.len(),
                actual: features_matrix.nrows(),
            });
        }
        if features_matrix.ncols() != pipeline.output_dim() || features_matrix.ncols() == 0 {
            return Err(Error::InvalidDimension {
                expected: pipeline.output_dim(),
                actual: features_matrix.ncols(),
            });
        }

        let features_matrix = features_matrix.as_standard_layout().into_owned();
        let index = NameIndex::build(&records);
        Ok(Self {
            pipeline,
            features_matrix,
            records,
            index,
            last_training_time,
            generation,
        })
    }

    /// Persistable form of this model.
    pub fn to_snapshot(&self) -> Result<ModelSnapshot> {
        let schema = self.pipeline.schema();
        Ok(ModelSnapshot {
            preprocessor: self.pipeline.preprocessor().clone(),
            pca: self.pipeline.pca().clone(),
            features_matrix: self.features_matrix.clone(),
            records: self.records.clone(),
            metadata: ModelMetadata {
                format_version: FORMAT_VERSION,
                generation: self.generation,
                feature_weights: self.pipeline.weights().clone(),
                last_training_time: self.last_training_time,
                numerical_features: schema.numeric.clone(),
                categorical_features: schema.categorical.clone(),
                n_records: self.records.len(),
                n_components: self.dim(),
                records_digest: records_digest(&self.records)?,
            },
        })
    }

    /// True when `records` differ from the table this model was built on.
    pub fn is_stale(&self, records: &[SchoolRecord]) -> bool {
        self.records.len() != records.len() || self.records.as_slice() != records
    }

    /// Project records through the fitted pipeline without refitting.
    pub fn transform(&self, records: &[SchoolRecord]) -> Result<Array2<f64>> {
        self.pipeline.transform(records)
    }

    pub fn recommend(&self, school_names: &[String], n: usize) -> Result<Vec<Recommendation>> {
        query::recommend(self, school_names, n)
    }

    /// Reduced vector of row `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of bounds.
    #[inline]
    pub fn row(&self, idx: usize) -> &[f64] {
        let dim = self.dim();
        &self.features_matrix.as_slice().unwrap_or_default()[idx * dim..(idx + 1) * dim]
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.features_matrix.ncols()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[SchoolRecord] {
        &self.records
    }

    pub fn features_matrix(&self) -> &Array2<f64> {
        &self.features_matrix
    }

    pub fn index(&self) -> &NameIndex {
        &self.index
    }

    pub fn pipeline(&self) -> &FeaturePipeline {
        &self.pipeline
    }

    pub fn feature_weights(&self) -> &FeatureWeights {
        self.pipeline.weights()
    }

    pub fn last_training_time(&self) -> DateTime<Utc> {
        self.last_training_time
    }

    pub fn generation(&self) -> Uuid {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn school(name: &str, rating: f64, tuition: f64, kind: &str) -> SchoolRecord {
        SchoolRecord::new(name)
            .with("rating", rating)
            .with("tuition", tuition)
            .with("student_teacher_ratio", 15)
            .with("test_scores", 70.0 + rating)
            .with("type", kind)
            .with("curriculum", "national")
            .with("focus", "arts")
            .with("facilities", "basic")
    }

    fn records() -> Vec<SchoolRecord> {
        vec![
            school("A", 4.0, 1000.0, "public"),
            school("B", 4.1, 1100.0, "public"),
            school("C", 1.0, 9000.0, "private"),
        ]
    }

    #[test]
    fn test_build_shapes() {
        let model = Model::build(records(), &EngineConfig::default()).unwrap();
        assert_eq!(model.len(), 3);
        assert_eq!(model.features_matrix().nrows(), 3);
        assert!(model.dim() >= 1);
        assert_eq!(model.row(2).len(), model.dim());
        assert_eq!(model.index().resolve("C"), Some(2));
    }

    #[test]
    fn test_staleness() {
        let model = Model::build(records(), &EngineConfig::default()).unwrap();
        assert!(!model.is_stale(&records()));

        let mut appended = records();
        appended.push(school("D", 3.0, 3000.0, "public"));
        assert!(model.is_stale(&appended));

        let mut mutated = records();
        mutated[1] = mutated[1].clone().with("tuition", 1150.0);
        assert!(model.is_stale(&mutated));

        let mut reordered = records();
        reordered.swap(0, 1);
        assert!(model.is_stale(&reordered));
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let model = Model::build(records(), &EngineConfig::default()).unwrap();
        let restored = Model::from_snapshot(model.to_snapshot().unwrap()).unwrap();

        assert_eq!(restored.generation(), model.generation());
        assert_eq!(restored.last_training_time(), model.last_training_time());
        assert_eq!(restored.features_matrix(), model.features_matrix());
        assert_eq!(restored.records(), model.records());
    }

    #[test]
    fn test_build_failure_is_reported() {
        let mut bad = records();
        bad[0].fields.remove("curriculum");
        let err = Model::build(bad, &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, Error::MissingColumns(_)));
    }
}
