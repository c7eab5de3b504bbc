//! # schoolrec
//!
//! A content-based school recommender.
//!
//! Schools are described by a handful of numeric attributes (rating,
//! tuition, student/teacher ratio, test scores) and categorical ones (type,
//! curriculum, focus, facilities). Each record is standardized, one-hot
//! encoded, weighted per attribute and projected with PCA onto the fewest
//! components that keep 95% of the variance. Given a few schools a user
//! likes, the engine averages their vectors and returns the closest other
//! schools by euclidean distance.
//!
//! ## Quick Start
//!
//! ### From the command line
//!
//! ```bash
//! schoolrec --data schools.json train
//! schoolrec --data schools.json recommend --school "Riverside Academy" -n 5
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use schoolrec::prelude::*;
//!
//! let engine = Engine::new(EngineConfig::new("models"), JsonFileSource::new("schools.json"))?;
//! engine.retrain(false)?;
//!
//! let liked = vec!["Riverside Academy".to_string(), "Hillview School".to_string()];
//! for rec in engine.get_recommendations(&liked, 5)? {
//!     println!("{:<30} {:.3}", rec.record.name, rec.similarity_score);
//! }
//! # Ok::<(), schoolrec::Error>(())
//! ```
//!
//! ## Crate Structure
//!
//! - `schoolrec-core` - records, vectors, errors
//! - `schoolrec-features` - scaler, encoder, weighting, PCA
//! - `schoolrec-storage` - persisted artifact set
//! - `schoolrec-engine` - model lifecycle, queries, background retrain

// Re-export core types
pub use schoolrec_core::{
    Error, Result,
    SchoolRecord, NameIndex, Vector,
    CATEGORICAL_ATTRIBUTES, NUMERIC_ATTRIBUTES,
};

// Re-export the feature pipeline
pub use schoolrec_features::{
    FeaturePipeline, FeatureSchema, FeatureWeights, Pca, Preprocessor,
    DEFAULT_VARIANCE_THRESHOLD,
};

// Re-export storage
pub use schoolrec_storage::{ModelMetadata, ModelSnapshot, ModelStore};

// Re-export the engine
pub use schoolrec_engine::{
    Engine, EngineConfig, EngineState, FitOutcome, Model, ModelInfo,
    Recommendation, RecordSource, JsonFileSource, StaticSource,
    RetrainTicket, RetrainWorker,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Engine, EngineConfig, EngineState, FitOutcome,
        Recommendation, RecordSource, JsonFileSource, StaticSource,
        SchoolRecord, FeatureWeights,
        Error, Result,
    };
}
