//! # schoolrec features
//!
//! Turns school records into points in a weighted, reduced feature space.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │   Records    │──>│ Preprocessor │──>│  Weighting   │──>│     PCA      │
//! │ (attributes) │   │ scale+1-hot  │   │ per attribute│   │ >=95% var    │
//! └──────────────┘   └──────────────┘   └──────────────┘   └──────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use schoolrec_core::SchoolRecord;
//! use schoolrec_features::{FeaturePipeline, FeatureSchema, FeatureWeights, DEFAULT_VARIANCE_THRESHOLD};
//!
//! let school = |name: &str, rating: f64, kind: &str| {
//!     SchoolRecord::new(name)
//!         .with("rating", rating)
//!         .with("tuition", 1000.0 * rating)
//!         .with("student_teacher_ratio", 12)
//!         .with("test_scores", 70)
//!         .with("type", kind)
//!         .with("curriculum", "national")
//!         .with("focus", "stem")
//!         .with("facilities", "basic")
//! };
//! let records = vec![school("A", 4.0, "public"), school("B", 2.5, "private")];
//!
//! let (pipeline, reduced) = FeaturePipeline::fit(
//!     &records,
//!     FeatureSchema::default(),
//!     FeatureWeights::default(),
//!     DEFAULT_VARIANCE_THRESHOLD,
//! ).unwrap();
//! assert_eq!(reduced.nrows(), 2);
//! assert_eq!(reduced.ncols(), pipeline.output_dim());
//! ```

pub mod encoder;
pub mod pca;
pub mod pipeline;
pub mod preprocessor;
pub mod scaler;
pub mod schema;
pub mod weighting;

pub use encoder::{CategoryVocabulary, OneHotEncoder};
pub use pca::{Pca, DEFAULT_VARIANCE_THRESHOLD};
pub use pipeline::FeaturePipeline;
pub use preprocessor::Preprocessor;
pub use scaler::StandardScaler;
pub use schema::{FeatureSchema, FeatureWeights, SchemaError};
pub use weighting::{apply_feature_weights, column_matches, column_weights};
