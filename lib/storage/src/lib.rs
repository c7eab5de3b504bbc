pub mod persistence;

pub use persistence::{
    records_digest, ArtifactPaths, ModelMetadata, ModelSnapshot, ModelStore, FEATURES_MATRIX_FILE,
    FORMAT_VERSION, METADATA_FILE, PCA_FILE, PREPROCESSOR_FILE, SCHOOLS_FILE,
};
