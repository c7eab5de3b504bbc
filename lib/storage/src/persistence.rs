// Model persistence: one directory, five artifacts, one generation id.
//
// Every artifact is written to a temp file and renamed into place. The
// metadata file goes last and acts as the commit record: a load only
// succeeds when every artifact carries the generation named in metadata.

use atomicwrites::{AllowOverwrite, AtomicFile};
use chrono::{DateTime, Utc};
use ndarray::Array2;
use schoolrec_core::{Error, Result, SchoolRecord};
use schoolrec_features::{FeatureWeights, Pca, Preprocessor};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

pub const PREPROCESSOR_FILE: &str = "preprocessor.json";
pub const PCA_FILE: &str = "pca.bin";
pub const FEATURES_MATRIX_FILE: &str = "features_matrix.bin";
pub const SCHOOLS_FILE: &str = "schools.json";
pub const METADATA_FILE: &str = "metadata.json";

/// Bumped whenever an artifact layout changes.
pub const FORMAT_VERSION: u32 = 1;

/// Metadata bundle, written last.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelMetadata {
    pub format_version: u32,
    pub generation: Uuid,
    pub feature_weights: FeatureWeights,
    pub last_training_time: DateTime<Utc>,
    pub numerical_features: Vec<String>,
    pub categorical_features: Vec<String>,
    pub n_records: usize,
    pub n_components: usize,
    /// SHA-256 of the JSON-encoded record table.
    pub records_digest: String,
}

/// Everything a model is made of, in persisted form.
#[derive(Debug, Clone)]
pub struct ModelSnapshot {
    pub preprocessor: Preprocessor,
    pub pca: Pca,
    pub features_matrix: Array2<f64>,
    pub records: Vec<SchoolRecord>,
    pub metadata: ModelMetadata,
}

/// Payload stamped with the generation it belongs to.
#[derive(Serialize, Deserialize)]
struct Stamped<T> {
    generation: Uuid,
    payload: T,
}

#[derive(Serialize)]
struct StampedRef<'a, T> {
    generation: Uuid,
    payload: &'a T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Json,
    Bincode,
}

/// Paths of the five artifacts
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub preprocessor: PathBuf,
    pub pca: PathBuf,
    pub features_matrix: PathBuf,
    pub schools: PathBuf,
    pub metadata: PathBuf,
}

impl ArtifactPaths {
    fn new(dir: &Path) -> Self {
        Self {
            preprocessor: dir.join(PREPROCESSOR_FILE),
            pca: dir.join(PCA_FILE),
            features_matrix: dir.join(FEATURES_MATRIX_FILE),
            schools: dir.join(SCHOOLS_FILE),
            metadata: dir.join(METADATA_FILE),
        }
    }

    pub fn all(&self) -> [&Path; 5] {
        [
            &self.preprocessor,
            &self.pca,
            &self.features_matrix,
            &self.schools,
            &self.metadata,
        ]
    }
}

/// Reads and writes model artifact sets under one directory.
#[derive(Debug, Clone)]
pub struct ModelStore {
    model_dir: PathBuf,
    paths: ArtifactPaths,
}

impl ModelStore {
    pub fn new<P: AsRef<Path>>(model_dir: P) -> Self {
        let model_dir = model_dir.as_ref().to_path_buf();
        let paths = ArtifactPaths::new(&model_dir);
        Self { model_dir, paths }
    }

    #[inline]
    #[must_use]
    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    #[inline]
    #[must_use]
    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// True when all five artifacts are present (not necessarily consistent).
    pub fn exists(&self) -> bool {
        self.paths.all().iter().all(|p| p.exists())
    }

    /// Write a full artifact set. Metadata is written last.
    pub fn save(&self, snapshot: &ModelSnapshot) -> Result<()> {
        std::fs::create_dir_all(&self.model_dir)?;
        let generation = snapshot.metadata.generation;

        write_artifact(&self.paths.preprocessor, generation, &snapshot.preprocessor, Encoding::Json)?;
        write_artifact(&self.paths.pca, generation, &snapshot.pca, Encoding::Bincode)?;
        write_artifact(
            &self.paths.features_matrix,
            generation,
            &snapshot.features_matrix,
            Encoding::Bincode,
        )?;
        write_artifact(&self.paths.schools, generation, &snapshot.records, Encoding::Json)?;

        let metadata = serde_json::to_vec_pretty(&snapshot.metadata)?;
        atomic_write(&self.paths.metadata, &metadata)?;

        info!(
            "Models and data saved to {:?} (generation {})",
            self.model_dir, generation
        );
        Ok(())
    }

    /// Read the artifact set.
    ///
    /// `Ok(None)` when any artifact is missing; an error when one is
    /// unreadable or the set is not mutually consistent.
    pub fn load(&self) -> Result<Option<ModelSnapshot>> {
        if let Some(missing) = self.paths.all().iter().find(|p| !p.exists()) {
            debug!("model artifact missing: {:?}", missing);
            return Ok(None);
        }

        let metadata: ModelMetadata = serde_json::from_slice(&std::fs::read(&self.paths.metadata)?)?;
        if metadata.format_version != FORMAT_VERSION {
            return Err(Error::Persistence(format!(
                "unsupported artifact format version {} (expected {})",
                metadata.format_version, FORMAT_VERSION
            )));
        }

        let generation = metadata.generation;
        let preprocessor: Preprocessor = read_artifact(&self.paths.preprocessor, generation, Encoding::Json)?;
        let pca: Pca = read_artifact(&self.paths.pca, generation, Encoding::Bincode)?;
        let features_matrix: Array2<f64> =
            read_artifact(&self.paths.features_matrix, generation, Encoding::Bincode)?;
        let records: Vec<SchoolRecord> = read_artifact(&self.paths.schools, generation, Encoding::Json)?;

        let snapshot = ModelSnapshot {
            preprocessor,
            pca,
            features_matrix,
            records,
            metadata,
        };
        snapshot.check_consistency()?;
        Ok(Some(snapshot))
    }
}

impl ModelSnapshot {
    /// Cross-check row counts, widths, attribute lists and the record digest.
    pub fn check_consistency(&self) -> Result<()> {
        let meta = &self.metadata;
        let rows = self.features_matrix.nrows();

        if rows != self.records.len() || rows != meta.n_records {
            return Err(Error::Persistence(format!(
                "row count mismatch: matrix {}, records {}, metadata {}",
                rows,
                self.records.len(),
                meta.n_records
            )));
        }
        if self.features_matrix.ncols() != self.pca.n_components() || meta.n_components != self.pca.n_components() {
            return Err(Error::Persistence(format!(
                "reduced dimension mismatch: matrix {}, projection {}, metadata {}",
                self.features_matrix.ncols(),
                self.pca.n_components(),
                meta.n_components
            )));
        }
        if self.pca.n_features() != self.preprocessor.n_features() {
            return Err(Error::Persistence(format!(
                "projection expects {} features, preprocessor yields {}",
                self.pca.n_features(),
                self.preprocessor.n_features()
            )));
        }

        let schema = self.preprocessor.schema();
        if schema.numeric != meta.numerical_features || schema.categorical != meta.categorical_features {
            return Err(Error::Persistence(
                "attribute lists differ between preprocessor and metadata".to_string(),
            ));
        }

        let digest = records_digest(&self.records)?;
        if digest != meta.records_digest {
            return Err(Error::Persistence("record table digest mismatch".to_string()));
        }
        Ok(())
    }
}

/// SHA-256 over the JSON encoding of the record table, hex encoded.
pub fn records_digest(records: &[SchoolRecord]) -> Result<String> {
    let data = serde_json::to_vec(records)?;
    Ok(format!("{:x}", Sha256::digest(&data)))
}

fn write_artifact<T: Serialize>(path: &Path, generation: Uuid, payload: &T, encoding: Encoding) -> Result<()> {
    let stamped = StampedRef { generation, payload };
    let data = match encoding {
        Encoding::Json => serde_json::to_vec(&stamped)?,
        Encoding::Bincode => bincode::serialize(&stamped).map_err(|e| Error::Serialization(e.to_string()))?,
    };
    atomic_write(path, &data)
}

fn read_artifact<T: DeserializeOwned>(path: &Path, generation: Uuid, encoding: Encoding) -> Result<T> {
    let data = std::fs::read(path)?;
    let stamped: Stamped<T> = match encoding {
        Encoding::Json => serde_json::from_slice(&data)?,
        Encoding::Bincode => bincode::deserialize(&data).map_err(|e| Error::Serialization(e.to_string()))?,
    };
    if stamped.generation != generation {
        return Err(Error::Persistence(format!(
            "{:?} belongs to generation {}, metadata names {}",
            path.file_name().unwrap_or_default(),
            stamped.generation,
            generation
        )));
    }
    Ok(stamped.payload)
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    AtomicFile::new(path, AllowOverwrite)
        .write(|f| f.write_all(data))
        .map_err(|e| Error::Persistence(format!("failed to write {:?}: {}", path, e)))
}
