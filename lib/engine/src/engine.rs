use crate::config::EngineConfig;
use crate::model::Model;
use crate::query::Recommendation;
use crate::source::RecordSource;
use chrono::{DateTime, Utc};
use ndarray::Array2;
use parking_lot::{Mutex, RwLock};
use schoolrec_core::{Error, Result, SchoolRecord};
use schoolrec_features::FeatureWeights;
use schoolrec_storage::ModelStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Lifecycle of an [`Engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Uninitialized,
    DataLoaded,
    ModelReady,
}

/// What a call to [`Engine::fit`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitOutcome {
    /// The persisted model matched the records and was kept.
    Reused,
    /// A new model was built, persisted and swapped in.
    Trained,
}

/// Snapshot of the engine for status endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub state: EngineState,
    pub last_training_time: Option<DateTime<Utc>>,
    pub feature_weights: FeatureWeights,
    pub number_of_schools: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_features: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduced_features: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explained_variance: Option<f64>,
}

/// Owns the record table and the current model.
///
/// Queries clone the current `Arc<Model>` and release the lock before
/// scanning, so a retrain swapping in a new model never blocks or tears a
/// query in flight. Fits, saves and loads of the artifact set are
/// serialized against each other.
pub struct Engine {
    config: EngineConfig,
    source: Box<dyn RecordSource>,
    store: ModelStore,
    records: RwLock<Option<Arc<Vec<SchoolRecord>>>>,
    model: RwLock<Option<Arc<Model>>>,
    fit_lock: Mutex<()>,
}

impl Engine {
    pub fn new<S: RecordSource + 'static>(config: EngineConfig, source: S) -> Result<Self> {
        config.validate()?;
        let store = ModelStore::new(&config.model_dir);
        Ok(Self {
            config,
            source: Box::new(source),
            store,
            records: RwLock::new(None),
            model: RwLock::new(None),
            fit_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    /// Pull the record table from the configured source.
    pub fn load_data(&self) -> bool {
        info!("Loading data from {}", self.source.describe());
        match self.source.load() {
            Ok(records) => {
                info!("Loaded {} schools", records.len());
                *self.records.write() = Some(Arc::new(records));
                true
            }
            Err(e) => {
                error!("Error loading data: {}", e);
                false
            }
        }
    }

    /// Records from the last successful [`Engine::load_data`].
    pub fn records(&self) -> Option<Arc<Vec<SchoolRecord>>> {
        self.records.read().clone()
    }

    /// Make sure the model reflects `records`.
    ///
    /// Unless `force` is set, a persisted model whose records equal
    /// `records` is adopted as is. Otherwise a new model is built, saved and
    /// swapped in. A failed build leaves the current model untouched and
    /// returns [`Error::Training`].
    pub fn fit(&self, records: &[SchoolRecord], force: bool) -> Result<FitOutcome> {
        let _guard = self.fit_lock.lock();

        if !force {
            if let Some(persisted) = self.load_persisted() {
                if !persisted.is_stale(records) {
                    info!("Using existing models - no retraining needed");
                    self.adopt(persisted);
                    return Ok(FitOutcome::Reused);
                }
                info!("Persisted model is stale, retraining");
            }
        }

        info!("Training new models on {} schools", records.len());
        let model = Model::build(records.to_vec(), &self.config).map_err(Error::training)?;
        self.persist(&model).map_err(Error::training)?;

        info!(
            "Training completed. Reduced to {} dimensions, generation {}",
            model.dim(),
            model.generation()
        );
        *self.model.write() = Some(Arc::new(model));
        Ok(FitOutcome::Trained)
    }

    /// Reload the record table and fit on it.
    pub fn retrain(&self, force: bool) -> Result<FitOutcome> {
        if !self.load_data() {
            return Err(Error::training(Error::NoData));
        }
        let records = self.records().ok_or(Error::NoData)?;
        self.fit(&records, force)
    }

    /// Persist the current model.
    pub fn save_model(&self) -> Result<()> {
        let _guard = self.fit_lock.lock();
        let model = self.model().ok_or(Error::NotReady)?;
        self.persist(&model)
    }

    /// Replace the in-memory model with the persisted one.
    ///
    /// Returns `false` when no complete, consistent artifact set exists; the
    /// current model is then left as it was.
    pub fn load_model(&self) -> bool {
        let _guard = self.fit_lock.lock();
        match self.load_persisted() {
            Some(model) => {
                info!(
                    "Models loaded successfully. Last trained: {}",
                    model.last_training_time()
                );
                *self.model.write() = Some(Arc::new(model));
                true
            }
            None => false,
        }
    }

    pub fn get_recommendations(&self, school_names: &[String], n: usize) -> Result<Vec<Recommendation>> {
        let model = self.model().ok_or(Error::NotReady)?;
        model.recommend(school_names, n)
    }

    /// Project arbitrary records into the current model's reduced space.
    pub fn transform(&self, records: &[SchoolRecord]) -> Result<Array2<f64>> {
        let model = self.model().ok_or(Error::NotReady)?;
        model.transform(records)
    }

    /// Current model, if any.
    #[inline]
    pub fn model(&self) -> Option<Arc<Model>> {
        self.model.read().clone()
    }

    pub fn state(&self) -> EngineState {
        if self.model.read().is_some() {
            EngineState::ModelReady
        } else if self.records.read().is_some() {
            EngineState::DataLoaded
        } else {
            EngineState::Uninitialized
        }
    }

    pub fn last_training_time(&self) -> Option<DateTime<Utc>> {
        self.model().map(|m| m.last_training_time())
    }

    /// Weights of the current model, or the configured ones before any fit.
    pub fn feature_weights(&self) -> FeatureWeights {
        match self.model() {
            Some(model) => model.feature_weights().clone(),
            None => self.config.feature_weights.clone(),
        }
    }

    pub fn record_count(&self) -> usize {
        match self.model() {
            Some(model) => model.len(),
            None => self.records().map(|r| r.len()).unwrap_or(0),
        }
    }

    pub fn model_info(&self) -> ModelInfo {
        let model = self.model();
        ModelInfo {
            state: self.state(),
            last_training_time: self.last_training_time(),
            feature_weights: self.feature_weights(),
            number_of_schools: self.record_count(),
            generation: model.as_ref().map(|m| m.generation()),
            input_features: model.as_ref().map(|m| m.pipeline().input_dim()),
            reduced_features: model.as_ref().map(|m| m.dim()),
            explained_variance: model
                .as_ref()
                .map(|m| m.pipeline().pca().explained_variance_ratio().iter().sum::<f64>()),
        }
    }

    fn persist(&self, model: &Model) -> Result<()> {
        let snapshot = model.to_snapshot()?;
        self.store.save(&snapshot)
    }

    fn load_persisted(&self) -> Option<Model> {
        let snapshot = match self.store.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                debug!("No persisted model in {:?}", self.store.model_dir());
                return None;
            }
            Err(e) => {
                warn!("Error loading models: {}", e);
                return None;
            }
        };

        match Model::from_snapshot(snapshot) {
            Ok(model) => Some(model),
            Err(e) => {
                warn!("Persisted model rejected: {}", e);
                None
            }
        }
    }

    /// Swap in `model` unless the same generation is already held.
    fn adopt(&self, model: Model) {
        let mut current = self.model.write();
        if current.as_ref().map(|m| m.generation()) != Some(model.generation()) {
            *current = Some(Arc::new(model));
        }
    }
}
