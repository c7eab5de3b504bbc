//! # schoolrec engine
//!
//! Model lifecycle and similarity queries.
//!
//! - [`Engine`] - loads records, fits or reuses the persisted model, answers queries
//! - [`Model`] - one immutable fitted generation
//! - [`RetrainWorker`] - runs retrains on a background thread
//! - [`RecordSource`] - where the record table comes from
//!
//! ## Example
//!
//! ```rust,no_run
//! use schoolrec_engine::{Engine, EngineConfig, JsonFileSource};
//!
//! let engine = Engine::new(EngineConfig::new("models"), JsonFileSource::new("schools.json"))?;
//! engine.retrain(false)?;
//! for rec in engine.get_recommendations(&["Riverside Academy".to_string()], 5)? {
//!     println!("{} ({:.3})", rec.record.name, rec.similarity_score);
//! }
//! # Ok::<(), schoolrec_core::Error>(())
//! ```

pub mod background;
pub mod config;
pub mod engine;
pub mod model;
pub mod query;
pub mod source;

pub use background::{RetrainTicket, RetrainWorker};
pub use config::EngineConfig;
pub use engine::{Engine, EngineState, FitOutcome, ModelInfo};
pub use model::Model;
pub use query::{rank, recommend, score_all, Recommendation};
pub use source::{JsonFileSource, RecordSource, StaticSource};
