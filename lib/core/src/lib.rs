//! # schoolrec core
//!
//! Shared types for the schoolrec workspace:
//!
//! - [`SchoolRecord`] - one school row, flat JSON shaped
//! - [`NameIndex`] - first-match name lookup
//! - [`Vector`] - dense feature vector with Euclidean helpers
//! - [`Error`] / [`Result`] - the error taxonomy used by every crate

pub mod error;
pub mod record;
pub mod vector;

pub use error::{Error, Result};
pub use record::{missing_columns, NameIndex, SchoolRecord, CATEGORICAL_ATTRIBUTES, NUMERIC_ATTRIBUTES};
pub use vector::{distance_to_similarity, l2_distance, Vector};
