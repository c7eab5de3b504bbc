//! Nearest-neighbour queries over a fitted model.
//!
//! The input schools are blended into one query vector (their mean), every
//! school in the corpus is scored by `1 / (1 + euclidean distance)`, and
//! the inputs themselves are filtered out by name.

use crate::model::Model;
use ahash::AHashSet;
use rayon::prelude::*;
use schoolrec_core::{distance_to_similarity, Error, Result, SchoolRecord, Vector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// One recommended school.
///
/// Serializes flat: every record field, plus `id` (row index) and
/// `similarity_score`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    #[serde(flatten)]
    pub record: SchoolRecord,
    pub id: String,
    pub similarity_score: f64,
}

impl Recommendation {
    /// `id` and `similarity_score` replace any record fields of the same name.
    pub fn new(mut record: SchoolRecord, row: usize, similarity_score: f64) -> Self {
        record.fields.remove("id");
        record.fields.remove("similarity_score");
        Self {
            record,
            id: row.to_string(),
            similarity_score,
        }
    }
}

/// Rank the corpus against the mean vector of `school_names`.
pub fn recommend(model: &Model, school_names: &[String], n: usize) -> Result<Vec<Recommendation>> {
    info!("Getting recommendations for schools: {:?}", school_names);

    if school_names.is_empty() {
        return Err(Error::InvalidInput("school_names must be a non-empty list".to_string()));
    }
    if n == 0 {
        return Err(Error::InvalidInput("n_recommendations must be positive".to_string()));
    }

    let mut input_rows = Vec::with_capacity(school_names.len());
    for name in school_names {
        match model.index().resolve(name) {
            Some(idx) => {
                debug!("Found index {} for school {}", idx, name);
                input_rows.push(idx);
            }
            None => warn!("School not found: {}", name),
        }
    }

    let query = Vector::mean_of(input_rows.iter().map(|&idx| model.row(idx)))
        .ok_or_else(|| Error::SchoolsNotFound(school_names.to_vec()))?;

    let similarities = score_all(model, &query);
    let ranked = rank(&similarities);

    let excluded: AHashSet<&str> = school_names.iter().map(String::as_str).collect();
    let records = model.records();
    let recommendations: Vec<Recommendation> = ranked
        .into_iter()
        .filter(|&idx| !excluded.contains(records[idx].name.as_str()))
        .take(n)
        .map(|idx| Recommendation::new(records[idx].clone(), idx, similarities[idx]))
        .collect();

    info!("Generated {} recommendations", recommendations.len());
    Ok(recommendations)
}

/// Similarity of every row to `query`, in row order.
pub fn score_all(model: &Model, query: &Vector) -> Vec<f64> {
    (0..model.len())
        .into_par_iter()
        .map(|idx| distance_to_similarity(query.l2_distance(model.row(idx))))
        .collect()
}

/// Row indices ordered by descending similarity. Ties keep row order.
pub fn rank(similarities: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..similarities.len()).collect();
    order.sort_by(|&a, &b| similarities[b].total_cmp(&similarities[a]));
    order
}
