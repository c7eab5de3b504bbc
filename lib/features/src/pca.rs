//! Principal component analysis with a variance-coverage target.
//!
//! Components come from the eigendecomposition of the sample covariance
//! matrix. The number of components kept is the
//! smallest one whose cumulative explained-variance ratio reaches the
//! configured threshold.

use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2, Axis};
use schoolrec_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default share of variance the projection must retain.
pub const DEFAULT_VARIANCE_THRESHOLD: f64 = 0.95;

const RATIO_TOLERANCE: f64 = 1e-12;

/// Fitted linear projection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pca {
    mean: Array1<f64>,
    /// `n_components x n_features`, one principal axis per row.
    components: Array2<f64>,
    explained_variance: Vec<f64>,
    explained_variance_ratio: Vec<f64>,
    variance_threshold: f64,
}

impl Pca {
    pub fn fit(x: &Array2<f64>, variance_threshold: f64) -> Result<Self> {
        if !(variance_threshold > 0.0 && variance_threshold <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "variance threshold must be in (0, 1], got {variance_threshold}"
            )));
        }

        let (n_samples, n_features) = x.dim();
        if n_samples == 0 {
            return Err(Error::EmptyTable);
        }
        if n_features == 0 {
            return Err(Error::InvalidDimension {
                expected: 1,
                actual: 0,
            });
        }

        let mean = x.mean_axis(Axis(0)).ok_or(Error::EmptyTable)?;
        let centered = x - &mean;

        // Sample covariance: X^T X / (n - 1)
        let denom = n_samples.saturating_sub(1).max(1) as f64;
        let cov = centered.t().dot(&centered) / denom;

        let (eigenvalues, eigenvectors) = sorted_eigenpairs(&cov);

        let total: f64 = eigenvalues.iter().sum();
        let max_components = n_samples.min(n_features).max(1);
        let n_components = if total <= f64::EPSILON {
            1
        } else {
            let mut cumulative = 0.0;
            let mut keep = max_components;
            for (i, value) in eigenvalues.iter().take(max_components).enumerate() {
                cumulative += value / total;
                if cumulative + RATIO_TOLERANCE >= variance_threshold {
                    keep = i + 1;
                    break;
                }
            }
            keep
        };

        let mut components = Array2::zeros((n_components, n_features));
        for k in 0..n_components {
            let mut axis = eigenvectors.column(k).to_owned();
            // Largest-magnitude loading is made positive so refits are reproducible.
            let pivot = axis
                .iter()
                .copied()
                .fold(0.0_f64, |best, v| if v.abs() > best.abs() { v } else { best });
            if pivot < 0.0 {
                axis.mapv_inplace(|v| -v);
            }
            components.row_mut(k).assign(&axis);
        }

        let explained_variance: Vec<f64> = eigenvalues[..n_components].to_vec();
        let explained_variance_ratio = explained_variance
            .iter()
            .map(|v| if total > f64::EPSILON { v / total } else { 0.0 })
            .collect();

        debug!(
            n_features,
            n_components, "fitted PCA covering {:.1}% of variance", 100.0 * variance_threshold
        );

        Ok(Self {
            mean,
            components,
            explained_variance,
            explained_variance_ratio,
            variance_threshold,
        })
    }

    pub fn fit_transform(x: &Array2<f64>, variance_threshold: f64) -> Result<(Self, Array2<f64>)> {
        let pca = Self::fit(x, variance_threshold)?;
        let projected = pca.transform(x)?;
        Ok((pca, projected))
    }

    /// Project rows onto the fitted components.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features() {
            return Err(Error::InvalidDimension {
                expected: self.n_features(),
                actual: x.ncols(),
            });
        }
        Ok((x - &self.mean).dot(&self.components.t()))
    }

    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.components.ncols()
    }

    pub fn components(&self) -> &Array2<f64> {
        &self.components
    }

    pub fn explained_variance(&self) -> &[f64] {
        &self.explained_variance
    }

    pub fn explained_variance_ratio(&self) -> &[f64] {
        &self.explained_variance_ratio
    }

    pub fn variance_threshold(&self) -> f64 {
        self.variance_threshold
    }
}

/// Eigenpairs of the covariance matrix, largest eigenvalue first.
///
/// Negative eigenvalues from round-off are clamped to zero. Eigenvectors are
/// returned as unit columns.
fn sorted_eigenpairs(cov: &Array2<f64>) -> (Vec<f64>, Array2<f64>) {
    let n = cov.nrows();
    let eigen = SymmetricEigen::new(DMatrix::from_fn(n, n, |i, j| cov[[i, j]]));

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| eigen.eigenvalues[j].total_cmp(&eigen.eigenvalues[i]));

    let values = order.iter().map(|&i| eigen.eigenvalues[i].max(0.0)).collect();
    let vectors = Array2::from_shape_fn((n, n), |(row, col)| eigen.eigenvectors[(row, order[col])]);
    (values, vectors)
}
