//! Numeric standardization.

use ndarray::{Array1, Array2, Axis};
use schoolrec_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Standardizes features by removing the mean and scaling to unit variance.
///
/// Statistics are computed once by [`StandardScaler::fit`] and reused
/// unchanged by every later [`StandardScaler::transform`]. Uses the
/// population standard deviation; a constant column gets scale 1.0 so it
/// maps to zeros instead of NaN.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(x: &Array2<f64>) -> Result<Self> {
        let (n_samples, _) = x.dim();
        if n_samples == 0 {
            return Err(Error::EmptyTable);
        }

        let mean = x.mean_axis(Axis(0)).ok_or(Error::EmptyTable)?;
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s.abs() < f64::EPSILON { 1.0 } else { s });

        Ok(Self { mean, scale })
    }

    pub fn fit_transform(x: &Array2<f64>) -> Result<(Self, Array2<f64>)> {
        let scaler = Self::fit(x)?;
        let scaled = scaler.transform(x)?;
        Ok((scaler, scaled))
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features() {
            return Err(Error::InvalidDimension {
                expected: self.n_features(),
                actual: x.ncols(),
            });
        }
        Ok((x - &self.mean) / &self.scale)
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn scale(&self) -> &Array1<f64> {
        &self.scale
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_zero_mean_unit_variance() {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]];
        let (scaler, scaled) = StandardScaler::fit_transform(&x).unwrap();

        assert_eq!(scaler.mean(), &array![2.5, 25.0]);
        for col in scaled.columns() {
            assert!(col.mean().unwrap().abs() < 1e-12);
            assert!((col.std(0.0) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_statistics_are_reused() {
        let train = array![[0.0], [2.0]];
        let scaler = StandardScaler::fit(&train).unwrap();
        let out = scaler.transform(&array![[4.0]]).unwrap();
        assert!((out[[0, 0]] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let x = array![[5.0], [5.0], [5.0]];
        let (scaler, scaled) = StandardScaler::fit_transform(&x).unwrap();
        assert_eq!(scaler.scale()[0], 1.0);
        assert!(scaled.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_dimension_mismatch() {
        let scaler = StandardScaler::fit(&array![[1.0, 2.0]]).unwrap();
        assert!(matches!(
            scaler.transform(&array![[1.0]]),
            Err(Error::InvalidDimension { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            StandardScaler::fit(&Array2::zeros((0, 2))),
            Err(Error::EmptyTable)
        ));
    }
}
