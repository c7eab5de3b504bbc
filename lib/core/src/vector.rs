use serde::{Deserialize, Serialize};

/// A dense vector of feature values
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vector {
    data: Vec<f64>,
}

impl Vector {
    #[inline]
    #[must_use]
    pub fn new(data: Vec<f64>) -> Self {
        Self { data }
    }

    #[inline]
    #[must_use]
    pub fn from_slice(data: &[f64]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Compute L2 (Euclidean) distance
    #[inline]
    pub fn l2_distance(&self, other: &[f64]) -> f64 {
        l2_distance(&self.data, other)
    }

    /// Arithmetic mean of equally sized rows. `None` when `rows` is empty.
    pub fn mean_of<'a, I>(rows: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a [f64]>,
    {
        let mut iter = rows.into_iter();
        let first = iter.next()?;
        let mut sum = first.to_vec();
        let mut count = 1usize;

        for row in iter {
            for (acc, x) in sum.iter_mut().zip(row) {
                *acc += x;
            }
            count += 1;
        }

        let inv = 1.0 / count as f64;
        for x in &mut sum {
            *x *= inv;
        }
        Some(Self::new(sum))
    }
}

/// Euclidean distance between two slices. Mismatched lengths are infinitely far apart.
#[inline]
pub fn l2_distance(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Map a distance onto (0, 1]: `1 / (1 + d)`.
#[inline]
pub fn distance_to_similarity(distance: f64) -> f64 {
    1.0 / (1.0 + distance)
}
