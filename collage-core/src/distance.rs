// collage-core/src/distance.rs
//! Distance metrics and layout-fidelity scoring
//!
//! Implements:
//! - Euclidean distance for raw embedding rows
//! - Dense pairwise distance matrices (used by the stress refinement)
//! - `DistanceSnapshot`: all pairwise distances of a layout at one stage
//! - Pearson and Spearman correlation between two snapshots
//!
//! A snapshot is never fed back into a layout; it only exists to measure how
//! much a compaction stage bent the relative geometry of the baseline.

use std::fmt;
use std::str::FromStr;

use log::{debug, trace};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Point2D;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("distance snapshots differ in size: {left} vs {right}")]
    SnapshotMismatch { left: usize, right: usize },
}

/// Euclidean L2 distance between two equal-length rows
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Full N×N distance matrix, row-major.
///
/// # Performance
/// - Memory: O(N²)
/// - Time: O(N²D), rows computed in parallel
pub fn pairwise_euclidean(rows: &[Vec<f64>]) -> Vec<f64> {
    let n = rows.len();
    debug!("Computing {}x{} pairwise distance matrix", n, n);
    (0..n)
        .into_par_iter()
        .flat_map_iter(|i| (0..n).map(move |j| (i, j)))
        .map(|(i, j)| if i == j { 0.0 } else { euclidean(&rows[i], &rows[j]) })
        .collect()
}

/// Pairwise distances of a layout at one pipeline stage (upper triangle,
/// `i < j`, row-major).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistanceSnapshot {
    n_points: usize,
    distances: Vec<f64>,
}

impl DistanceSnapshot {
    pub fn capture(positions: &[Point2D]) -> Self {
        let n = positions.len();
        let distances: Vec<f64> = (0..n)
            .into_par_iter()
            .flat_map_iter(|i| ((i + 1)..n).map(move |j| positions[i].distance(&positions[j])))
            .collect();
        trace!("Captured snapshot of {} distances", distances.len());
        Self {
            n_points: n,
            distances,
        }
    }

    pub fn n_points(&self) -> usize {
        self.n_points
    }

    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.distances
    }

    /// Similarity of `other` to `self` under `method`, 1.0 = same relative geometry.
    pub fn compare(
        &self,
        other: &DistanceSnapshot,
        method: CorrelationMethod,
    ) -> Result<f64, CoreError> {
        if self.len() != other.len() {
            return Err(CoreError::SnapshotMismatch {
                left: self.len(),
                right: other.len(),
            });
        }
        Ok(method.correlate(&self.distances, &other.distances))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrelationMethod {
    #[default]
    Pearson,
    Spearman,
}

impl CorrelationMethod {
    pub fn correlate(&self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            CorrelationMethod::Pearson => pearson(a, b),
            CorrelationMethod::Spearman => spearman(a, b),
        }
    }
}

impl FromStr for CorrelationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pearson" => Ok(CorrelationMethod::Pearson),
            "spearman" => Ok(CorrelationMethod::Spearman),
            other => Err(format!("unknown correlation method `{}`", other)),
        }
    }
}

impl fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationMethod::Pearson => write!(f, "pearson"),
            CorrelationMethod::Spearman => write!(f, "spearman"),
        }
    }
}

/// Pearson linear correlation.
///
/// Zero-variance input has no defined correlation. Two constant sequences
/// keep the same relative geometry (a uniform rescale) and score 1.0; one
/// constant sequence against a varying one scores 0.0.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len());
    let n = a.len();
    if n == 0 {
        return 1.0;
    }

    let mean_a = a.iter().sum::<f64>() / n as f64;
    let mean_b = b.iter().sum::<f64>() / n as f64;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        let da = x - mean_a;
        let db = y - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    // variance relative to magnitude, so rounding noise in equal distances
    // does not count as spread
    let flat_a = var_a <= f64::EPSILON * (1.0 + mean_a * mean_a * n as f64);
    let flat_b = var_b <= f64::EPSILON * (1.0 + mean_b * mean_b * n as f64);
    match (flat_a, flat_b) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        (false, false) => {}
    }
    (cov / (var_a.sqrt() * var_b.sqrt())).clamp(-1.0, 1.0)
}

/// Spearman rank correlation (Pearson over average ranks).
pub fn spearman(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len());
    pearson(&average_ranks(a), &average_ranks(b))
}

/// Ranks starting at 1; tied values share the mean of their ranks.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end share rank mean((start+1)..=end)
        let rank = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }
    ranks
}
