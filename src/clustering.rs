//! K-means clustering of the reduced 2D points, with automatic K selection.
//!
//! This module provides:
//! - `kmeans_lloyd`: one seeded Lloyd run (k-means++ start, empty-cluster
//!   re-seeding, iteration cap)
//! - `kmeans`: best of several restarts by inertia
//! - `auto_select_k`: pure search over a small K range maximising the mean
//!   silhouette
//! - `cluster_points`: entry point applying the K preconditions
//!
//! **DETERMINISTIC**: every random choice derives from `KMeansParams::seed`.

use collage_core::Point2D;
use log::{debug, info, trace, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::errors::{LayoutError, LayoutResult};
use crate::silhouette::mean_silhouette;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct KMeansParams {
    /// Lloyd iterations per run
    pub max_iter: usize,
    /// Independent restarts, lowest inertia wins
    pub n_init: usize,
    pub seed: u64,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            max_iter: 100,
            n_init: 5,
            seed: 128,
        }
    }
}

/// Output of the clustering stage: centers and dense labels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Clustering {
    pub k: usize,
    /// Centroid of each cluster at clustering time
    pub centers: Vec<Point2D>,
    /// One label per point, dense in `0..k`
    pub labels: Vec<usize>,
    /// Sum of squared distances to the assigned center
    pub inertia: f64,
}

impl Clustering {
    /// Number of points per label.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k];
        for &l in &self.labels {
            sizes[l] += 1;
        }
        sizes
    }

    pub fn members(&self, label: usize) -> Vec<usize> {
        members_of(&self.labels, label)
    }

    fn single(points: &[Point2D]) -> Self {
        let center = collage_core::centroid(points);
        Self {
            k: 1,
            centers: vec![center],
            labels: vec![0; points.len()],
            inertia: points.iter().map(|p| p.squared_distance(&center)).sum(),
        }
    }
}

/// Linear-scan nearest center helper: returns (index, squared_distance).
pub fn nearest_centroid(point: &Point2D, centers: &[Point2D]) -> (usize, f64) {
    let mut best_idx = 0;
    let mut best_dist2 = f64::INFINITY;
    for (i, c) in centers.iter().enumerate() {
        let d2 = point.squared_distance(c);
        if d2 < best_dist2 {
            best_dist2 = d2;
            best_idx = i;
        }
    }
    (best_idx, best_dist2)
}

/// Number of distinct coordinates in `points`.
pub fn count_distinct(points: &[Point2D]) -> usize {
    let mut sorted: Vec<Point2D> = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    sorted.dedup();
    sorted.len()
}

/// k-means++ seeding: first center uniform, then proportional to D².
fn kmeans_plus_plus(points: &[Point2D], k: usize, rng: &mut ChaCha8Rng) -> Vec<Point2D> {
    let n = points.len();
    let mut centers = Vec::with_capacity(k);
    centers.push(points[rng.random_range(0..n)]);

    while centers.len() < k {
        let d2: Vec<f64> = points
            .iter()
            .map(|p| nearest_centroid(p, &centers).1)
            .collect();
        let total: f64 = d2.iter().sum();

        let next = if total <= 0.0 {
            rng.random_range(0..n)
        } else {
            let mut target = rng.random::<f64>() * total;
            let mut chosen = n - 1;
            for (i, w) in d2.iter().enumerate() {
                if target < *w {
                    chosen = i;
                    break;
                }
                target -= w;
            }
            chosen
        };
        centers.push(points[next]);
    }
    centers
}

/// Perform one K-Means run using Lloyd's algorithm
///
/// # Arguments
/// * `points` - 2D input points
/// * `k` - Number of clusters (capped to the number of points)
/// * `max_iter` - Maximum iterations for convergence
/// * `seed` - Random seed for reproducibility
///
/// An empty cluster is re-seeded at the point farthest from its current
/// center, so no centroid is ever computed from zero members.
pub fn kmeans_lloyd(points: &[Point2D], k: usize, max_iter: usize, seed: u64) -> Clustering {
    let n = points.len();
    let k = k.min(n).max(1);
    if k == 1 {
        return Clustering::single(points);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut centers = kmeans_plus_plus(points, k, &mut rng);
    let mut labels = vec![usize::MAX; n];

    for iter in 0..max_iter.max(1) {
        let mut changed = false;
        for (i, p) in points.iter().enumerate() {
            let (best, _) = nearest_centroid(p, &centers);
            if labels[i] != best {
                labels[i] = best;
                changed = true;
            }
        }
        if !changed {
            trace!("Lloyd converged after {} iterations", iter);
            break;
        }

        let mut sums = vec![Point2D::ORIGIN; k];
        let mut counts = vec![0usize; k];
        for (p, &l) in points.iter().zip(&labels) {
            sums[l] = sums[l] + *p;
            counts[l] += 1;
        }

        for c in 0..k {
            if counts[c] > 0 {
                centers[c] = sums[c] * (1.0 / counts[c] as f64);
            }
        }

        for c in 0..k {
            if counts[c] == 0 {
                reseed_empty(points, &mut centers, &mut labels, &mut counts, c);
            }
        }
    }

    finalize(points, centers, labels)
}

/// Indices carrying `label`, in ascending order.
pub fn members_of(labels: &[usize], label: usize) -> Vec<usize> {
    labels
        .iter()
        .enumerate()
        .filter(|(_, l)| **l == label)
        .map(|(i, _)| i)
        .collect()
}

/// Move the point farthest from its center (in a cluster with spare members)
/// into empty cluster `c`.
pub(crate) fn reseed_empty(
    points: &[Point2D],
    centers: &mut [Point2D],
    labels: &mut [usize],
    counts: &mut [usize],
    c: usize,
) {
    let farthest = points
        .iter()
        .enumerate()
        .filter(|(i, _)| counts[labels[*i]] > 1)
        .map(|(i, p)| (i, p.squared_distance(&centers[labels[i]])))
        .max_by(|a, b| a.1.total_cmp(&b.1));

    if let Some((i, d2)) = farthest {
        debug!(
            "Re-seeding empty cluster {} at point {} (dist²={:.4})",
            c, i, d2
        );
        counts[labels[i]] -= 1;
        labels[i] = c;
        counts[c] = 1;
        centers[c] = points[i];
    }
}

/// Recompute centers from the final labels and make labels dense.
fn finalize(points: &[Point2D], centers: Vec<Point2D>, labels: Vec<usize>) -> Clustering {
    let k = centers.len();
    let mut sums = vec![Point2D::ORIGIN; k];
    let mut counts = vec![0usize; k];
    for (p, &l) in points.iter().zip(&labels) {
        sums[l] = sums[l] + *p;
        counts[l] += 1;
    }

    // relabel to 0..k' skipping clusters that ended empty
    let mut remap = vec![usize::MAX; k];
    let mut dense_centers = Vec::with_capacity(k);
    for c in 0..k {
        if counts[c] > 0 {
            remap[c] = dense_centers.len();
            dense_centers.push(sums[c] * (1.0 / counts[c] as f64));
        }
    }
    if dense_centers.len() < k {
        warn!(
            "{} clusters ended empty and were dropped",
            k - dense_centers.len()
        );
    }

    let labels: Vec<usize> = labels.iter().map(|&l| remap[l]).collect();
    let inertia = points
        .iter()
        .zip(&labels)
        .map(|(p, &l)| p.squared_distance(&dense_centers[l]))
        .sum();

    Clustering {
        k: dense_centers.len(),
        centers: dense_centers,
        labels,
        inertia,
    }
}

/// Best of `params.n_init` Lloyd runs by inertia.
pub fn kmeans(points: &[Point2D], k: usize, params: &KMeansParams) -> Clustering {
    (0..params.n_init.max(1))
        .map(|trial| {
            // Derive unique seed: base + k*1000 + trial
            let trial_seed = params
                .seed
                .wrapping_add((k as u64) * 1000)
                .wrapping_add(trial as u64);
            kmeans_lloyd(points, k, params.max_iter, trial_seed)
        })
        .min_by(|a, b| a.inertia.total_cmp(&b.inertia))
        .unwrap_or_else(|| Clustering::single(points))
}

/// Evaluate K in `2..=k_max` and keep the clustering with the highest mean
/// silhouette. Ties prefer the smaller K.
pub fn auto_select_k(points: &[Point2D], k_max: usize, params: &KMeansParams) -> Clustering {
    let k_max = k_max.min(count_distinct(points));
    if k_max < 2 {
        debug!("Fewer than 2 distinct points, using a single cluster");
        return Clustering::single(points);
    }

    let mut best: Option<(f64, Clustering)> = None;
    for k in 2..=k_max {
        let candidate = kmeans(points, k, params);
        let score = mean_silhouette(points, &candidate.labels, candidate.k);
        debug!(
            "K={}: mean silhouette={:.4}, inertia={:.4}",
            k, score, candidate.inertia
        );
        let better = match &best {
            Some((best_score, _)) => score > *best_score,
            None => true,
        };
        if better {
            best = Some((score, candidate));
        }
    }

    match best {
        Some((score, clustering)) => {
            info!(
                "Selected K={} (mean silhouette {:.4})",
                clustering.k, score
            );
            clustering
        }
        None => Clustering::single(points),
    }
}

/// Cluster `points` into `k` groups, or an automatically chosen number when
/// `k` is `None`.
pub fn cluster_points(
    points: &[Point2D],
    k: Option<usize>,
    max_auto_k: usize,
    params: &KMeansParams,
) -> LayoutResult<Clustering> {
    let n = points.len();
    if n == 0 {
        return Err(LayoutError::TooFewImages(0));
    }

    let clustering = match k {
        Some(0) => return Err(LayoutError::invalid("n_clusters", "must be at least 1")),
        Some(k) if k > n => {
            return Err(LayoutError::TooManyClusters {
                requested: k,
                available: n,
            });
        }
        Some(k) => {
            let distinct = count_distinct(points);
            let k = if k > distinct {
                warn!(
                    "Requested K={} but only {} distinct points, capping",
                    k, distinct
                );
                distinct
            } else {
                k
            };
            kmeans(points, k, params)
        }
        None => auto_select_k(points, max_auto_k, params),
    };

    info!(
        "Clustering complete: {} clusters over {} points",
        clustering.k, n
    );
    Ok(clustering)
}
