//! Silhouette scores and per-cluster representative selection.
//!
//! For point `i` with mean same-cluster distance `a` and smallest mean
//! distance `b` to any other cluster, `s = (b - a) / max(a, b)`. Singleton
//! clusters score 0. The representative of a cluster is its best-assigned
//! member; ties go to the member closest to the cluster center.

use collage_core::Point2D;
use log::{debug, trace};
use rayon::prelude::*;

use crate::errors::{LayoutError, LayoutResult};

/// Silhouette coefficient of every point, in `-1..=1`.
pub fn silhouettes(points: &[Point2D], labels: &[usize], k: usize) -> Vec<f64> {
    assert_eq!(points.len(), labels.len());
    (0..points.len())
        .into_par_iter()
        .map(|i| silhouette_of(points, labels, k, i))
        .collect()
}

fn silhouette_of(points: &[Point2D], labels: &[usize], k: usize, i: usize) -> f64 {
    let mut sums = vec![0.0; k];
    let mut counts = vec![0usize; k];
    for (j, p) in points.iter().enumerate() {
        if j != i {
            sums[labels[j]] += points[i].distance(p);
            counts[labels[j]] += 1;
        }
    }

    let own = labels[i];
    if counts[own] == 0 {
        return 0.0;
    }
    let a = sums[own] / counts[own] as f64;

    let b = (0..k)
        .filter(|&c| c != own && counts[c] > 0)
        .map(|c| sums[c] / counts[c] as f64)
        .fold(f64::INFINITY, f64::min);
    if !b.is_finite() {
        return 0.0;
    }

    let denom = a.max(b);
    if denom <= 0.0 { 0.0 } else { (b - a) / denom }
}

/// Mean silhouette over all points; the K-selection quality score.
pub fn mean_silhouette(points: &[Point2D], labels: &[usize], k: usize) -> f64 {
    if points.is_empty() || k < 2 {
        return 0.0;
    }
    let s = silhouettes(points, labels, k);
    s.iter().sum::<f64>() / s.len() as f64
}

/// Representative image index for each label `0..centers.len()`.
pub fn select_representatives(
    points: &[Point2D],
    centers: &[Point2D],
    labels: &[usize],
    silhouettes: &[f64],
) -> LayoutResult<Vec<usize>> {
    let mut best: Vec<Option<usize>> = vec![None; centers.len()];

    for (i, &label) in labels.iter().enumerate() {
        let replace = match best[label] {
            None => true,
            Some(current) => {
                let (s_new, s_cur) = (silhouettes[i], silhouettes[current]);
                s_new > s_cur
                    || (s_new == s_cur
                        && points[i].distance(&centers[label])
                            < points[current].distance(&centers[label]))
            }
        };
        if replace {
            best[label] = Some(i);
        }
    }

    best.into_iter()
        .enumerate()
        .map(|(label, rep)| {
            let rep = rep.ok_or_else(|| {
                LayoutError::invalid("labels", format!("cluster {} has no members", label))
            })?;
            trace!(
                "Cluster {}: representative {} (silhouette {:.4})",
                label, rep, silhouettes[rep]
            );
            Ok(rep)
        })
        .collect::<LayoutResult<Vec<usize>>>()
        .inspect(|reps| debug!("Selected {} representatives", reps.len()))
}
