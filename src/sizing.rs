//! On-canvas box sizes and initial pixel positions.

use collage_core::{Point2D, SizeBox, centroid};
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::{LayoutError, LayoutResult};

/// Size policy: the longer side of every box is `base_size` times a role
/// multiplier; the shorter side follows the image's aspect ratio.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sizer {
    pub base_size: f64,
    pub representative_scale: f64,
    pub member_scale: f64,
}

impl Default for Sizer {
    fn default() -> Self {
        Self {
            base_size: 200.0,
            representative_scale: 2.0,
            member_scale: 1.0,
        }
    }
}

impl Sizer {
    /// One box per image. Image `i` is drawn at the representative scale iff
    /// it is the representative of its own cluster.
    pub fn size_all(
        &self,
        aspect_ratios: &[f64],
        labels: &[usize],
        representatives: &[usize],
    ) -> Vec<SizeBox> {
        assert_eq!(aspect_ratios.len(), labels.len());
        let sizes: Vec<SizeBox> = aspect_ratios
            .iter()
            .zip(labels)
            .enumerate()
            .map(|(i, (&ratio, &label))| {
                let scale = if representatives[label] == i {
                    self.representative_scale
                } else {
                    self.member_scale
                };
                SizeBox::from_aspect_ratio(ratio, self.base_size * scale)
            })
            .collect();
        debug!(
            "Sized {} images ({} representatives at {:.2}x)",
            sizes.len(),
            representatives.len(),
            self.representative_scale
        );
        sizes
    }
}

/// Reject non-positive or non-finite aspect ratios.
pub fn validate_aspect_ratios(aspect_ratios: &[f64]) -> LayoutResult<()> {
    match aspect_ratios
        .iter()
        .position(|r| !r.is_finite() || *r <= 0.0)
    {
        Some(index) => Err(LayoutError::InvalidAspectRatio {
            index,
            ratio: aspect_ratios[index],
        }),
        None => Ok(()),
    }
}

/// Mean distance from each point to its nearest non-coincident neighbour,
/// `None` when every point coincides.
pub fn mean_nearest_neighbour(points: &[Point2D]) -> Option<f64> {
    let nearest: Vec<f64> = (0..points.len())
        .into_par_iter()
        .filter_map(|i| {
            points
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, p)| points[i].distance(p))
                .filter(|d| *d > 1e-12)
                .min_by(|a, b| a.total_cmp(b))
        })
        .collect();

    if nearest.is_empty() {
        None
    } else {
        Some(nearest.iter().sum::<f64>() / nearest.len() as f64)
    }
}

/// Map reduced coordinates to canvas pixels: centred on the origin and
/// scaled so that the mean nearest-neighbour spacing is one `base_size`.
pub fn initial_positions(points: &[Point2D], base_size: f64) -> Vec<Point2D> {
    let center = centroid(points);
    let scale = match mean_nearest_neighbour(points) {
        Some(spacing) => base_size / spacing,
        None => 1.0,
    };
    info!(
        "Initial positions: {} points, scale {:.4} px/unit",
        points.len(),
        scale
    );
    points.iter().map(|p| (*p - center) * scale).collect()
}
