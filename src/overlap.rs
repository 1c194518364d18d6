//! Radial inflation until no two padded boxes overlap.
//!
//! All positions are scaled away from their common centroid by a constant
//! factor per iteration. Distances grow geometrically while box sizes stay
//! fixed, so any layout without coincident points separates in finitely many
//! steps. Coincident points are spread on a small ring first, since scaling
//! alone can never pull them apart.

use collage_core::{Layout, Point2D};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::{LayoutError, LayoutResult};

/// Golden angle in radians, spaces ring offsets evenly.
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

/// Ring radius for coincident points, as a fraction of the smallest box side.
const COINCIDENT_SPREAD: f64 = 0.05;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverlapResolver {
    pub padding: f64,
    /// Multiplicative inflation per iteration, must exceed 1
    pub factor: f64,
    /// Safety cap; exceeding it is a fatal `NonConvergence`
    pub max_iters: usize,
}

impl Default for OverlapResolver {
    fn default() -> Self {
        Self {
            padding: 2.0,
            factor: 1.05,
            max_iters: 10_000,
        }
    }
}

impl OverlapResolver {
    /// Inflate `layout` in place; returns the number of inflation steps.
    pub fn resolve(&self, layout: &mut Layout) -> LayoutResult<usize> {
        if !(self.factor.is_finite() && self.factor > 1.0) {
            return Err(LayoutError::invalid(
                "inflation_factor",
                format!("must be a finite value above 1, got {}", self.factor),
            ));
        }
        if !(self.padding.is_finite() && self.padding >= 0.0) {
            return Err(LayoutError::invalid(
                "padding",
                format!("must be finite and non-negative, got {}", self.padding),
            ));
        }

        let spread = spread_coincident(layout);
        if spread > 0 {
            debug!("Spread {} coincident positions", spread);
        }

        let center = layout.centroid();
        let mut iterations = 0;
        while layout.has_overlap(self.padding) {
            if iterations >= self.max_iters {
                warn!(
                    "Overlap still present after {} inflation steps",
                    iterations
                );
                return Err(LayoutError::NonConvergence { iterations });
            }
            for p in layout.positions.iter_mut() {
                *p = center + (*p - center) * self.factor;
            }
            iterations += 1;
        }

        info!("Overlap resolved in {} iterations", iterations);
        Ok(iterations)
    }
}

/// Give every duplicate position a distinct offset on a golden-angle spiral
/// around the shared spot. Returns how many positions moved.
pub fn spread_coincident(layout: &mut Layout) -> usize {
    let n = layout.len();
    if n < 2 {
        return 0;
    }
    let smallest = layout
        .sizes
        .iter()
        .map(|s| s.shortest_side())
        .fold(f64::INFINITY, f64::min);
    let radius = if smallest.is_finite() && smallest > 0.0 {
        smallest * COINCIDENT_SPREAD
    } else {
        1.0
    };

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        let (pa, pb) = (layout.positions[a], layout.positions[b]);
        pa.x.total_cmp(&pb.x).then(pa.y.total_cmp(&pb.y))
    });

    let mut moved = 0;
    let mut run_start = 0;
    while run_start < n {
        let anchor = layout.positions[order[run_start]];
        let mut run_end = run_start + 1;
        while run_end < n && layout.positions[order[run_end]] == anchor {
            run_end += 1;
        }
        for (m, &idx) in order[run_start + 1..run_end].iter().enumerate() {
            let step = (m + 1) as f64;
            let angle = step * GOLDEN_ANGLE;
            let r = radius * step.sqrt();
            layout.positions[idx] = anchor + Point2D::new(angle.cos(), angle.sin()) * r;
            moved += 1;
        }
        run_start = run_end;
    }
    moved
}
