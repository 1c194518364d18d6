// collage-core/src/layout.rs
//! Layout state threaded through the positioning and compaction stages
//!
//! A `Layout` pairs one centre and one box per image, indexed like the image
//! collection. Validity queries use a sort-and-sweep over x so that a full
//! overlap check does not touch pairs that are already separated horizontally.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::geometry::{OVERLAP_TOLERANCE, Point2D, Rect, SizeBox, boxes_overlap, centroid};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub positions: Vec<Point2D>,
    pub sizes: Vec<SizeBox>,
}

impl Layout {
    pub fn new(positions: Vec<Point2D>, sizes: Vec<SizeBox>) -> Self {
        assert_eq!(
            positions.len(),
            sizes.len(),
            "positions and sizes must be indexed identically"
        );
        Self { positions, sizes }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn centroid(&self) -> Point2D {
        centroid(&self.positions)
    }

    /// Rectangle covered by box `index` if it were centred on `at`.
    pub fn rect_at(&self, index: usize, at: Point2D) -> Rect {
        Rect::around(at, self.sizes[index])
    }

    /// Union of all (unpadded) image boxes, `None` for an empty layout.
    pub fn bounds(&self) -> Option<Rect> {
        bounds_of(&self.positions, &self.sizes)
    }

    /// Area of the bounding rectangle of all boxes.
    pub fn extent_area(&self) -> f64 {
        self.bounds().map(|r| r.area()).unwrap_or(0.0)
    }

    /// True if any pair of padded boxes overlaps.
    pub fn has_overlap(&self, padding: f64) -> bool {
        first_overlap(&self.positions, &self.sizes, padding).is_some()
    }

    /// First overlapping pair found by the sweep, if any.
    pub fn first_overlap(&self, padding: f64) -> Option<(usize, usize)> {
        first_overlap(&self.positions, &self.sizes, padding)
    }

    /// True if box `index`, moved to `candidate`, would overlap any other box.
    pub fn collides(&self, index: usize, candidate: &Point2D, padding: f64) -> bool {
        let size = &self.sizes[index];
        self.positions
            .iter()
            .zip(&self.sizes)
            .enumerate()
            .any(|(j, (p, s))| j != index && boxes_overlap(candidate, size, p, s, padding))
    }
}

/// Bounding rectangle of boxes centred on `positions`.
pub fn bounds_of(positions: &[Point2D], sizes: &[SizeBox]) -> Option<Rect> {
    positions
        .iter()
        .zip(sizes)
        .map(|(p, s)| Rect::around(*p, *s))
        .reduce(|acc, r| acc.union(&r))
}

/// Sort-and-sweep overlap search over arbitrary position/size slices.
///
/// Boxes are visited in increasing x; the inner scan stops once the horizontal
/// gap exceeds what the widest box could still bridge.
pub fn first_overlap(
    positions: &[Point2D],
    sizes: &[SizeBox],
    padding: f64,
) -> Option<(usize, usize)> {
    let n = positions.len();
    if n < 2 {
        return None;
    }
    let widest = sizes.iter().map(|s| s.width).fold(0.0, f64::max);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| positions[a].x.total_cmp(&positions[b].x));

    for (rank, &i) in order.iter().enumerate() {
        let reach = (sizes[i].width + widest) / 2.0 + padding + OVERLAP_TOLERANCE;
        for &j in &order[rank + 1..] {
            if positions[j].x - positions[i].x >= reach {
                break;
            }
            if boxes_overlap(&positions[i], &sizes[i], &positions[j], &sizes[j], padding) {
                trace!("overlap between {} and {}", i, j);
                return Some((i.min(j), i.max(j)));
            }
        }
    }
    None
}
