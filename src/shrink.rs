//! Compaction passes over a valid (overlap-free) layout.
//!
//! Every pass keeps two invariants:
//! - no pair of padded boxes overlaps after the pass;
//! - no box leaves the bounding rectangle captured when the pass starts, so
//!   the layout extent never grows.
//!
//! Each move is parameterised by a factor in `[0, 1]` where 0 is "stay put",
//! and the largest acceptable factor comes from `FactorSearch`. A pass that
//! cannot find any acceptable move leaves the layout untouched.

use std::f64::consts::TAU;

use collage_core::layout::first_overlap;
use collage_core::{Axis, FactorSearch, Layout, Point2D, Rect, SizeBox, centroid};
use log::{debug, info, trace};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::clustering::members_of;

/// Moves shorter than this are treated as no movement.
const MIN_MOVE: f64 = 1e-6;

/// Shared inputs of every pass: frozen cluster structure plus tuning.
#[derive(Clone, Debug)]
pub struct ShrinkContext<'a> {
    pub labels: &'a [usize],
    /// Image index of each cluster's representative, indexed by label
    pub representatives: &'a [usize],
    pub padding: f64,
    pub search: FactorSearch,
    /// Upper bound on repeated sweeps inside one pass
    pub max_sweeps: usize,
}

impl ShrinkContext<'_> {
    pub fn n_clusters(&self) -> usize {
        self.representatives.len()
    }
}

/// How much a pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassOutcome {
    /// Accepted moves (an image or a whole cluster, depending on the pass)
    pub moves: usize,
    pub sweeps: usize,
}

impl PassOutcome {
    pub fn is_noop(&self) -> bool {
        self.moves == 0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisMode {
    /// Scale all coordinates of one axis toward the centroid together
    #[default]
    Uniform,
    /// Slide each image along each axis toward the centroid on its own
    PerImage,
}

/// Current centroid of each cluster's members.
pub fn cluster_centroids(positions: &[Point2D], labels: &[usize], k: usize) -> Vec<Point2D> {
    let mut sums = vec![Point2D::ORIGIN; k];
    let mut counts = vec![0usize; k];
    for (p, &l) in positions.iter().zip(labels) {
        sums[l] = sums[l] + *p;
        counts[l] += 1;
    }
    sums.iter()
        .zip(&counts)
        .map(|(s, &c)| if c > 0 { *s * (1.0 / c as f64) } else { Point2D::ORIGIN })
        .collect()
}

fn within(bounds: &Rect, positions: &[Point2D], sizes: &[SizeBox]) -> bool {
    positions
        .iter()
        .zip(sizes)
        .all(|(p, s)| bounds.contains(&Rect::around(*p, *s)))
}

/// Whole-layout validity for candidates where many boxes move at once.
fn valid_candidate(bounds: &Rect, positions: &[Point2D], sizes: &[SizeBox], padding: f64) -> bool {
    within(bounds, positions, sizes) && first_overlap(positions, sizes, padding).is_none()
}

/// Single-box validity for candidates where only box `index` moves.
fn valid_single(layout: &Layout, bounds: &Rect, index: usize, at: &Point2D, padding: f64) -> bool {
    bounds.contains(&layout.rect_at(index, *at)) && !layout.collides(index, at, padding)
}

/// Slide box `index` from its position toward `target` as far as allowed.
/// Returns true if it moved.
fn slide_toward(
    layout: &mut Layout,
    bounds: &Rect,
    index: usize,
    target: Point2D,
    ctx: &ShrinkContext<'_>,
) -> bool {
    let start = layout.positions[index];
    if start.distance(&target) < MIN_MOVE {
        return false;
    }
    let frozen: &Layout = layout;
    let t = ctx.search.max_feasible(|t| {
        valid_single(frozen, bounds, index, &start.lerp(&target, t), ctx.padding)
    });
    let next = start.lerp(&target, t);
    if start.distance(&next) < MIN_MOVE {
        return false;
    }
    layout.positions[index] = next;
    true
}

/// Pull every non-representative image toward its cluster representative,
/// closest members first. Representatives stay fixed.
pub fn shrink_intra(layout: &mut Layout, ctx: &ShrinkContext<'_>) -> PassOutcome {
    let Some(bounds) = layout.bounds() else {
        return PassOutcome::default();
    };
    let mut outcome = PassOutcome::default();

    for sweep in 0..ctx.max_sweeps {
        let mut moved = 0;
        for (label, &rep) in ctx.representatives.iter().enumerate() {
            let anchor = layout.positions[rep];
            let mut members: Vec<usize> = members_of(ctx.labels, label)
                .into_iter()
                .filter(|&i| i != rep)
                .collect();
            members.sort_by(|&a, &b| {
                layout.positions[a]
                    .distance(&anchor)
                    .total_cmp(&layout.positions[b].distance(&anchor))
            });

            for i in members {
                if slide_toward(layout, &bounds, i, anchor, ctx) {
                    moved += 1;
                }
            }
        }
        outcome.sweeps = sweep + 1;
        outcome.moves += moved;
        trace!("Intra sweep {}: {} moves", sweep, moved);
        if moved == 0 {
            break;
        }
    }

    info!(
        "Intra-cluster shrink: {} moves in {} sweeps",
        outcome.moves, outcome.sweeps
    );
    outcome
}

/// Translate every cluster rigidly toward the global centroid by one shared
/// factor, the largest that keeps the layout valid.
pub fn shrink_inter_uniform(layout: &mut Layout, ctx: &ShrinkContext<'_>) -> PassOutcome {
    let k = ctx.n_clusters();
    let Some(bounds) = layout.bounds() else {
        return PassOutcome::default();
    };
    if k < 2 {
        debug!("Inter-cluster shrink skipped: single cluster");
        return PassOutcome::default();
    }

    let start = layout.positions.clone();
    let global = centroid(&start);
    let centers = cluster_centroids(&start, ctx.labels, k);
    let shifted = |t: f64| -> Vec<Point2D> {
        start
            .iter()
            .zip(ctx.labels)
            .map(|(p, &l)| *p + (global - centers[l]) * t)
            .collect()
    };

    let t = ctx
        .search
        .max_feasible(|t| valid_candidate(&bounds, &shifted(t), &layout.sizes, ctx.padding));

    let outcome = if t > 0.0 {
        layout.positions = shifted(t);
        PassOutcome { moves: k, sweeps: 1 }
    } else {
        PassOutcome { moves: 0, sweeps: 1 }
    };
    info!("Inter-cluster uniform shrink: factor {:.4}", t);
    outcome
}

/// Move each cluster toward the global centroid by its own maximal factor.
/// Clusters nearest the centre go first; sweeps repeat until nothing moves.
pub fn shrink_inter_per_cluster(layout: &mut Layout, ctx: &ShrinkContext<'_>) -> PassOutcome {
    let k = ctx.n_clusters();
    let Some(bounds) = layout.bounds() else {
        return PassOutcome::default();
    };
    if k < 2 {
        debug!("Per-cluster shrink skipped: single cluster");
        return PassOutcome::default();
    }

    let global = layout.centroid();
    let members: Vec<Vec<usize>> = (0..k).map(|c| members_of(ctx.labels, c)).collect();
    let mut outcome = PassOutcome::default();

    for sweep in 0..ctx.max_sweeps {
        let centers = cluster_centroids(&layout.positions, ctx.labels, k);
        let mut order: Vec<usize> = (0..k).collect();
        order.sort_by(|&a, &b| {
            centers[a]
                .distance(&global)
                .total_cmp(&centers[b].distance(&global))
        });

        let mut moved = 0;
        for c in order {
            // a cluster's members only move with it, so centers[c] is current
            let delta = global - centers[c];
            if delta.distance(&Point2D::ORIGIN) < MIN_MOVE {
                continue;
            }

            let start = layout.positions.clone();
            let shifted = |t: f64| -> Vec<Point2D> {
                let mut candidate = start.clone();
                for &i in &members[c] {
                    candidate[i] = start[i] + delta * t;
                }
                candidate
            };
            let t = ctx
                .search
                .max_feasible(|t| valid_candidate(&bounds, &shifted(t), &layout.sizes, ctx.padding));

            if (delta * t).distance(&Point2D::ORIGIN) >= MIN_MOVE {
                trace!("Cluster {} moved by factor {:.4}", c, t);
                layout.positions = shifted(t);
                moved += 1;
            }
        }

        outcome.sweeps = sweep + 1;
        outcome.moves += moved;
        if moved == 0 {
            break;
        }
    }

    info!(
        "Inter-cluster per-cluster shrink: {} moves in {} sweeps",
        outcome.moves, outcome.sweeps
    );
    outcome
}

/// Compact along x and y independently.
pub fn shrink_axes(layout: &mut Layout, ctx: &ShrinkContext<'_>, mode: AxisMode) -> PassOutcome {
    let Some(bounds) = layout.bounds() else {
        return PassOutcome::default();
    };
    let outcome = match mode {
        AxisMode::Uniform => shrink_axes_uniform(layout, ctx, &bounds),
        AxisMode::PerImage => shrink_axes_per_image(layout, ctx, &bounds),
    };
    info!(
        "Axis-wise shrink ({:?}): {} moves in {} sweeps",
        mode, outcome.moves, outcome.sweeps
    );
    outcome
}

fn shrink_axes_uniform(layout: &mut Layout, ctx: &ShrinkContext<'_>, bounds: &Rect) -> PassOutcome {
    let mut outcome = PassOutcome { moves: 0, sweeps: 1 };
    for axis in Axis::BOTH {
        let start = layout.positions.clone();
        let c = centroid(&start).coord(axis);
        let scaled = |t: f64| -> Vec<Point2D> {
            start
                .iter()
                .map(|p| p.with_coord(axis, c + (p.coord(axis) - c) * (1.0 - t)))
                .collect()
        };
        let t = ctx
            .search
            .max_feasible(|t| valid_candidate(bounds, &scaled(t), &layout.sizes, ctx.padding));
        debug!("Axis {:?}: shrink factor {:.4}", axis, t);
        if t > 0.0 {
            layout.positions = scaled(t);
            outcome.moves += 1;
        }
    }
    outcome
}

fn shrink_axes_per_image(
    layout: &mut Layout,
    ctx: &ShrinkContext<'_>,
    bounds: &Rect,
) -> PassOutcome {
    let mut outcome = PassOutcome::default();
    let center = layout.centroid();

    for sweep in 0..ctx.max_sweeps {
        let mut moved = 0;
        for axis in Axis::BOTH {
            let c = center.coord(axis);
            let mut order: Vec<usize> = (0..layout.len()).collect();
            order.sort_by(|&a, &b| {
                (layout.positions[a].coord(axis) - c)
                    .abs()
                    .total_cmp(&(layout.positions[b].coord(axis) - c).abs())
            });
            for i in order {
                let target = layout.positions[i].with_coord(axis, c);
                if slide_toward(layout, bounds, i, target, ctx) {
                    moved += 1;
                }
            }
        }
        outcome.sweeps = sweep + 1;
        outcome.moves += moved;
        if moved == 0 {
            break;
        }
    }
    outcome
}

/// Stochastic shake parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShakeParams {
    pub rounds: usize,
    /// Largest displacement of a single proposal, in pixels
    pub radius: f64,
}

/// Random bounded displacements, accepted only when the layout stays valid,
/// the box stays inside the bounds and the image does not drift away from
/// the layout centroid.
pub fn shake(
    layout: &mut Layout,
    ctx: &ShrinkContext<'_>,
    params: &ShakeParams,
    rng: &mut ChaCha8Rng,
) -> PassOutcome {
    let Some(bounds) = layout.bounds() else {
        return PassOutcome::default();
    };
    let mut outcome = PassOutcome::default();
    if params.radius <= 0.0 {
        return outcome;
    }

    for round in 0..params.rounds {
        let center = layout.centroid();
        let mut accepted = 0;
        for i in 0..layout.len() {
            let angle = rng.random_range(0.0..TAU);
            let r = params.radius * rng.random::<f64>().sqrt();
            let current = layout.positions[i];
            let candidate = current + Point2D::new(angle.cos(), angle.sin()) * r;

            if candidate.distance(&center) <= current.distance(&center)
                && valid_single(layout, &bounds, i, &candidate, ctx.padding)
            {
                layout.positions[i] = candidate;
                accepted += 1;
            }
        }
        trace!("Shake round {}: {} accepted", round, accepted);
        outcome.moves += accepted;
        outcome.sweeps = round + 1;
    }

    info!(
        "Shake: {} accepted moves over {} rounds",
        outcome.moves, outcome.sweeps
    );
    outcome
}
