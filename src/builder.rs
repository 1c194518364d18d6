//! Layout builder and pipeline driver.
//!
//! `LayoutBuilder` collects the configuration with consuming `with_*` setters
//! and `build` runs the whole pipeline over a set of images:
//!
//! 1. precondition checks (nothing runs on invalid input)
//! 2. optional shuffle of the input order
//! 3. reduction to 2D (PCA + SMACOF) or seeded random placement
//! 4. clustering, silhouettes and representative selection
//! 5. sizing and initial positions
//! 6. overlap resolution, which produces the scoring baseline
//! 7. the enabled compaction passes, each followed by a distance snapshot
//! 8. scoring of every snapshot against the baseline

use std::fmt;

use collage_core::{CorrelationMethod, DistanceSnapshot, FactorSearch, Layout, Point2D};
use log::{debug, info, warn};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::clustering::{Clustering, KMeansParams, cluster_points};
use crate::errors::{LayoutError, LayoutResult};
use crate::overlap::OverlapResolver;
use crate::reduction::{StressMajorization, random_placement, reduce_to_2d, validate_embeddings};
use crate::report::{LayoutReport, StageKind, StageSnapshot, score_stages};
use crate::shrink::{
    AxisMode, ShakeParams, ShrinkContext, shake, shrink_axes, shrink_inter_per_cluster,
    shrink_inter_uniform, shrink_intra,
};
use crate::silhouette::{select_representatives, silhouettes};
use crate::sizing::{Sizer, initial_positions, validate_aspect_ratios};

/// Shake radius as a fraction of `base_size` when none is set explicitly.
pub const SHAKE_RADIUS_FRACTION: f64 = 0.25;

/// One image as seen by the layout engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageInput {
    /// width / height
    pub aspect_ratio: f64,
    pub embedding: Vec<f64>,
}

impl ImageInput {
    pub fn new(aspect_ratio: f64, embedding: Vec<f64>) -> Self {
        Self {
            aspect_ratio,
            embedding,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    // stage toggles
    pub shuffle: bool,
    /// false replaces the reducer with seeded random placement
    pub reduce: bool,
    pub intra: bool,
    pub inter: bool,
    pub axis: bool,
    pub shake: bool,
    pub finalize: bool,

    // sizing
    pub base_size: f64,
    pub representative_scale: f64,
    pub member_scale: f64,
    /// Minimum gap between two boxes, in pixels
    pub padding: f64,

    // clustering
    pub n_clusters: Option<usize>,
    pub max_auto_k: usize,
    pub kmeans_max_iter: usize,
    pub kmeans_n_init: usize,

    // reduction
    pub smacof_max_iter: usize,
    pub smacof_tolerance: f64,

    // overlap and compaction
    pub inflation_factor: f64,
    pub max_inflation_iters: usize,
    pub max_sweeps: usize,
    pub shake_rounds: usize,
    /// `None` means `base_size * SHAKE_RADIUS_FRACTION`
    pub shake_radius: Option<f64>,

    pub correlation: CorrelationMethod,
    pub seed: u64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            shuffle: false,
            reduce: true,
            intra: true,
            inter: true,
            axis: true,
            shake: true,
            finalize: true,
            base_size: 200.0,
            representative_scale: 2.0,
            member_scale: 1.0,
            padding: 2.0,
            n_clusters: None,
            max_auto_k: 10,
            kmeans_max_iter: 100,
            kmeans_n_init: 5,
            smacof_max_iter: 300,
            smacof_tolerance: 1e-3,
            inflation_factor: 1.05,
            max_inflation_iters: 10_000,
            max_sweeps: 50,
            shake_rounds: 10,
            shake_radius: None,
            correlation: CorrelationMethod::Pearson,
            seed: 42,
        }
    }
}

fn positive(name: &'static str, value: f64) -> LayoutResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(LayoutError::invalid(
            name,
            format!("must be finite and positive, got {}", value),
        ))
    }
}

impl LayoutConfig {
    /// Check every numeric parameter for a run over `n_images` images.
    pub fn validate(&self, n_images: usize) -> LayoutResult<()> {
        positive("base_size", self.base_size)?;
        positive("representative_scale", self.representative_scale)?;
        positive("member_scale", self.member_scale)?;
        if !(self.padding.is_finite() && self.padding >= 0.0) {
            return Err(LayoutError::invalid(
                "padding",
                format!("must be finite and non-negative, got {}", self.padding),
            ));
        }
        if !(self.inflation_factor.is_finite() && self.inflation_factor > 1.0) {
            return Err(LayoutError::invalid(
                "inflation_factor",
                format!("must be a finite value above 1, got {}", self.inflation_factor),
            ));
        }
        if self.max_auto_k < 2 {
            return Err(LayoutError::invalid("max_auto_k", "must be at least 2"));
        }
        if let Some(radius) = self.shake_radius {
            if !(radius.is_finite() && radius >= 0.0) {
                return Err(LayoutError::invalid(
                    "shake_radius",
                    format!("must be finite and non-negative, got {}", radius),
                ));
            }
        }
        match self.n_clusters {
            Some(0) => Err(LayoutError::invalid("n_clusters", "must be at least 1")),
            Some(k) if k > n_images => Err(LayoutError::TooManyClusters {
                requested: k,
                available: n_images,
            }),
            _ => Ok(()),
        }
    }

    pub fn effective_shake_radius(&self) -> f64 {
        self.shake_radius
            .unwrap_or(self.base_size * SHAKE_RADIUS_FRACTION)
    }

    fn sizer(&self) -> Sizer {
        Sizer {
            base_size: self.base_size,
            representative_scale: self.representative_scale,
            member_scale: self.member_scale,
        }
    }

    fn resolver(&self) -> OverlapResolver {
        OverlapResolver {
            padding: self.padding,
            factor: self.inflation_factor,
            max_iters: self.max_inflation_iters,
        }
    }

    fn kmeans_params(&self) -> KMeansParams {
        KMeansParams {
            max_iter: self.kmeans_max_iter,
            n_init: self.kmeans_n_init,
            seed: self.seed,
        }
    }

    fn smacof(&self) -> StressMajorization {
        StressMajorization {
            max_iter: self.smacof_max_iter,
            tolerance: self.smacof_tolerance,
        }
    }
}

/// Everything a run produces. All per-image vectors are indexed by layout
/// slot; `order[slot]` is the input index placed in that slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutOutput {
    pub layout: Layout,
    pub order: Vec<usize>,
    /// Reduced coordinates before any pixel scaling
    pub points_2d: Vec<Point2D>,
    pub clustering: Clustering,
    /// Image slot of each cluster's representative, indexed by label
    pub representatives: Vec<usize>,
    pub silhouettes: Vec<f64>,
    pub stages: Vec<StageSnapshot>,
    pub report: LayoutReport,
}

impl LayoutOutput {
    pub fn labels(&self) -> &[usize] {
        &self.clustering.labels
    }

    pub fn centers(&self) -> &[Point2D] {
        &self.clustering.centers
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutBuilder {
    config: LayoutConfig,
}

impl LayoutBuilder {
    pub fn new() -> Self {
        info!("Initializing new LayoutBuilder");
        Self::default()
    }

    pub fn from_config(config: LayoutConfig) -> Self {
        info!("Initializing LayoutBuilder from config");
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        info!("Setting input shuffle: {}", shuffle);
        self.config.shuffle = shuffle;
        self
    }

    /// Disable to place points at random instead of reducing embeddings.
    pub fn with_reduction(mut self, reduce: bool) -> Self {
        info!("Setting embedding reduction: {}", reduce);
        self.config.reduce = reduce;
        self
    }

    /// Toggle the compaction passes: intra-cluster, inter-cluster, axis-wise,
    /// shake and the finalize sequence.
    pub fn with_passes(
        mut self,
        intra: bool,
        inter: bool,
        axis: bool,
        shake: bool,
        finalize: bool,
    ) -> Self {
        info!(
            "Configuring passes: intra={}, inter={}, axis={}, shake={}, finalize={}",
            intra, inter, axis, shake, finalize
        );
        self.config.intra = intra;
        self.config.inter = inter;
        self.config.axis = axis;
        self.config.shake = shake;
        self.config.finalize = finalize;
        self
    }

    pub fn with_base_size(mut self, base_size: f64) -> Self {
        info!("Setting base image size: {}", base_size);
        self.config.base_size = base_size;
        self
    }

    /// Size multipliers for cluster representatives and for other members.
    pub fn with_scales(mut self, representative: f64, member: f64) -> Self {
        info!(
            "Setting size multipliers: representative={}, member={}",
            representative, member
        );
        self.config.representative_scale = representative;
        self.config.member_scale = member;
        self
    }

    pub fn with_padding(mut self, padding: f64) -> Self {
        info!("Setting padding: {}", padding);
        self.config.padding = padding;
        self
    }

    /// Force the number of clusters. Without it K is chosen automatically.
    pub fn with_n_clusters(mut self, k: usize) -> Self {
        info!("Setting manual n_clusters: {}", k);
        self.config.n_clusters = Some(k);
        self
    }

    pub fn with_max_auto_k(mut self, max_k: usize) -> Self {
        info!("Setting max_auto_k: {}", max_k);
        self.config.max_auto_k = max_k;
        self
    }

    pub fn with_kmeans(mut self, max_iter: usize, n_init: usize) -> Self {
        info!("Configuring k-means: max_iter={}, n_init={}", max_iter, n_init);
        self.config.kmeans_max_iter = max_iter;
        self.config.kmeans_n_init = n_init;
        self
    }

    pub fn with_smacof(mut self, max_iter: usize, tolerance: f64) -> Self {
        info!(
            "Configuring stress majorization: max_iter={}, tolerance={:e}",
            max_iter, tolerance
        );
        self.config.smacof_max_iter = max_iter;
        self.config.smacof_tolerance = tolerance;
        self
    }

    pub fn with_inflation(mut self, factor: f64, max_iters: usize) -> Self {
        info!(
            "Configuring overlap inflation: factor={}, max_iters={}",
            factor, max_iters
        );
        self.config.inflation_factor = factor;
        self.config.max_inflation_iters = max_iters;
        self
    }

    pub fn with_max_sweeps(mut self, max_sweeps: usize) -> Self {
        info!("Setting max sweeps per pass: {}", max_sweeps);
        self.config.max_sweeps = max_sweeps;
        self
    }

    pub fn with_shake(mut self, rounds: usize, radius: Option<f64>) -> Self {
        info!("Configuring shake: rounds={}, radius={:?}", rounds, radius);
        self.config.shake_rounds = rounds;
        self.config.shake_radius = radius;
        self
    }

    pub fn with_correlation(mut self, method: CorrelationMethod) -> Self {
        info!("Setting distortion correlation: {}", method);
        self.config.correlation = method;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        info!("Setting seed: {}", seed);
        self.config.seed = seed;
        self
    }

    // -------------------- Build --------------------

    /// Run the full pipeline. Preconditions are checked before any stage runs;
    /// the returned layout never contains an overlapping pair.
    pub fn build(&self, images: &[ImageInput]) -> LayoutResult<LayoutOutput> {
        let cfg = &self.config;
        let n = images.len();
        if n < 2 {
            return Err(LayoutError::TooFewImages(n));
        }
        let aspect_ratios: Vec<f64> = images.iter().map(|img| img.aspect_ratio).collect();
        validate_aspect_ratios(&aspect_ratios)?;
        let embeddings: Vec<Vec<f64>> = images.iter().map(|img| img.embedding.clone()).collect();
        if cfg.reduce {
            validate_embeddings(&embeddings)?;
        }
        cfg.validate(n)?;

        info!("Building layout for {} images: {}", n, self);

        // ---- input order ----
        let mut order: Vec<usize> = (0..n).collect();
        if cfg.shuffle {
            let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed.wrapping_add(1));
            order.shuffle(&mut rng);
            debug!("Shuffled input order");
        }
        let aspect_ratios: Vec<f64> = order.iter().map(|&i| aspect_ratios[i]).collect();
        let embeddings: Vec<Vec<f64>> = order.iter().map(|&i| embeddings[i].clone()).collect();

        // ---- 2D coordinates ----
        let points_2d = if cfg.reduce {
            reduce_to_2d(&embeddings, &cfg.smacof())?
        } else {
            random_placement(n, cfg.seed)
        };

        // ---- clusters and representatives ----
        let clustering = cluster_points(
            &points_2d,
            cfg.n_clusters,
            cfg.max_auto_k,
            &cfg.kmeans_params(),
        )?;
        let scores = silhouettes(&points_2d, &clustering.labels, clustering.k);
        let representatives = select_representatives(
            &points_2d,
            &clustering.centers,
            &clustering.labels,
            &scores,
        )?;

        // ---- sizes, positions, overlap ----
        let sizes = cfg
            .sizer()
            .size_all(&aspect_ratios, &clustering.labels, &representatives);
        let positions = initial_positions(&points_2d, cfg.base_size);
        let mut layout = Layout::new(positions, sizes);
        let overlap_iterations = cfg.resolver().resolve(&mut layout)?;

        let mut stages = Vec::new();
        record(&mut stages, StageKind::Resolved, &layout);

        // ---- compaction ----
        let ctx = ShrinkContext {
            labels: &clustering.labels,
            representatives: &representatives,
            padding: cfg.padding,
            search: FactorSearch::default(),
            max_sweeps: cfg.max_sweeps,
        };

        if cfg.intra {
            shrink_intra(&mut layout, &ctx);
            record(&mut stages, StageKind::Intra, &layout);
        }
        if cfg.inter {
            shrink_inter_uniform(&mut layout, &ctx);
            record(&mut stages, StageKind::InterUniform, &layout);
            shrink_inter_per_cluster(&mut layout, &ctx);
            record(&mut stages, StageKind::InterPerCluster, &layout);
        }
        if cfg.axis {
            // one tight pair blocks a whole-axis rescale, so images then slide
            // along each axis on their own
            shrink_axes(&mut layout, &ctx, AxisMode::Uniform);
            shrink_axes(&mut layout, &ctx, AxisMode::PerImage);
            record(&mut stages, StageKind::Axis, &layout);
        }
        if cfg.shake {
            let params = ShakeParams {
                rounds: cfg.shake_rounds,
                radius: cfg.effective_shake_radius(),
            };
            let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed.wrapping_add(2));
            let outcome = shake(&mut layout, &ctx, &params, &mut rng);
            if outcome.is_noop() {
                warn!("Shake accepted no moves");
            }
            record(&mut stages, StageKind::Shake, &layout);
        }
        if cfg.finalize {
            shrink_axes(&mut layout, &ctx, AxisMode::Uniform);
            record(&mut stages, StageKind::FinalAxis, &layout);
            shrink_axes(&mut layout, &ctx, AxisMode::PerImage);
            record(&mut stages, StageKind::FinalAxisFine, &layout);
            if cfg.inter {
                shrink_inter_per_cluster(&mut layout, &ctx);
                record(&mut stages, StageKind::FinalInter, &layout);
            }
        }
        debug_assert!(!layout.has_overlap(cfg.padding));

        // ---- scoring ----
        let report = LayoutReport {
            n_images: n,
            n_clusters: clustering.k,
            cluster_sizes: clustering.cluster_sizes(),
            overlap_iterations,
            correlation: cfg.correlation,
            scores: score_stages(&stages, cfg.correlation)?,
        };
        info!(
            "Layout complete: {} clusters, extent {:.0}, final score {:.3}",
            clustering.k,
            layout.extent_area(),
            report.final_score().unwrap_or(1.0)
        );

        Ok(LayoutOutput {
            layout,
            order,
            points_2d,
            clustering,
            representatives,
            silhouettes: scores,
            stages,
            report,
        })
    }
}

fn record(stages: &mut Vec<StageSnapshot>, stage: StageKind, layout: &Layout) {
    let extent = layout.extent_area();
    debug!("Snapshot after {}: extent {:.0}", stage, extent);
    stages.push(StageSnapshot {
        stage,
        snapshot: DistanceSnapshot::capture(&layout.positions),
        extent,
    });
}

impl fmt::Display for LayoutBuilder {
    /// Comma-separated `key=value` pairs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.config;
        write!(
            f,
            "shuffle={}, \
             reduce={}, \
             intra={}, \
             inter={}, \
             axis={}, \
             shake={}, \
             finalize={}, \
             base_size={}, \
             representative_scale={}, \
             member_scale={}, \
             padding={}, \
             n_clusters={}, \
             max_auto_k={}, \
             inflation_factor={}, \
             max_inflation_iters={}, \
             max_sweeps={}, \
             kmeans_max_iter={}, \
             kmeans_n_init={}, \
             smacof_max_iter={}, \
             smacof_tolerance={}, \
             shake_rounds={}, \
             shake_radius={}, \
             correlation={}, \
             seed={}",
            c.shuffle,
            c.reduce,
            c.intra,
            c.inter,
            c.axis,
            c.shake,
            c.finalize,
            c.base_size,
            c.representative_scale,
            c.member_scale,
            c.padding,
            c.n_clusters.map_or("None".to_string(), |v| v.to_string()),
            c.max_auto_k,
            c.inflation_factor,
            c.max_inflation_iters,
            c.max_sweeps,
            c.kmeans_max_iter,
            c.kmeans_n_init,
            c.smacof_max_iter,
            c.smacof_tolerance,
            c.shake_rounds,
            c.shake_radius.map_or("None".to_string(), |v| v.to_string()),
            c.correlation,
            c.seed
        )
    }
}
