//! # collage
//!
//! Embedding-driven layout engine for image maps. Each image is placed at a
//! 2D coordinate derived from its embedding, grouped with k-means, sized by
//! its role in the group and packed so that no two boxes overlap, while the
//! loss of pairwise-distance fidelity is scored after every compaction pass.
//!
//! ```ignore
//! use collage::{ImageInput, LayoutBuilder};
//!
//! let images: Vec<ImageInput> = load_images();
//! let output = LayoutBuilder::new()
//!     .with_padding(4.0)
//!     .with_seed(7)
//!     .build(&images)?;
//! println!("{}", output.report);
//! ```
//!
//! Geometry primitives, distance snapshots and the factor search live in
//! `collage-core` and are re-exported here.

pub mod builder;
pub mod clustering;
pub mod errors;
pub mod overlap;
pub mod reduction;
pub mod report;
pub mod shrink;
pub mod silhouette;
pub mod sizing;

pub use builder::{ImageInput, LayoutBuilder, LayoutConfig, LayoutOutput};
pub use clustering::{Clustering, KMeansParams};
pub use errors::{LayoutError, LayoutResult};
pub use report::{LayoutReport, StageKind, StageScore, StageSnapshot};

pub use collage_core::{
    Axis, CorrelationMethod, DistanceSnapshot, FactorSearch, Layout, Point2D, Rect, SizeBox,
};

#[cfg(test)]
mod tests;
