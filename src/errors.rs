//! Error taxonomy for the layout pipeline.
//!
//! Precondition violations are raised before any stage runs. Non-convergence of
//! the overlap resolver is fatal: a layout with residual overlap is never
//! returned as a success.

use collage_core::CoreError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("at least 2 images are required, got {0}")]
    TooFewImages(usize),

    #[error("embedding dimension must be at least 2, got {0}")]
    EmbeddingDimension(usize),

    #[error("embedding {index} has dimension {found}, expected {expected}")]
    RaggedEmbeddings {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("image {index} has invalid aspect ratio {ratio}")]
    InvalidAspectRatio { index: usize, ratio: f64 },

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("requested {requested} clusters but only {available} points are available")]
    TooManyClusters { requested: usize, available: usize },

    #[error("overlap resolution did not converge within {iterations} iterations")]
    NonConvergence { iterations: usize },

    #[error("dimensionality reduction failed: {0}")]
    Reduction(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type LayoutResult<T> = Result<T, LayoutError>;

impl LayoutError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        LayoutError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
