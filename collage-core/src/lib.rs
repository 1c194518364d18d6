// collage-core/src/lib.rs
//! Geometry, distance snapshots and bounded factor search for the collage
//! layout engine.
//!
//! Everything here is pure: no stage ordering, no configuration, no RNG.

pub mod distance;
pub mod geometry;
pub mod layout;
pub mod search;

pub use distance::{CoreError, CorrelationMethod, DistanceSnapshot};
pub use geometry::{Axis, Point2D, Rect, SizeBox, boxes_overlap, centroid};
pub use layout::Layout;
pub use search::FactorSearch;


#[cfg(test)]
pub(crate) fn init() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let env = env_logger::Env::default().default_filter_or("debug");
        let _ = env_logger::Builder::from_env(env).is_test(true).try_init();
    });
}
