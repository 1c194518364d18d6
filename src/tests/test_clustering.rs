//! Test suite for the clustering module.
//!
//! Tests cover:
//! - nearest centroid and distinct-point helpers
//! - single Lloyd runs and restarts
//! - automatic K selection on separated blobs
//! - K preconditions and degenerate inputs
//! - re-seeding of an emptied cluster

use std::collections::HashSet;

use collage_core::Point2D;
use log::debug;

use crate::clustering::*;
use crate::errors::LayoutError;
use crate::tests::init;
use crate::tests::test_data::{blobs_2d, two_blobs, two_label_agreement};

fn assert_dense(clustering: &Clustering, n: usize) {
    assert_eq!(clustering.labels.len(), n);
    assert_eq!(clustering.centers.len(), clustering.k);
    let used: HashSet<usize> = clustering.labels.iter().copied().collect();
    assert_eq!(used, (0..clustering.k).collect::<HashSet<_>>());
}

// -------------------- Helpers --------------------

#[test]
fn test_nearest_centroid_middle() {
    let centers = vec![
        Point2D::new(0.0, 0.0),
        Point2D::new(5.0, 5.0),
        Point2D::new(10.0, 10.0),
    ];
    let (idx, d2) = nearest_centroid(&Point2D::new(4.9, 5.1), &centers);
    assert_eq!(idx, 1);
    assert!(d2 < 0.03);
}

#[test]
fn test_count_distinct() {
    let points = vec![
        Point2D::new(1.0, 1.0),
        Point2D::new(1.0, 1.0),
        Point2D::new(2.0, 1.0),
        Point2D::new(1.0, 2.0),
    ];
    assert_eq!(count_distinct(&points), 3);
    assert_eq!(count_distinct(&[]), 0);
}

// -------------------- Lloyd --------------------

#[test]
fn test_kmeans_lloyd_three_blobs() {
    init();
    let centers = [
        Point2D::new(0.0, 0.0),
        Point2D::new(20.0, 0.0),
        Point2D::new(10.0, 20.0),
    ];
    let (points, truth) = blobs_2d(&centers, 30, 1.0, 42);
    let clustering = kmeans(&points, 3, &KMeansParams::default());
    assert_dense(&clustering, points.len());
    assert_eq!(clustering.k, 3);

    // every true blob maps onto a single label
    for blob in 0..3 {
        let labels: HashSet<usize> = truth
            .iter()
            .zip(&clustering.labels)
            .filter(|(t, _)| **t == blob)
            .map(|(_, l)| *l)
            .collect();
        assert_eq!(labels.len(), 1, "blob {} was split", blob);
    }
    assert_eq!(clustering.cluster_sizes(), vec![30, 30, 30]);
}

#[test]
fn test_kmeans_lloyd_is_deterministic() {
    init();
    let (points, _) = two_blobs(25, 7);
    let a = kmeans_lloyd(&points, 4, 50, 99);
    let b = kmeans_lloyd(&points, 4, 50, 99);
    assert_eq!(a, b);
}

#[test]
fn test_kmeans_lloyd_zero_iterations_still_labels() {
    init();
    let (points, _) = two_blobs(10, 3);
    let clustering = kmeans_lloyd(&points, 2, 0, 1);
    assert_dense(&clustering, points.len());
}

#[test]
fn test_kmeans_caps_k_to_points() {
    init();
    let points = vec![Point2D::new(0.0, 0.0), Point2D::new(1.0, 0.0)];
    let clustering = kmeans_lloyd(&points, 5, 10, 0);
    assert_eq!(clustering.k, 2);
    assert_dense(&clustering, 2);
}

#[test]
fn test_restarts_never_worse_than_single_run() {
    init();
    let (points, _) = blobs_2d(
        &[
            Point2D::new(0.0, 0.0),
            Point2D::new(6.0, 0.0),
            Point2D::new(3.0, 5.0),
            Point2D::new(9.0, 5.0),
        ],
        15,
        1.5,
        17,
    );
    let params = KMeansParams::default();
    let best = kmeans(&points, 4, &params);
    let first = kmeans_lloyd(&points, 4, params.max_iter, params.seed + 4 * 1000);
    assert!(best.inertia <= first.inertia + 1e-9);
}

// -------------------- Automatic K --------------------

#[test]
fn test_auto_k_two_blobs() {
    init();
    let (points, truth) = two_blobs(20, 42);
    let clustering = cluster_points(&points, None, 10, &KMeansParams::default()).unwrap();

    debug!("labels: {:?}", clustering.labels);
    assert_eq!(clustering.k, 2);
    assert_dense(&clustering, points.len());
    let agreement = two_label_agreement(&clustering.labels, &truth);
    assert!(agreement >= 0.95, "agreement {:.3}", agreement);
}

#[test]
fn test_auto_k_finds_four_blobs() {
    init();
    let centers = [
        Point2D::new(0.0, 0.0),
        Point2D::new(30.0, 0.0),
        Point2D::new(0.0, 30.0),
        Point2D::new(30.0, 30.0),
    ];
    let (points, _) = blobs_2d(&centers, 12, 1.0, 5);
    let clustering = auto_select_k(&points, 8, &KMeansParams::default());
    assert_eq!(clustering.k, 4);
}

#[test]
fn test_auto_k_bounded_by_distinct_points() {
    init();
    let mut points = vec![Point2D::new(0.0, 0.0); 6];
    points.extend(vec![Point2D::new(5.0, 5.0); 6]);
    let clustering = auto_select_k(&points, 10, &KMeansParams::default());
    assert_eq!(clustering.k, 2);
}

#[test]
fn test_auto_k_all_identical_gives_one_cluster() {
    init();
    let points = vec![Point2D::new(3.0, 3.0); 5];
    let clustering = cluster_points(&points, None, 10, &KMeansParams::default()).unwrap();
    assert_eq!(clustering.k, 1);
    assert!(clustering.labels.iter().all(|&l| l == 0));
    assert_eq!(clustering.inertia, 0.0);
}

// -------------------- Preconditions --------------------

#[test]
fn test_supplied_k_larger_than_n() {
    init();
    let (points, _) = two_blobs(3, 1);
    let err = cluster_points(&points, Some(7), 10, &KMeansParams::default()).unwrap_err();
    assert_eq!(
        err,
        LayoutError::TooManyClusters {
            requested: 7,
            available: 6
        }
    );
}

#[test]
fn test_supplied_k_zero() {
    init();
    let (points, _) = two_blobs(3, 1);
    assert!(matches!(
        cluster_points(&points, Some(0), 10, &KMeansParams::default()),
        Err(LayoutError::InvalidParameter { name: "n_clusters", .. })
    ));
}

#[test]
fn test_supplied_k_capped_to_distinct() {
    init();
    let mut points = vec![Point2D::new(0.0, 0.0); 4];
    points.push(Point2D::new(1.0, 1.0));
    let clustering = cluster_points(&points, Some(4), 10, &KMeansParams::default()).unwrap();
    assert_eq!(clustering.k, 2);
    assert_dense(&clustering, points.len());
}

#[test]
fn test_members_match_labels() {
    init();
    let (points, _) = two_blobs(8, 4);
    let clustering = cluster_points(&points, Some(2), 10, &KMeansParams::default()).unwrap();
    let total: usize = (0..clustering.k).map(|c| clustering.members(c).len()).sum();
    assert_eq!(total, points.len());
    for c in 0..clustering.k {
        assert!(clustering.members(c).iter().all(|&i| clustering.labels[i] == c));
    }
}

#[test]
fn test_reseed_empty_takes_farthest_spare_point() {
    init();
    let points = vec![
        Point2D::new(0.0, 0.0),
        Point2D::new(1.0, 0.0),
        Point2D::new(10.0, 0.0),
        Point2D::new(40.0, 40.0),
    ];
    // point 3 sits far from its center but is the only member of cluster 2
    let mut labels = vec![0, 0, 0, 2];
    let mut counts = vec![3, 0, 1];
    let mut centers = vec![
        Point2D::new(11.0 / 3.0, 0.0),
        Point2D::new(-100.0, -100.0),
        Point2D::new(0.0, 0.0),
    ];

    reseed_empty(&points, &mut centers, &mut labels, &mut counts, 1);

    assert_eq!(counts, vec![2, 1, 1]);
    assert_eq!(labels, vec![0, 0, 1, 2]);
    assert_eq!(centers[1], points[2]);
    assert_eq!(centers[0], Point2D::new(11.0 / 3.0, 0.0));
    assert!(counts.iter().all(|&c| c > 0));
}
