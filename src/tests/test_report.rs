use approx::assert_relative_eq;
use collage_core::{CorrelationMethod, DistanceSnapshot, Point2D};

use crate::errors::LayoutError;
use crate::report::*;
use crate::tests::init;

fn snapshot(stage: StageKind, positions: &[Point2D]) -> StageSnapshot {
    StageSnapshot {
        stage,
        snapshot: DistanceSnapshot::capture(positions),
        extent: 0.0,
    }
}

#[test]
fn test_stage_kind_round_trip_names() {
    for stage in [
        StageKind::Resolved,
        StageKind::Intra,
        StageKind::InterUniform,
        StageKind::InterPerCluster,
        StageKind::Axis,
        StageKind::Shake,
        StageKind::FinalAxis,
        StageKind::FinalAxisFine,
        StageKind::FinalInter,
    ] {
        assert_eq!(stage.to_string().parse::<StageKind>(), Ok(stage));
    }
    assert!("squash".parse::<StageKind>().is_err());
}

#[test]
fn test_baseline_scores_one() {
    init();
    let positions = vec![
        Point2D::new(0.0, 0.0),
        Point2D::new(3.0, 1.0),
        Point2D::new(-2.0, 5.0),
        Point2D::new(4.0, -4.0),
    ];
    let stages = vec![snapshot(StageKind::Resolved, &positions)];
    let scores = score_stages(&stages, CorrelationMethod::Pearson).unwrap();
    assert_eq!(scores.len(), 1);
    assert_relative_eq!(scores[0].score, 1.0, epsilon = 1e-12);
}

#[test]
fn test_uniform_scaling_keeps_perfect_score() {
    init();
    let positions = vec![
        Point2D::new(0.0, 0.0),
        Point2D::new(3.0, 1.0),
        Point2D::new(-2.0, 5.0),
        Point2D::new(4.0, -4.0),
    ];
    let scaled: Vec<Point2D> = positions.iter().map(|p| *p * 0.5).collect();
    let stages = vec![
        snapshot(StageKind::Resolved, &positions),
        snapshot(StageKind::Axis, &scaled),
    ];
    for method in [CorrelationMethod::Pearson, CorrelationMethod::Spearman] {
        let scores = score_stages(&stages, method).unwrap();
        assert_relative_eq!(scores[1].score, 1.0, epsilon = 1e-9);
    }
}

#[test]
fn test_distortion_lowers_score() {
    init();
    let positions = vec![
        Point2D::new(0.0, 0.0),
        Point2D::new(1.0, 0.0),
        Point2D::new(10.0, 0.0),
        Point2D::new(11.0, 0.0),
    ];
    let shuffled = vec![
        Point2D::new(0.0, 0.0),
        Point2D::new(10.0, 0.0),
        Point2D::new(1.0, 0.0),
        Point2D::new(11.0, 0.0),
    ];
    let stages = vec![
        snapshot(StageKind::Resolved, &positions),
        snapshot(StageKind::Shake, &shuffled),
    ];
    let scores = score_stages(&stages, CorrelationMethod::Pearson).unwrap();
    assert!(scores[1].score < 0.5);
}

#[test]
fn test_mismatched_snapshots() {
    init();
    let stages = vec![
        snapshot(StageKind::Resolved, &[Point2D::ORIGIN, Point2D::new(1.0, 0.0)]),
        snapshot(
            StageKind::Intra,
            &[Point2D::ORIGIN, Point2D::new(1.0, 0.0), Point2D::new(0.0, 1.0)],
        ),
    ];
    assert!(matches!(
        score_stages(&stages, CorrelationMethod::Pearson),
        Err(LayoutError::Core(_))
    ));
}

#[test]
fn test_empty_stages() {
    assert!(
        score_stages(&[], CorrelationMethod::Spearman)
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_report_display() {
    let report = LayoutReport {
        n_images: 5,
        n_clusters: 2,
        cluster_sizes: vec![3, 2],
        overlap_iterations: 17,
        correlation: CorrelationMethod::Pearson,
        scores: vec![
            StageScore {
                stage: StageKind::Resolved,
                score: 1.0,
                extent: 1000.0,
            },
            StageScore {
                stage: StageKind::Intra,
                score: 0.91234,
                extent: 800.0,
            },
        ],
    };
    let text = report.to_string();
    assert!(text.contains("clusters: 2"));
    assert!(text.contains("sizes of clusters: 3, 2"));
    assert!(text.contains("overlap resolved in 17 iterations"));
    assert!(text.contains("0.912"));
    assert!(text.contains("1.000"));
    assert_eq!(report.stage_scores().len(), 1);
    assert_eq!(report.final_score(), Some(0.91234));
}
