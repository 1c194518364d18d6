use approx::assert_relative_eq;
use collage_core::Point2D;

use crate::errors::LayoutError;
use crate::reduction::*;
use crate::tests::init;
use crate::tests::test_data::blob_embeddings;

#[test]
fn test_validate_too_few_rows() {
    init();
    let err = validate_embeddings(&[vec![1.0, 2.0]]).unwrap_err();
    assert_eq!(err, LayoutError::TooFewImages(1));
}

#[test]
fn test_validate_dimension_one() {
    init();
    let err = validate_embeddings(&[vec![1.0], vec![2.0]]).unwrap_err();
    assert_eq!(err, LayoutError::EmbeddingDimension(1));
}

#[test]
fn test_validate_ragged_rows() {
    init();
    let rows = vec![vec![1.0, 2.0, 3.0], vec![1.0, 2.0, 3.0], vec![1.0, 2.0]];
    let err = validate_embeddings(&rows).unwrap_err();
    assert_eq!(
        err,
        LayoutError::RaggedEmbeddings {
            index: 2,
            expected: 3,
            found: 2
        }
    );
}

#[test]
fn test_validate_non_finite() {
    init();
    let rows = vec![vec![1.0, 2.0], vec![f64::NAN, 0.0]];
    assert!(matches!(
        validate_embeddings(&rows),
        Err(LayoutError::InvalidParameter { name: "embeddings", .. })
    ));
}

#[test]
fn test_pca_preserves_planar_distances() {
    init();
    // points on a tilted plane inside 3D: the top two components span it
    let rows: Vec<Vec<f64>> = (0..12)
        .map(|i| {
            let u = (i % 4) as f64;
            let v = (i / 4) as f64 * 1.5;
            vec![u, v, 0.5 * u - 0.25 * v]
        })
        .collect();
    let points = pca_2d(&rows).unwrap();
    assert_eq!(points.len(), rows.len());

    for i in 0..rows.len() {
        for j in (i + 1)..rows.len() {
            let original = collage_core::distance::euclidean(&rows[i], &rows[j]);
            assert_relative_eq!(points[i].distance(&points[j]), original, epsilon = 1e-6);
        }
    }
}

#[test]
fn test_smacof_does_not_increase_stress() {
    init();
    let (rows, _) = blob_embeddings(3, 10, 8, 6.0, 1.0, 11);
    let dissim = collage_core::distance::pairwise_euclidean(&rows);
    let init_points = pca_2d(&rows).unwrap();
    let before = raw_stress(&dissim, &init_points);

    let (refined, after) = StressMajorization::default().refine(&dissim, init_points);
    assert_eq!(refined.len(), rows.len());
    assert!(after <= before + 1e-9, "stress grew: {} -> {}", before, after);
    assert_relative_eq!(after, raw_stress(&dissim, &refined), epsilon = 1e-9);
}

#[test]
fn test_smacof_zero_iterations_is_identity() {
    init();
    let (rows, _) = blob_embeddings(2, 5, 4, 5.0, 1.0, 3);
    let dissim = collage_core::distance::pairwise_euclidean(&rows);
    let init_points = pca_2d(&rows).unwrap();
    let smacof = StressMajorization {
        max_iter: 0,
        tolerance: 1e-3,
    };
    let (refined, _) = smacof.refine(&dissim, init_points.clone());
    assert_eq!(refined, init_points);
}

#[test]
fn test_reduce_keeps_blobs_apart() {
    init();
    let (rows, truth) = blob_embeddings(2, 15, 10, 12.0, 0.5, 5);
    let points = reduce_to_2d(&rows, &StressMajorization::default()).unwrap();

    let mut intra = (0.0, 0);
    let mut inter = (0.0, 0);
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            let d = points[i].distance(&points[j]);
            if truth[i] == truth[j] {
                intra = (intra.0 + d, intra.1 + 1);
            } else {
                inter = (inter.0 + d, inter.1 + 1);
            }
        }
    }
    let mean_intra = intra.0 / intra.1 as f64;
    let mean_inter = inter.0 / inter.1 as f64;
    assert!(
        mean_inter > 3.0 * mean_intra,
        "blobs collapsed: intra {:.3}, inter {:.3}",
        mean_intra,
        mean_inter
    );
}

#[test]
fn test_reduce_is_deterministic() {
    init();
    let (rows, _) = blob_embeddings(3, 6, 5, 4.0, 1.0, 21);
    let a = reduce_to_2d(&rows, &StressMajorization::default()).unwrap();
    let b = reduce_to_2d(&rows, &StressMajorization::default()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_random_placement_unit_square() {
    init();
    let points = random_placement(50, 9);
    assert_eq!(points.len(), 50);
    assert!(
        points
            .iter()
            .all(|p| (0.0..1.0).contains(&p.x) && (0.0..1.0).contains(&p.y))
    );
    assert_eq!(points, random_placement(50, 9));
    assert_ne!(points, random_placement(50, 10));
    assert_ne!(points[0], Point2D::ORIGIN);
}
