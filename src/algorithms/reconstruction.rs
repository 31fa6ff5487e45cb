//! Position reconstruction: distance matrix to canonical 2-D coordinates
//!
//! Pure function of the matrix, the canonicalization parameters and the
//! reconstruction configuration. Rows of the embedding follow the matrix's
//! anchor order throughout, and identical inputs give identical output.

use crate::algorithms::canonical::{canonicalize, CanonicalParams};
use crate::algorithms::hull::{convex_hull, hull_angle, HullAngleAveraging, HullError};
use crate::algorithms::mds::{smacof, MdsConfig, MdsError};
use crate::core::{AnchorId, Position2, MIN_LAYOUT_ANCHORS};
use crate::matrix::{DistanceMatrix, MissingDistancePolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Reasons a layout cannot be produced; callers fall back to the raw matrix
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconstructionError {
    #[error("only {usable} anchors have usable distances, {required} required")]
    InsufficientAnchors { usable: usize, required: usize },
    #[error("degenerate layout: {reason}")]
    Degenerate { reason: String },
    #[error("embedding failed: {0}")]
    Embedding(#[from] MdsError),
    #[error("zero anchor {anchor} is not part of the layout")]
    ZeroAnchorNotPlaced { anchor: AnchorId },
    #[error("reconstruction produced non-finite coordinates")]
    NonFinite,
}

impl ReconstructionError {
    /// Whether the geometry, rather than the parameters, prevents a layout
    pub fn is_degenerate(&self) -> bool {
        matches!(
            self,
            ReconstructionError::InsufficientAnchors { .. }
                | ReconstructionError::Degenerate { .. }
                | ReconstructionError::NonFinite
        )
    }
}

impl From<HullError> for ReconstructionError {
    fn from(error: HullError) -> Self {
        ReconstructionError::Degenerate {
            reason: error.to_string(),
        }
    }
}

pub type ReconstructionResult<T> = Result<T, ReconstructionError>;

/// Embedding and normalization settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionConfig {
    pub mds: MdsConfig,
    pub missing_distances: MissingDistancePolicy,
    pub hull_averaging: HullAngleAveraging,
}

/// Reconstructed, canonicalized anchor coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    /// Coordinates in matrix anchor order
    pub positions: Vec<(AnchorId, Position2)>,
    /// Anchors left out of the embedding for lack of distances
    pub unplaced: Vec<AnchorId>,
    /// Hull-derived normalization angle, degrees in [0, 90)
    pub normalization_angle_deg: f64,
    /// Raw stress of the chosen embedding
    pub stress: f64,
}

impl Layout {
    pub fn position(&self, anchor: AnchorId) -> Option<Position2> {
        self.positions.iter().find(|(id, _)| *id == anchor).map(|(_, p)| *p)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Reconstruct canonical coordinates from the current matrix
pub fn reconstruct(
    matrix: &DistanceMatrix,
    params: &CanonicalParams,
    config: &ReconstructionConfig,
) -> ReconstructionResult<Layout> {
    let usable = matrix.usable_anchors();
    if usable.len() < MIN_LAYOUT_ANCHORS {
        return Err(ReconstructionError::InsufficientAnchors {
            usable: usable.len(),
            required: MIN_LAYOUT_ANCHORS,
        });
    }

    let full = matrix.square_matrix();
    let (placed, dissimilarities, weights) = match config.missing_distances {
        MissingDistancePolicy::ZeroFill => (matrix.anchors().to_vec(), full, None),
        MissingDistancePolicy::Exclude => {
            let rows: Vec<usize> = usable.iter().filter_map(|id| matrix.index_of(*id)).collect();
            let mask = matrix.measured_mask();
            (
                usable.clone(),
                full.select_rows(&rows).select_columns(&rows),
                Some(mask.select_rows(&rows).select_columns(&rows)),
            )
        }
    };
    let unplaced: Vec<AnchorId> = matrix
        .anchors()
        .iter()
        .copied()
        .filter(|id| !placed.contains(id))
        .collect();

    let embedding = smacof(&dissimilarities, weights.as_ref(), &config.mds)?;
    let points: Vec<(f64, f64)> = (0..placed.len()).map(|i| embedding.point(i)).collect();

    let hull = convex_hull(&points)?;
    let angle = hull_angle(&points, &hull, config.hull_averaging);
    debug!(
        anchors = placed.len(),
        hull_vertices = hull.len(),
        angle_deg = angle.to_degrees(),
        stress = embedding.stress,
        "embedding normalized"
    );

    let embedded: Vec<(AnchorId, Position2)> = placed
        .iter()
        .zip(&points)
        .map(|(&id, &(x, y))| (id, Position2::new(x, y)))
        .collect();
    let positions = canonicalize(&embedded, angle, params)?;

    if positions.iter().any(|(_, p)| !p.is_finite()) {
        return Err(ReconstructionError::NonFinite);
    }

    Ok(Layout {
        positions,
        unplaced,
        normalization_angle_deg: angle.to_degrees(),
        stress: embedding.stress,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn matrix_from(points: &[(u64, f64, f64)]) -> DistanceMatrix {
        let mut matrix = DistanceMatrix::new();
        for &(a, ax, ay) in points {
            matrix.ensure_anchor(AnchorId(a));
            for &(b, bx, by) in points {
                if a != b {
                    let d = ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt().round() as u64;
                    matrix.record(AnchorId(a), AnchorId(b), d);
                }
            }
        }
        matrix
    }

    fn rotated(points: &[(u64, f64, f64)], degrees: f64, reflect: bool) -> Vec<(u64, f64, f64)> {
        let (s, c) = degrees.to_radians().sin_cos();
        points
            .iter()
            .map(|&(id, x, y)| {
                let x = if reflect { -x } else { x };
                (id, x * c - y * s, x * s + y * c)
            })
            .collect()
    }

    fn triangle_matrix() -> DistanceMatrix {
        let mut matrix = DistanceMatrix::new();
        let (a, b, c) = (AnchorId(1), AnchorId(2), AnchorId(3));
        for (x, y, d) in [(a, b, 3000), (a, c, 4000), (b, c, 5000)] {
            matrix.record(x, y, d);
            matrix.record(y, x, d);
        }
        matrix
    }

    fn square() -> Vec<(u64, f64, f64)> {
        vec![
            (1, 0.0, 0.0),
            (2, 4000.0, 0.0),
            (3, 4000.0, 4000.0),
            (4, 0.0, 4000.0),
        ]
    }

    fn signed_area(layout: &Layout) -> f64 {
        let p: Vec<Position2> = layout.positions.iter().map(|(_, p)| *p).collect();
        (p[1].x - p[0].x) * (p[2].y - p[0].y) - (p[1].y - p[0].y) * (p[2].x - p[0].x)
    }

    #[test]
    fn test_right_triangle_distances_preserved() {
        let layout = reconstruct(&triangle_matrix(), &CanonicalParams::default(), &ReconstructionConfig::default())
            .unwrap();

        let a = layout.position(AnchorId(1)).unwrap();
        let b = layout.position(AnchorId(2)).unwrap();
        let c = layout.position(AnchorId(3)).unwrap();
        for (p, q, expected) in [(a, b, 3000.0), (a, c, 4000.0), (b, c, 5000.0)] {
            let d = p.distance_to(&q);
            assert!((d - expected).abs() <= expected * 0.01, "{} vs {}", d, expected);
        }
    }

    #[test]
    fn test_positions_follow_matrix_order() {
        let mut matrix = DistanceMatrix::new();
        matrix.ensure_anchor(AnchorId(30));
        matrix.ensure_anchor(AnchorId(10));
        matrix.ensure_anchor(AnchorId(20));
        matrix.record(AnchorId(30), AnchorId(10), 4000);
        matrix.record(AnchorId(30), AnchorId(20), 5000);
        matrix.record(AnchorId(10), AnchorId(20), 3000);

        let layout = reconstruct(&matrix, &CanonicalParams::default(), &ReconstructionConfig::default()).unwrap();
        let ids: Vec<AnchorId> = layout.positions.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![AnchorId(30), AnchorId(10), AnchorId(20)]);

        let d = layout
            .position(AnchorId(30))
            .unwrap()
            .distance_to(&layout.position(AnchorId(20)).unwrap());
        assert!((d - 5000.0).abs() < 50.0);
    }

    #[test]
    fn test_deterministic() {
        let matrix = matrix_from(&[(1, 0.0, 0.0), (2, 5200.0, 300.0), (3, 5000.0, 3600.0), (4, 200.0, 3300.0), (5, 2600.0, 1500.0)]);
        let params = CanonicalParams {
            extra_rotation_deg: 17.0,
            ..Default::default()
        };
        let config = ReconstructionConfig::default();

        let first = reconstruct(&matrix, &params, &config).unwrap();
        let second = reconstruct(&matrix, &params, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_anchor_at_origin() {
        let matrix = matrix_from(&square());
        for zero in 1..=4 {
            let params = CanonicalParams {
                zero_anchor: Some(AnchorId(zero)),
                extra_rotation_deg: 12.5,
                ..Default::default()
            };
            let layout = reconstruct(&matrix, &params, &ReconstructionConfig::default()).unwrap();
            let p = layout.position(AnchorId(zero)).unwrap();
            assert!(p.x.abs() < 1e-6 && p.y.abs() < 1e-6);
        }
    }

    #[test]
    fn test_offset_applied_after_zero_anchor() {
        let matrix = matrix_from(&square());
        let params = CanonicalParams {
            zero_anchor: Some(AnchorId(3)),
            offset_x: 250.0,
            offset_y: -100.0,
            ..Default::default()
        };
        let layout = reconstruct(&matrix, &params, &ReconstructionConfig::default()).unwrap();
        let p = layout.position(AnchorId(3)).unwrap();
        assert!((p.x - 250.0).abs() < 1e-6 && (p.y + 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_square_is_axis_aligned() {
        let matrix = matrix_from(&square());
        let config = ReconstructionConfig {
            hull_averaging: HullAngleAveraging::Circular,
            ..Default::default()
        };
        let params = CanonicalParams {
            zero_anchor: Some(AnchorId(1)),
            ..Default::default()
        };
        let layout = reconstruct(&matrix, &params, &config).unwrap();

        for (_, p) in &layout.positions {
            for v in [p.x, p.y] {
                let snapped = (v / 4000.0).round() * 4000.0;
                assert!((v - snapped).abs() < 10.0, "{:?}", layout.positions);
            }
        }
    }

    #[test]
    fn test_mirror_toggles_handedness() {
        let matrix = matrix_from(&square());
        let config = ReconstructionConfig::default();

        for extra in [0.0, 30.0, 145.0] {
            let plain = reconstruct(
                &matrix,
                &CanonicalParams {
                    extra_rotation_deg: extra,
                    ..Default::default()
                },
                &config,
            )
            .unwrap();
            let mirrored = reconstruct(
                &matrix,
                &CanonicalParams {
                    mirror: true,
                    extra_rotation_deg: extra,
                    ..Default::default()
                },
                &config,
            )
            .unwrap();

            assert!(signed_area(&plain) * signed_area(&mirrored) < 0.0);
            for i in 0..4 {
                for j in 0..4 {
                    let dp = plain.positions[i].1.distance_to(&plain.positions[j].1);
                    let dm = mirrored.positions[i].1.distance_to(&mirrored.positions[j].1);
                    assert!((dp - dm).abs() < 1e-6);
                }
            }
            if extra == 0.0 {
                for ((_, p), (_, m)) in plain.positions.iter().zip(&mirrored.positions) {
                    assert!((p.x + m.x).abs() < 1e-6 && (p.y - m.y).abs() < 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_extra_rotation_quarter_turn() {
        let matrix = matrix_from(&square());
        let config = ReconstructionConfig::default();
        let base = reconstruct(&matrix, &CanonicalParams::default(), &config).unwrap();
        let turned = reconstruct(
            &matrix,
            &CanonicalParams {
                extra_rotation_deg: 90.0,
                ..Default::default()
            },
            &config,
        )
        .unwrap();

        for ((_, b), (_, t)) in base.positions.iter().zip(&turned.positions) {
            assert!((t.x - b.y).abs() < 1e-6 && (t.y + b.x).abs() < 1e-6);
        }
    }

    #[test]
    fn test_rotated_layouts_share_canonical_frame() {
        let room = vec![
            (1, 0.0, 0.0),
            (2, 6000.0, 0.0),
            (3, 6000.0, 3000.0),
            (4, 0.0, 3000.0),
            (5, 2000.0, 1000.0),
        ];
        let config = ReconstructionConfig {
            hull_averaging: HullAngleAveraging::Circular,
            ..Default::default()
        };
        let params = CanonicalParams {
            zero_anchor: Some(AnchorId(1)),
            ..Default::default()
        };

        for (degrees, reflect) in [(0.0, false), (37.0, false), (122.0, true), (251.0, false)] {
            let matrix = matrix_from(&rotated(&room, degrees, reflect));
            let layout = reconstruct(&matrix, &params, &config).unwrap();

            // Up to the 90 degree and reflection ambiguity every wall is axis aligned
            let points: Vec<(f64, f64)> = layout.positions.iter().map(|(_, p)| (p.x, p.y)).collect();
            let hull = convex_hull(&points).unwrap();
            for (&a, &b) in hull.iter().zip(hull.iter().cycle().skip(1)) {
                let (dx, dy) = (points[b].0 - points[a].0, points[b].1 - points[a].1);
                let off_axis = dy.atan2(dx).rem_euclid(FRAC_PI_2);
                let off_axis = off_axis.min(FRAC_PI_2 - off_axis);
                assert!(off_axis.to_degrees() < 0.5, "rotation {}: {:?}", degrees, layout.positions);
            }
        }
    }

    #[test]
    fn test_rotated_room_axis_aligned_with_default_averaging() {
        let room = vec![
            (1, 0.0, 0.0),
            (2, 6000.0, 0.0),
            (3, 6000.0, 3000.0),
            (4, 0.0, 3000.0),
            (5, 2000.0, 1000.0),
        ];
        let params = CanonicalParams {
            zero_anchor: Some(AnchorId(1)),
            ..Default::default()
        };

        for degrees in [0.0, 5.0, 37.0, 88.0, 122.0, 251.0] {
            let matrix = matrix_from(&rotated(&room, degrees, false));
            let layout = reconstruct(&matrix, &params, &ReconstructionConfig::default()).unwrap();

            let points: Vec<(f64, f64)> = layout.positions.iter().map(|(_, p)| (p.x, p.y)).collect();
            let hull = convex_hull(&points).unwrap();
            for (&a, &b) in hull.iter().zip(hull.iter().cycle().skip(1)) {
                let (dx, dy) = (points[b].0 - points[a].0, points[b].1 - points[a].1);
                let off_axis = dy.atan2(dx).rem_euclid(FRAC_PI_2);
                let off_axis = off_axis.min(FRAC_PI_2 - off_axis);
                assert!(off_axis.to_degrees() < 0.5, "rotation {}: {:?}", degrees, layout.positions);
            }
        }
    }

    #[test]
    fn test_too_few_anchors_is_degenerate() {
        let mut matrix = DistanceMatrix::new();
        matrix.record(AnchorId(1), AnchorId(2), 3000);
        matrix.ensure_anchor(AnchorId(3));

        let result = reconstruct(&matrix, &CanonicalParams::default(), &ReconstructionConfig::default());
        let err = result.unwrap_err();
        assert_eq!(err, ReconstructionError::InsufficientAnchors { usable: 2, required: 3 });
        assert!(err.is_degenerate());

        let empty = reconstruct(&DistanceMatrix::new(), &CanonicalParams::default(), &ReconstructionConfig::default());
        assert!(empty.unwrap_err().is_degenerate());
    }

    #[test]
    fn test_collinear_anchors_are_degenerate() {
        let matrix = matrix_from(&[(1, 0.0, 0.0), (2, 1000.0, 0.0), (3, 2000.0, 0.0)]);

        let err = reconstruct(&matrix, &CanonicalParams::default(), &ReconstructionConfig::default()).unwrap_err();
        assert!(matches!(err, ReconstructionError::Degenerate { .. }));
    }

    #[test]
    fn test_exclude_policy_leaves_isolated_anchor_unplaced() {
        let mut matrix = triangle_matrix();
        matrix.ensure_anchor(AnchorId(4));
        let config = ReconstructionConfig {
            missing_distances: MissingDistancePolicy::Exclude,
            ..Default::default()
        };

        let layout = reconstruct(&matrix, &CanonicalParams::default(), &config).unwrap();
        assert_eq!(layout.len(), 3);
        assert_eq!(layout.unplaced, vec![AnchorId(4)]);

        let zero_fill = reconstruct(&matrix, &CanonicalParams::default(), &ReconstructionConfig::default()).unwrap();
        assert_eq!(zero_fill.len(), 4);
        assert!(zero_fill.unplaced.is_empty());
    }
}
