//! Canonical display frame: rotation, mirror, re-centering and translation

use crate::algorithms::reconstruction::{ReconstructionError, ReconstructionResult};
use crate::core::{AnchorId, Position2};
use nalgebra::{Matrix2, RowVector2};
use serde::{Deserialize, Serialize};

/// User-adjustable canonicalization parameters
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CanonicalParams {
    /// Reflect the layout
    pub mirror: bool,
    /// Additional rotation in degrees
    pub extra_rotation_deg: f64,
    /// Anchor moved to the origin
    pub zero_anchor: Option<AnchorId>,
    /// Translation applied last, in the matrix unit
    pub offset_x: f64,
    pub offset_y: f64,
}

impl CanonicalParams {
    fn handedness(&self) -> f64 {
        if self.mirror {
            -1.0
        } else {
            1.0
        }
    }
}

/// Combined rotation and mirror applied to embedded points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanonicalTransform {
    /// Total rotation angle in radians
    pub angle: f64,
    pub mirror: bool,
}

impl CanonicalTransform {
    /// The extra rotation's sign follows the handedness so it turns the same
    /// way on screen whether or not the layout is mirrored
    pub fn new(normalization_angle: f64, params: &CanonicalParams) -> Self {
        Self {
            angle: normalization_angle + params.handedness() * params.extra_rotation_deg.to_radians(),
            mirror: params.mirror,
        }
    }

    /// Right-multiplied onto row vectors
    pub fn matrix(&self) -> Matrix2<f64> {
        let m = if self.mirror { -1.0 } else { 1.0 };
        let (s, c) = self.angle.sin_cos();
        Matrix2::new(c * m, -s, s * m, c)
    }

    pub fn apply(&self, point: Position2) -> Position2 {
        let v = RowVector2::new(point.x, point.y) * self.matrix();
        Position2::new(v[0], v[1])
    }
}

/// Transform embedded points into the display frame, preserving order
pub fn canonicalize(
    points: &[(AnchorId, Position2)],
    normalization_angle: f64,
    params: &CanonicalParams,
) -> ReconstructionResult<Vec<(AnchorId, Position2)>> {
    let transform = CanonicalTransform::new(normalization_angle, params);
    let mut out: Vec<(AnchorId, Position2)> = points
        .iter()
        .map(|&(id, p)| (id, transform.apply(p)))
        .collect();

    if let Some(zero) = params.zero_anchor {
        let origin = out
            .iter()
            .find(|(id, _)| *id == zero)
            .map(|(_, p)| *p)
            .ok_or(ReconstructionError::ZeroAnchorNotPlaced { anchor: zero })?;
        for (_, p) in out.iter_mut() {
            p.x -= origin.x;
            p.y -= origin.y;
        }
    }

    for (_, p) in out.iter_mut() {
        p.x += params.offset_x;
        p.y += params.offset_y;
    }

    Ok(out)
}
