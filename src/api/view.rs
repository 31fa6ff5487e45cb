//! What the presentation surface shows: a layout, or the raw matrix

use crate::algorithms::reconstruction::{Layout, ReconstructionResult};
use crate::core::{AnchorId, Position2, ReferencePosition};
use crate::matrix::DistanceMatrix;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Padding factor applied to the plotted extent
const VIEW_PADDING: f64 = 1.1;

/// Reconstructed layout, or the raw matrix with the reason no layout exists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayState {
    Layout(Layout),
    RawMatrix {
        anchors: Vec<AnchorId>,
        distances: Vec<Vec<u64>>,
        reason: String,
    },
}

impl DisplayState {
    pub fn from_reconstruction(matrix: &DistanceMatrix, result: ReconstructionResult<Layout>) -> Self {
        match result {
            Ok(layout) => DisplayState::Layout(layout),
            Err(err) => DisplayState::RawMatrix {
                anchors: matrix.anchors().to_vec(),
                distances: dense_rows(matrix),
                reason: err.to_string(),
            },
        }
    }
}

/// Dense matrix rows in anchor order, unset cells as 0
pub fn dense_rows(matrix: &DistanceMatrix) -> Vec<Vec<u64>> {
    matrix
        .anchors()
        .iter()
        .map(|&a| {
            matrix
                .anchors()
                .iter()
                .map(|&b| matrix.get(a, b).unwrap_or(0))
                .collect()
        })
        .collect()
}

/// Plot bounds of a layout, widened by the reference overlay
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewBox {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl ViewBox {
    /// None when there is nothing to plot
    pub fn new(layout: &Layout, overlay: &BTreeMap<AnchorId, ReferencePosition>) -> Option<Self> {
        let points = layout
            .positions
            .iter()
            .map(|(_, p)| *p)
            .chain(overlay.values().map(|r| Position2::new(r.x, r.y)));

        points.fold(None, |acc: Option<ViewBox>, p| {
            Some(match acc {
                None => ViewBox {
                    min_x: p.x,
                    max_x: p.x,
                    min_y: p.y,
                    max_y: p.y,
                },
                Some(b) => ViewBox {
                    min_x: b.min_x.min(p.x),
                    max_x: b.max_x.max(p.x),
                    min_y: b.min_y.min(p.y),
                    max_y: b.max_y.max(p.y),
                },
            })
        })
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Figure size keeping the aspect ratio, shorter side 3 units
    pub fn figure_size(&self) -> Option<(f64, f64)> {
        let w = self.width() * VIEW_PADDING;
        let h = self.height() * VIEW_PADDING;
        let rem = w.min(h) / 3.0;
        if rem > 0.0 && rem.is_finite() {
            Some((w / rem, h / rem))
        } else {
            None
        }
    }
}
