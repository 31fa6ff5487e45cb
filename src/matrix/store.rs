//! Distance matrix store with bidirectional reconciliation
//!
//! Cells hold reconciled, non-negative distances keyed by ordered anchor
//! pair. Recording A→B when B→A is already present replaces both cells by
//! their truncated average. Unmeasurable directions are never written, and
//! the diagonal is implicitly zero.

use crate::core::{AnchorId, MIN_LAYOUT_ANCHORS};
use crate::measurement::MeasurementOutcome;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How unset off-diagonal cells enter the embedding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingDistancePolicy {
    /// Unset cells are dissimilarity 0 (pulls never-measured pairs together)
    #[default]
    ZeroFill,
    /// Unset cells get weight 0 in the stress objective
    Exclude,
}

/// Symmetric distance matrix over anchor ids, in first-seen anchor order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistanceMatrix {
    order: Vec<AnchorId>,
    cells: HashMap<(AnchorId, AnchorId), u64>,
}

impl DistanceMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an anchor as a row/column without measuring anything
    pub fn ensure_anchor(&mut self, id: AnchorId) {
        if !self.order.contains(&id) {
            self.order.push(id);
        }
    }

    /// Record a directional distance and return the value now stored for the pair
    pub fn record(&mut self, from: AnchorId, to: AnchorId, distance: u64) -> u64 {
        self.ensure_anchor(from);
        self.ensure_anchor(to);
        if from == to {
            return 0;
        }

        let stored = match self.cells.get(&(to, from)) {
            Some(&reverse) => {
                let average = truncated_average(reverse, distance);
                self.cells.insert((to, from), average);
                average
            }
            None => distance,
        };
        self.cells.insert((from, to), stored);
        stored
    }

    /// Record a measurement outcome; unmeasurable leaves the cell unset
    pub fn record_outcome(&mut self, from: AnchorId, to: AnchorId, outcome: MeasurementOutcome) -> Option<u64> {
        match outcome {
            MeasurementOutcome::Distance(d) => Some(self.record(from, to, d)),
            MeasurementOutcome::Unmeasurable => {
                self.ensure_anchor(from);
                self.ensure_anchor(to);
                None
            }
        }
    }

    /// Reconciled distance; a pair measured in one direction only reads the same both ways
    pub fn get(&self, a: AnchorId, b: AnchorId) -> Option<u64> {
        if a == b {
            return self.contains(a).then_some(0);
        }
        self.cells
            .get(&(a, b))
            .or_else(|| self.cells.get(&(b, a)))
            .copied()
    }

    /// Directional cell as written, without falling back to the reverse direction
    pub fn raw(&self, from: AnchorId, to: AnchorId) -> Option<u64> {
        if from == to {
            return self.contains(from).then_some(0);
        }
        self.cells.get(&(from, to)).copied()
    }

    pub fn contains(&self, id: AnchorId) -> bool {
        self.order.contains(&id)
    }

    /// Row/column order of the dense form
    pub fn anchors(&self) -> &[AnchorId] {
        &self.order
    }

    pub fn index_of(&self, id: AnchorId) -> Option<usize> {
        self.order.iter().position(|a| *a == id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Dense square form with unset cells read as 0
    pub fn square_matrix(&self) -> DMatrix<f64> {
        let n = self.order.len();
        DMatrix::from_fn(n, n, |i, j| {
            self.get(self.order[i], self.order[j]).unwrap_or(0) as f64
        })
    }

    /// 1 for measured off-diagonal cells, 0 elsewhere
    pub fn measured_mask(&self) -> DMatrix<f64> {
        let n = self.order.len();
        DMatrix::from_fn(n, n, |i, j| {
            if i != j && self.get(self.order[i], self.order[j]).is_some() {
                1.0
            } else {
                0.0
            }
        })
    }

    /// Largest stored distance, bounds the translation offsets
    pub fn max_value(&self) -> u64 {
        self.cells.values().copied().max().unwrap_or(0)
    }

    /// Number of unordered pairs with at least one successful direction
    pub fn measured_pairs(&self) -> usize {
        let mut pairs: Vec<(AnchorId, AnchorId)> = self
            .cells
            .keys()
            .map(|&(a, b)| if a < b { (a, b) } else { (b, a) })
            .collect();
        pairs.sort_unstable();
        pairs.dedup();
        pairs.len()
    }

    /// Anchors taking part in at least one non-zero measured distance
    pub fn usable_anchors(&self) -> Vec<AnchorId> {
        self.order
            .iter()
            .copied()
            .filter(|&a| {
                self.cells
                    .iter()
                    .any(|(&(x, y), &d)| d > 0 && (x == a || y == a))
            })
            .collect()
    }

    /// Whether enough anchors have distances for a 2-D layout
    pub fn has_layout_support(&self) -> bool {
        self.usable_anchors().len() >= MIN_LAYOUT_ANCHORS
    }

    /// Every pair written in both directions holds the same value both ways
    pub fn is_symmetric(&self) -> bool {
        self.cells
            .iter()
            .all(|(&(a, b), &d)| self.cells.get(&(b, a)).map_or(true, |&r| r == d))
    }
}

/// `(a + b) / 2` truncated, without overflowing
fn truncated_average(a: u64, b: u64) -> u64 {
    a / 2 + b / 2 + (a % 2 + b % 2) / 2
}
