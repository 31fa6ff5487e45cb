//! Anchor registry adapter
//!
//! Supplies the anchor set for a session and, best effort, externally
//! surveyed reference positions used only for overlay display.

use crate::core::{Anchor, AnchorId, ReferencePosition};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

/// Registry and reference-position service failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// Service could not be reached
    #[error("registry service unavailable: {details}")]
    Unavailable { details: String },
    /// Service answered with something that is not an anchor list
    #[error("malformed registry response: {details}")]
    Malformed { details: String },
}

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Source of the anchor topology
pub trait AnchorRegistry {
    /// All anchors with their low-level ids
    fn list_anchors(&self) -> RegistryResult<Vec<Anchor>>;

    /// Surveyed anchor positions in metres
    fn list_reference_positions(&self) -> RegistryResult<BTreeMap<AnchorId, ReferencePosition>>;
}

/// Fetch the anchor list, degrading to an empty set when the registry is down
pub fn fetch_anchors<R: AnchorRegistry + ?Sized>(registry: &R) -> Vec<Anchor> {
    match registry.list_anchors() {
        Ok(mut anchors) => {
            let mut seen = std::collections::HashSet::new();
            anchors.retain(|a| seen.insert(a.id));
            anchors
        }
        Err(err) => {
            warn!(error = %err, "anchor registry unavailable, continuing with no anchors");
            Vec::new()
        }
    }
}

/// Fetch the reference overlay scaled into the matrix unit, or an empty overlay
pub fn fetch_reference_positions<R: AnchorRegistry + ?Sized>(
    registry: &R,
    scale: f64,
) -> BTreeMap<AnchorId, ReferencePosition> {
    match registry.list_reference_positions() {
        Ok(positions) => positions
            .into_iter()
            .map(|(id, p)| (id, p.scaled(scale)))
            .collect(),
        Err(err) => {
            warn!(error = %err, "reference positions unavailable, overlay disabled");
            BTreeMap::new()
        }
    }
}

/// In-memory registry, typically loaded from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    anchors: Vec<Anchor>,
    reference_positions: Option<BTreeMap<AnchorId, ReferencePosition>>,
    available: bool,
}

impl StaticRegistry {
    pub fn new(anchors: Vec<Anchor>) -> Self {
        Self {
            anchors,
            reference_positions: None,
            available: true,
        }
    }

    pub fn with_reference_positions(mut self, positions: BTreeMap<AnchorId, ReferencePosition>) -> Self {
        self.reference_positions = Some(positions);
        self
    }

    /// Simulate an unreachable service
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    pub fn push_anchor(&mut self, anchor: Anchor) {
        self.anchors.push(anchor);
    }
}

impl AnchorRegistry for StaticRegistry {
    fn list_anchors(&self) -> RegistryResult<Vec<Anchor>> {
        if !self.available {
            return Err(RegistryError::Unavailable {
                details: "static registry disabled".to_string(),
            });
        }
        Ok(self.anchors.clone())
    }

    fn list_reference_positions(&self) -> RegistryResult<BTreeMap<AnchorId, ReferencePosition>> {
        if !self.available {
            return Err(RegistryError::Unavailable {
                details: "static registry disabled".to_string(),
            });
        }
        self.reference_positions.clone().ok_or_else(|| RegistryError::Unavailable {
            details: "no reference position service configured".to_string(),
        })
    }
}
