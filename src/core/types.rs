//! Core data types shared by the measurement and reconstruction layers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable, externally visible anchor identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorId(pub u64);

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for AnchorId {
    fn from(id: u64) -> Self {
        AnchorId(id)
    }
}

/// Radio-level address used only when commanding the ranging transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LowLevelId(pub u64);

impl fmt::Display for LowLevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Fixed radio anchor as reported by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub id: AnchorId,
    pub low_level_id: LowLevelId,
}

impl Anchor {
    pub fn new(id: u64, low_level_id: u64) -> Self {
        Self {
            id: AnchorId(id),
            low_level_id: LowLevelId(low_level_id),
        }
    }
}

/// 2-D coordinate in the distance unit of the matrix (millimetres)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position2 {
    pub x: f64,
    pub y: f64,
}

impl Position2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Self) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Externally surveyed anchor position, overlay only
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReferencePosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl ReferencePosition {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            z: self.z * factor,
        }
    }
}
