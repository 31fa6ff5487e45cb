//! Localization session: the explicit owner of one run's state
//!
//! A session fetches the anchor set once, owns the distance matrix and the
//! canonicalization parameters, and exposes the operations the presentation
//! surface needs. Parameter changes only affect reconstruction; they never
//! trigger measurement.

use crate::algorithms::canonical::CanonicalParams;
use crate::algorithms::reconstruction::{reconstruct, Layout, ReconstructionConfig, ReconstructionResult};
use crate::api::view::DisplayState;
use crate::core::{Anchor, AnchorId, ReferencePosition};
use crate::hardware::RangingTransport;
use crate::matrix::DistanceMatrix;
use crate::measurement::{run_sweep, MeasurementPolicy, Pause, SweepControl, SweepEvent, SweepSummary};
use crate::registry::{fetch_anchors, fetch_reference_positions, AnchorRegistry};
use crate::utils::config::LayoutConfig;
use nalgebra::DMatrix;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

/// Rejected parameter updates
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("anchor {anchor} is not part of this session")]
    UnknownAnchor { anchor: AnchorId },
    #[error("offset {value} outside [-{bound}, {bound}]")]
    OffsetOutOfRange { value: f64, bound: f64 },
    #[error("rotation {value} is not a finite angle")]
    InvalidRotation { value: f64 },
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Intermediate state handed to the sweep observer
pub struct SweepProgress<'a> {
    pub event: &'a SweepEvent<'a>,
    pub matrix: &'a DistanceMatrix,
    params: &'a CanonicalParams,
    config: &'a ReconstructionConfig,
}

impl SweepProgress<'_> {
    /// Layout of the partially filled matrix under the current parameters
    pub fn layout(&self) -> ReconstructionResult<Layout> {
        reconstruct(self.matrix, self.params, self.config)
    }

    pub fn display_state(&self) -> DisplayState {
        DisplayState::from_reconstruction(self.matrix, self.layout())
    }

    /// Parameters the intermediate layout is computed with
    pub fn params(&self) -> &CanonicalParams {
        self.params
    }
}

/// State of one localization run
#[derive(Debug, Clone)]
pub struct LocalizationSession {
    anchors: Vec<Anchor>,
    reference_positions: BTreeMap<AnchorId, ReferencePosition>,
    matrix: DistanceMatrix,
    params: CanonicalParams,
    policy: MeasurementPolicy,
    reconstruction: ReconstructionConfig,
    reference_scale: f64,
}

impl LocalizationSession {
    /// Start a session: fetch anchors and overlay once, begin with an empty matrix
    pub fn start<R: AnchorRegistry + ?Sized>(registry: &R, config: &LayoutConfig) -> Self {
        let reference_scale = config.registry.reference_position_scale;
        let anchors = fetch_anchors(registry);
        let reference_positions = fetch_reference_positions(registry, reference_scale);
        info!(
            anchors = anchors.len(),
            reference_positions = reference_positions.len(),
            "localization session started"
        );

        Self {
            anchors,
            reference_positions,
            matrix: DistanceMatrix::new(),
            params: CanonicalParams::default(),
            policy: config.measurement.policy(),
            reconstruction: config.reconstruction.clone(),
            reference_scale,
        }
    }

    /// Re-fetch the anchor set and overlay; the matrix is kept
    pub fn refresh_anchors<R: AnchorRegistry + ?Sized>(&mut self, registry: &R) -> usize {
        self.anchors = fetch_anchors(registry);
        self.reference_positions = fetch_reference_positions(registry, self.reference_scale);
        if let Some(zero) = self.params.zero_anchor {
            if !self.is_known(zero) {
                self.params.zero_anchor = None;
            }
        }
        info!(anchors = self.anchors.len(), "anchor set refreshed");
        self.anchors.len()
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    pub fn reference_positions(&self) -> &BTreeMap<AnchorId, ReferencePosition> {
        &self.reference_positions
    }

    pub fn policy(&self) -> &MeasurementPolicy {
        &self.policy
    }

    pub fn reconstruction_config(&self) -> &ReconstructionConfig {
        &self.reconstruction
    }

    /// Measure every ordered anchor pair, reporting progress after each direction
    pub fn sweep<T, P, F>(&mut self, transport: &mut T, pause: &mut P, mut observer: F) -> SweepSummary
    where
        T: RangingTransport + ?Sized,
        P: Pause + ?Sized,
        F: FnMut(&SweepProgress<'_>) -> SweepControl,
    {
        let params = &self.params;
        let config = &self.reconstruction;
        run_sweep(
            &self.anchors,
            &mut self.matrix,
            &self.policy,
            transport,
            pause,
            |event, matrix| {
                observer(&SweepProgress {
                    event,
                    matrix,
                    params,
                    config,
                })
            },
        )
    }

    pub fn distance_matrix(&self) -> &DistanceMatrix {
        &self.matrix
    }

    /// Dense matrix in anchor order, unset cells as 0
    pub fn dense_matrix(&self) -> DMatrix<f64> {
        self.matrix.square_matrix()
    }

    /// Coordinates under the current parameters, recomputed on every call
    pub fn layout(&self) -> ReconstructionResult<Layout> {
        reconstruct(&self.matrix, &self.params, &self.reconstruction)
    }

    /// Layout, or the raw matrix when no layout can be produced
    pub fn display_state(&self) -> DisplayState {
        DisplayState::from_reconstruction(&self.matrix, self.layout())
    }

    pub fn params(&self) -> &CanonicalParams {
        &self.params
    }

    pub fn set_mirror(&mut self, mirror: bool) {
        self.params.mirror = mirror;
    }

    pub fn set_extra_rotation(&mut self, degrees: f64) -> SessionResult<()> {
        if !degrees.is_finite() {
            return Err(SessionError::InvalidRotation { value: degrees });
        }
        self.params.extra_rotation_deg = degrees;
        Ok(())
    }

    pub fn set_zero_anchor(&mut self, anchor: Option<AnchorId>) -> SessionResult<()> {
        if let Some(id) = anchor {
            if !self.is_known(id) {
                return Err(SessionError::UnknownAnchor { anchor: id });
            }
        }
        self.params.zero_anchor = anchor;
        Ok(())
    }

    /// Offsets are bounded by the largest distance in the matrix
    pub fn set_offset(&mut self, x: f64, y: f64) -> SessionResult<()> {
        let bound = self.offset_bound();
        for value in [x, y] {
            if !value.is_finite() || value.abs() > bound {
                return Err(SessionError::OffsetOutOfRange { value, bound });
            }
        }
        self.params.offset_x = x;
        self.params.offset_y = y;
        Ok(())
    }

    pub fn offset_bound(&self) -> f64 {
        self.matrix.max_value() as f64
    }

    fn is_known(&self, id: AnchorId) -> bool {
        self.anchors.iter().any(|a| a.id == id) || self.matrix.contains(id)
    }
}
