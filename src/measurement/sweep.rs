//! Full bidirectional measurement sweep
//!
//! Directional measurements run strictly one at a time in source-major
//! order. The matrix is updated after every directional result and handed
//! to the observer, which may stop the sweep before the next measurement.

use crate::core::{Anchor, AnchorId};
use crate::hardware::RangingTransport;
use crate::matrix::DistanceMatrix;
use crate::measurement::protocol::measure;
use crate::measurement::{MeasurementPolicy, MeasurementReport, Pause};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

/// Observer verdict after each directional measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepControl {
    Continue,
    Stop,
}

/// Progress notification for one finished directional measurement
#[derive(Debug)]
pub struct SweepEvent<'a> {
    pub from: AnchorId,
    pub to: AnchorId,
    pub report: &'a MeasurementReport,
    /// Reconciled value now stored for the pair, if the direction was measured
    pub stored: Option<u64>,
    pub completed: usize,
    pub total: usize,
}

/// Counters for a finished or abandoned sweep
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub directions_total: usize,
    pub directions_done: usize,
    pub measured: usize,
    pub unmeasurable: Vec<(AnchorId, AnchorId)>,
    pub attempts: u32,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl SweepSummary {
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.directions_done == self.directions_total
    }
}

/// Measure every ordered anchor pair into `matrix`
pub fn run_sweep<T, P, F>(
    anchors: &[Anchor],
    matrix: &mut DistanceMatrix,
    policy: &MeasurementPolicy,
    transport: &mut T,
    pause: &mut P,
    mut observer: F,
) -> SweepSummary
where
    T: RangingTransport + ?Sized,
    P: Pause + ?Sized,
    F: FnMut(&SweepEvent<'_>, &DistanceMatrix) -> SweepControl,
{
    let start = Instant::now();
    let n = anchors.len();
    let mut summary = SweepSummary {
        directions_total: n * n.saturating_sub(1),
        ..Default::default()
    };

    info!(anchors = n, directions = summary.directions_total, "starting distance sweep");

    'sources: for from in anchors {
        matrix.ensure_anchor(from.id);

        for to in anchors.iter().filter(|a| a.id != from.id) {
            let report = measure(policy, transport, pause, from.id, to.low_level_id);
            let stored = matrix.record_outcome(from.id, to.id, report.outcome);

            summary.directions_done += 1;
            summary.attempts += report.attempts;
            match stored {
                Some(value) => {
                    summary.measured += 1;
                    info!(
                        from = %from.id,
                        to = %to.id,
                        samples = report.samples.len(),
                        stored = value,
                        "distance measured"
                    );
                }
                None => {
                    summary.unmeasurable.push((from.id, to.id));
                    warn!(from = %from.id, to = %to.id, attempts = report.attempts, "distance unmeasurable");
                }
            }

            let event = SweepEvent {
                from: from.id,
                to: to.id,
                report: &report,
                stored,
                completed: summary.directions_done,
                total: summary.directions_total,
            };
            if observer(&event, matrix) == SweepControl::Stop {
                summary.cancelled = true;
                break 'sources;
            }
        }
    }

    summary.elapsed_ms = start.elapsed().as_millis() as u64;
    info!(
        measured = summary.measured,
        unmeasurable = summary.unmeasurable.len(),
        cancelled = summary.cancelled,
        elapsed_ms = summary.elapsed_ms,
        "distance sweep finished"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Position2;
    use crate::hardware::{ScriptedTransport, SimulatedField, SimulationConfig, WriteResponse};
    use crate::measurement::RecordingPause;

    fn triangle() -> Vec<(Anchor, Position2)> {
        vec![
            (Anchor::new(1, 0x10), Position2::new(0.0, 0.0)),
            (Anchor::new(2, 0x20), Position2::new(3000.0, 0.0)),
            (Anchor::new(3, 0x30), Position2::new(0.0, 4000.0)),
        ]
    }

    #[test]
    fn test_full_sweep_is_symmetric() {
        let placements = triangle();
        let anchors: Vec<Anchor> = placements.iter().map(|(a, _)| a.clone()).collect();
        let mut field = SimulatedField::new(&placements, SimulationConfig::default());
        let mut matrix = DistanceMatrix::new();
        let mut pause = RecordingPause::new();

        let summary = run_sweep(
            &anchors,
            &mut matrix,
            &MeasurementPolicy::default(),
            &mut field,
            &mut pause,
            |_, _| SweepControl::Continue,
        );

        assert!(summary.is_complete());
        assert_eq!(summary.measured, 6);
        assert!(matrix.is_symmetric());
        assert_eq!(matrix.get(AnchorId(1), AnchorId(2)), Some(3000));
        assert_eq!(matrix.get(AnchorId(3), AnchorId(1)), Some(4000));
        assert_eq!(matrix.get(AnchorId(2), AnchorId(3)), Some(5000));
        assert_eq!(matrix.get(AnchorId(2), AnchorId(2)), Some(0));
    }

    #[test]
    fn test_noisy_directions_are_reconciled() {
        let anchors = vec![Anchor::new(1, 0x10), Anchor::new(2, 0x20)];
        let mut transport = ScriptedTransport::new();
        transport.push_results(AnchorId(1), &[1000, 1002, 1004, 1006, 1008]);
        transport.push_results(AnchorId(2), &[1011, 1011, 1011, 1011, 1011]);
        let mut matrix = DistanceMatrix::new();
        let mut pause = RecordingPause::new();

        run_sweep(
            &anchors,
            &mut matrix,
            &MeasurementPolicy::default(),
            &mut transport,
            &mut pause,
            |_, _| SweepControl::Continue,
        );

        // floor((1004 + 1011) / 2)
        assert_eq!(matrix.raw(AnchorId(1), AnchorId(2)), Some(1007));
        assert_eq!(matrix.raw(AnchorId(2), AnchorId(1)), Some(1007));
    }

    #[test]
    fn test_source_major_order_and_progress() {
        let placements = triangle();
        let anchors: Vec<Anchor> = placements.iter().map(|(a, _)| a.clone()).collect();
        let mut field = SimulatedField::new(&placements, SimulationConfig::default());
        let mut matrix = DistanceMatrix::new();
        let mut pause = RecordingPause::new();
        let mut seen = Vec::new();

        run_sweep(
            &anchors,
            &mut matrix,
            &MeasurementPolicy::default(),
            &mut field,
            &mut pause,
            |event, _| {
                seen.push((event.from.0, event.to.0, event.completed, event.total));
                SweepControl::Continue
            },
        );

        assert_eq!(
            seen,
            vec![(1, 2, 1, 6), (1, 3, 2, 6), (2, 1, 3, 6), (2, 3, 4, 6), (3, 1, 5, 6), (3, 2, 6, 6)]
        );
    }

    #[test]
    fn test_observer_sees_partial_matrix_and_can_stop() {
        let placements = triangle();
        let anchors: Vec<Anchor> = placements.iter().map(|(a, _)| a.clone()).collect();
        let mut field = SimulatedField::new(&placements, SimulationConfig::default());
        let mut matrix = DistanceMatrix::new();
        let mut pause = RecordingPause::new();

        let summary = run_sweep(
            &anchors,
            &mut matrix,
            &MeasurementPolicy::default(),
            &mut field,
            &mut pause,
            |event, partial| {
                assert_eq!(partial.get(event.from, event.to), event.stored);
                if event.completed == 2 {
                    SweepControl::Stop
                } else {
                    SweepControl::Continue
                }
            },
        );

        assert!(summary.cancelled);
        assert!(!summary.is_complete());
        assert_eq!(summary.directions_done, 2);
        assert_eq!(field.trigger_count(), 10);
        assert_eq!(matrix.raw(AnchorId(2), AnchorId(1)), None);
    }

    #[test]
    fn test_unmeasurable_pair_continues_sweep() {
        let anchors = vec![Anchor::new(1, 0x10), Anchor::new(2, 0x20), Anchor::new(3, 0x30)];
        let mut transport = ScriptedTransport::new();
        transport.push_writes(AnchorId(1), std::iter::repeat(WriteResponse::Reject).take(15));
        transport.push_results(AnchorId(1), &[700; 5]);
        transport.push_results(AnchorId(2), &[1000; 10]);
        transport.push_results(AnchorId(3), &[700; 10]);
        let mut matrix = DistanceMatrix::new();
        let mut pause = RecordingPause::new();

        let summary = run_sweep(
            &anchors,
            &mut matrix,
            &MeasurementPolicy::default(),
            &mut transport,
            &mut pause,
            |_, _| SweepControl::Continue,
        );

        assert!(summary.is_complete());
        assert_eq!(summary.unmeasurable, vec![(AnchorId(1), AnchorId(2))]);
        assert_eq!(summary.measured, 5);
        // 2 -> 1 fills the pair on its own
        assert_eq!(matrix.get(AnchorId(1), AnchorId(2)), Some(1000));
        assert_eq!(matrix.get(AnchorId(2), AnchorId(1)), Some(1000));
    }
}
