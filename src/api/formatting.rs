//! Layout report output formatting and serialization
//!
//! A [`LayoutReport`] snapshots everything the presentation surface needs:
//! the matrix, the layout or the reason there is none, the reference overlay
//! and the parameters in effect. Text, JSON and CSV renderings are provided.

use crate::algorithms::canonical::CanonicalParams;
use crate::api::view::{dense_rows, DisplayState, ViewBox};
use crate::core::{AnchorId, ReferencePosition};
use crate::matrix::DistanceMatrix;
use crate::measurement::SweepSummary;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Reconstructed position of one anchor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRow {
    pub id: AnchorId,
    pub x: f64,
    pub y: f64,
}

/// Surveyed position of one anchor, already in the distance unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRow {
    pub id: AnchorId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Snapshot of a session for output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutReport {
    pub anchors: Vec<AnchorId>,
    pub distances: Vec<Vec<u64>>,
    /// Empty when no layout could be produced
    pub positions: Vec<PositionRow>,
    pub unplaced: Vec<AnchorId>,
    pub reference: Vec<ReferenceRow>,
    pub normalization_angle_deg: Option<f64>,
    pub stress: Option<f64>,
    /// Why only the raw matrix is shown
    pub degraded_reason: Option<String>,
    pub view: Option<ViewBox>,
    pub figure_size: Option<(f64, f64)>,
    pub params: CanonicalParams,
    pub sweep: Option<SweepSummary>,
}

impl LayoutReport {
    pub fn new(
        matrix: &DistanceMatrix,
        state: &DisplayState,
        overlay: &BTreeMap<AnchorId, ReferencePosition>,
        params: &CanonicalParams,
    ) -> Self {
        let reference = overlay
            .iter()
            .map(|(&id, r)| ReferenceRow {
                id,
                x: r.x,
                y: r.y,
                z: r.z,
            })
            .collect();

        let mut report = Self {
            anchors: matrix.anchors().to_vec(),
            distances: dense_rows(matrix),
            positions: Vec::new(),
            unplaced: Vec::new(),
            reference,
            normalization_angle_deg: None,
            stress: None,
            degraded_reason: None,
            view: None,
            figure_size: None,
            params: params.clone(),
            sweep: None,
        };

        match state {
            DisplayState::Layout(layout) => {
                report.positions = layout
                    .positions
                    .iter()
                    .map(|&(id, p)| PositionRow { id, x: p.x, y: p.y })
                    .collect();
                report.unplaced = layout.unplaced.clone();
                report.normalization_angle_deg = Some(layout.normalization_angle_deg);
                report.stress = Some(layout.stress);
                report.view = ViewBox::new(layout, overlay);
                report.figure_size = report.view.and_then(|v| v.figure_size());
            }
            DisplayState::RawMatrix { reason, .. } => {
                report.degraded_reason = Some(reason.clone());
            }
        }
        report
    }

    pub fn with_sweep(mut self, summary: SweepSummary) -> Self {
        self.sweep = Some(summary);
        self
    }

    pub fn has_layout(&self) -> bool {
        self.degraded_reason.is_none()
    }
}

/// Human-readable text formatter
#[derive(Debug, Clone)]
pub struct TextFormatter {
    /// Decimal places for coordinates
    pub precision: usize,
    /// Omit the distance matrix when a layout exists
    pub compact: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            precision: 1,
            compact: false,
        }
    }
}

impl TextFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format_text(&self, report: &LayoutReport) -> String {
        let mut output = String::new();

        if !self.compact || !report.has_layout() {
            output.push_str(&self.format_matrix(&report.anchors, &report.distances));
        }

        match &report.degraded_reason {
            Some(reason) => {
                let _ = writeln!(output, "\nNo layout: {}", reason);
            }
            None => {
                output.push_str("\nLayout:\n");
                for row in &report.positions {
                    let _ = writeln!(
                        output,
                        "  {:>8}  x {:>12.p$}  y {:>12.p$}",
                        row.id.to_string(),
                        row.x,
                        row.y,
                        p = self.precision
                    );
                }
                for id in &report.unplaced {
                    let _ = writeln!(output, "  {:>8}  (not placed)", id.to_string());
                }
                if let (Some(angle), Some(stress)) = (report.normalization_angle_deg, report.stress) {
                    let _ = writeln!(output, "  Normalization: {:.2} deg, stress {:.1}", angle, stress);
                }
            }
        }

        if !self.compact && !report.reference.is_empty() {
            output.push_str("\nReference:\n");
            for row in &report.reference {
                let _ = writeln!(
                    output,
                    "  {:>8}  x {:>12.p$}  y {:>12.p$}  z {:>12.p$}",
                    row.id.to_string(),
                    row.x,
                    row.y,
                    row.z,
                    p = self.precision
                );
            }
        }

        if let Some(summary) = &report.sweep {
            let _ = writeln!(
                output,
                "\nSweep: {}/{} directions, {} measured, {} unmeasurable, {} attempts, {} ms{}",
                summary.directions_done,
                summary.directions_total,
                summary.measured,
                summary.unmeasurable.len(),
                summary.attempts,
                summary.elapsed_ms,
                if summary.cancelled { " (cancelled)" } else { "" }
            );
        }

        output
    }

    /// Square table, unset cells shown as 0
    pub fn format_matrix(&self, anchors: &[AnchorId], distances: &[Vec<u64>]) -> String {
        let width = distances
            .iter()
            .flatten()
            .map(|d| d.to_string().len())
            .chain(anchors.iter().map(|a| a.to_string().len()))
            .max()
            .unwrap_or(1);

        let mut output = String::from("Distances:\n");
        let _ = write!(output, "  {:>w$}", "", w = width);
        for id in anchors {
            let _ = write!(output, " {:>w$}", id.to_string(), w = width);
        }
        output.push('\n');
        for (id, row) in anchors.iter().zip(distances) {
            let _ = write!(output, "  {:>w$}", id.to_string(), w = width);
            for d in row {
                let _ = write!(output, " {:>w$}", d, w = width);
            }
            output.push('\n');
        }
        output
    }
}

/// JSON formatter for structured output
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    pub fn format_json(&self, report: &LayoutReport) -> Result<String, serde_json::Error> {
        if self.pretty {
            serde_json::to_string_pretty(report)
        } else {
            serde_json::to_string(report)
        }
    }
}

/// CSV formatter, one row per reconstructed or reference position
#[derive(Debug, Clone)]
pub struct CsvFormatter {
    pub include_header: bool,
}

impl Default for CsvFormatter {
    fn default() -> Self {
        Self { include_header: true }
    }
}

impl CsvFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(&self) -> String {
        "kind,anchor,x,y,z".to_string()
    }

    pub fn format_csv(&self, report: &LayoutReport) -> String {
        let mut output = String::new();
        if self.include_header {
            output.push_str(&self.header());
            output.push('\n');
        }
        for row in &report.positions {
            let _ = writeln!(output, "layout,{},{:.3},{:.3},", row.id, row.x, row.y);
        }
        for row in &report.reference {
            let _ = writeln!(output, "reference,{},{:.3},{:.3},{:.3}", row.id, row.x, row.y, row.z);
        }
        output
    }

    /// Distance matrix as CSV with an anchor header row
    pub fn format_matrix_csv(&self, report: &LayoutReport) -> String {
        let mut output = String::new();
        if self.include_header {
            output.push_str("anchor");
            for id in &report.anchors {
                let _ = write!(output, ",{}", id);
            }
            output.push('\n');
        }
        for (id, row) in report.anchors.iter().zip(&report.distances) {
            let _ = write!(output, "{}", id);
            for d in row {
                let _ = write!(output, ",{}", d);
            }
            output.push('\n');
        }
        output
    }
}
