//! Anchor layout estimation
//!
//! Measures pairwise two-way-ranging distances between fixed radio anchors
//! and reconstructs their relative 2-D layout, up to the rotation, mirror
//! and translation the user chooses for display.

pub mod core;
pub mod hardware;
pub mod registry;
pub mod measurement;
pub mod matrix;
pub mod algorithms;
pub mod session;
pub mod api;
pub mod utils;

// Re-export commonly used types
pub use core::{Anchor, AnchorId, LowLevelId, Position2, ReferencePosition};
pub use hardware::{CommError, CommResult, RangingTransport, ScriptedTransport, SimulatedField, SimulationConfig};
pub use registry::{AnchorRegistry, RegistryError, StaticRegistry};
pub use measurement::{
    MeasurementOutcome, MeasurementPolicy, MeasurementReport, Pause, RecordingPause, SweepControl, SweepSummary,
    ThreadPause,
};
pub use matrix::{DistanceMatrix, MissingDistancePolicy};
pub use algorithms::{reconstruct, CanonicalParams, Layout, ReconstructionConfig, ReconstructionError};
pub use session::{LocalizationSession, SessionError, SweepProgress};
pub use api::{CsvFormatter, DisplayState, JsonFormatter, LayoutReport, TextFormatter, ViewBox};
pub use utils::{init_logging, LayoutConfig, LogConfig};
