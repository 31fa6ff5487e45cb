//! Distance measurement protocol and sweep driver

pub mod pause;
pub mod protocol;
pub mod sweep;

pub use pause::{Pause, RecordingPause, ThreadPause};
pub use protocol::{
    DirectionalMeasurement, MeasurementOutcome, MeasurementPolicy, MeasurementReport, MeasurementState,
};
pub use sweep::{run_sweep, SweepControl, SweepEvent, SweepSummary};
