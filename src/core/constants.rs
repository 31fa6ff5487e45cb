//! Ranging protocol defaults and register names

/// Maximum number of command attempts within one sampling round
pub const MAX_RETRY: u32 = 3;

/// Number of independent sampling rounds averaged per directional measurement (>= 1)
pub const MEAS_COUNT: u32 = 5;

/// Pause between an accepted ranging command and reading its result (milliseconds)
pub const SETTLE_INTERVAL_MS: u64 = 50;

/// Pause after a rejected ranging command (milliseconds)
pub const BACKOFF_INTERVAL_MS: u64 = 100;

/// Write-only variable that starts a ranging exchange toward a low-level id
pub const TRIGGER_VARIABLE: &str = "control.perform_twr";

/// Read-only variable holding the most recent ranging outcome
pub const RESULT_VARIABLE: &str = "status.twr.result1";

/// Reference positions are published in metres, distances are millimetres
pub const REFERENCE_POSITION_SCALE: f64 = 1000.0;

/// Seed for the embedding's random starting configurations
pub const DEFAULT_EMBEDDING_SEED: u64 = 0;

/// Minimum number of anchors with usable distances for a 2-D layout
pub const MIN_LAYOUT_ANCHORS: usize = 3;
