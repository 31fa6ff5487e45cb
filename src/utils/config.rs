//! Configuration for measurement, reconstruction and the static registry
//!
//! Configuration is a JSON document; every section and field falls back to
//! its default when absent.

use crate::algorithms::reconstruction::ReconstructionConfig;
use crate::core::{
    Anchor, AnchorId, ReferencePosition, BACKOFF_INTERVAL_MS, MAX_RETRY, MEAS_COUNT, REFERENCE_POSITION_SCALE,
    RESULT_VARIABLE, SETTLE_INTERVAL_MS, TRIGGER_VARIABLE,
};
use crate::measurement::MeasurementPolicy;
use crate::registry::StaticRegistry;
use crate::utils::logging::LogConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration loading and validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Invalid parameter value
    #[error("invalid {parameter} = {value}: {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },
    /// Configuration file I/O error
    #[error("configuration file error: {message}")]
    Io { message: String },
    /// JSON serialization/deserialization error
    #[error("configuration format error: {message}")]
    Serialization { message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Ranging protocol settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementSettings {
    /// Command attempts per sampling round
    pub max_retry: u32,
    /// Sampling rounds averaged per direction
    pub meas_count: u32,
    /// Pause between accepted command and result read (milliseconds)
    pub settle_ms: u64,
    /// Pause after a rejected command (milliseconds)
    pub backoff_ms: u64,
    pub trigger_variable: String,
    pub result_variable: String,
}

impl Default for MeasurementSettings {
    fn default() -> Self {
        Self {
            max_retry: MAX_RETRY,
            meas_count: MEAS_COUNT,
            settle_ms: SETTLE_INTERVAL_MS,
            backoff_ms: BACKOFF_INTERVAL_MS,
            trigger_variable: TRIGGER_VARIABLE.to_string(),
            result_variable: RESULT_VARIABLE.to_string(),
        }
    }
}

impl MeasurementSettings {
    pub fn policy(&self) -> MeasurementPolicy {
        MeasurementPolicy {
            max_retry: self.max_retry,
            meas_count: self.meas_count,
            settle: Duration::from_millis(self.settle_ms),
            backoff: Duration::from_millis(self.backoff_ms),
            trigger_variable: self.trigger_variable.clone(),
            result_variable: self.result_variable.clone(),
        }
    }
}

/// Static anchor registry and overlay settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// Factor from reference-position units to the distance unit
    pub reference_position_scale: f64,
    /// Anchors served by the static registry
    pub anchors: Vec<Anchor>,
    /// Surveyed positions, in reference-position units
    pub reference_positions: BTreeMap<AnchorId, ReferencePosition>,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            reference_position_scale: REFERENCE_POSITION_SCALE,
            anchors: Vec::new(),
            reference_positions: BTreeMap::new(),
        }
    }
}

impl RegistrySettings {
    pub fn static_registry(&self) -> StaticRegistry {
        let registry = StaticRegistry::new(self.anchors.clone());
        if self.reference_positions.is_empty() {
            registry
        } else {
            registry.with_reference_positions(self.reference_positions.clone())
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub measurement: MeasurementSettings,
    pub reconstruction: ReconstructionConfig,
    pub registry: RegistrySettings,
    pub logging: LogConfig,
}

impl LayoutConfig {
    /// Load and validate a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            message: format!("{}: {}", path.as_ref().display(), e),
        })?;
        let config = Self::from_json(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::Serialization { message: e.to_string() })
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialization { message: e.to_string() })
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        self.validate()?;
        let content = self.to_json()?;
        fs::write(path.as_ref(), content).map_err(|e| ConfigError::Io {
            message: format!("{}: {}", path.as_ref().display(), e),
        })
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let m = &self.measurement;
        if m.max_retry == 0 {
            return Err(invalid("measurement.max_retry", m.max_retry, "must be at least 1"));
        }
        if m.meas_count == 0 {
            return Err(invalid("measurement.meas_count", m.meas_count, "must be at least 1"));
        }
        if m.trigger_variable.is_empty() || m.result_variable.is_empty() {
            return Err(invalid("measurement.variables", "\"\"", "variable names must not be empty"));
        }

        let mds = &self.reconstruction.mds;
        if mds.n_init == 0 && !mds.classical_start {
            return Err(invalid("reconstruction.mds.n_init", mds.n_init, "no starting configuration"));
        }
        if mds.max_iter == 0 {
            return Err(invalid("reconstruction.mds.max_iter", mds.max_iter, "must be at least 1"));
        }
        if !(mds.eps.is_finite() && mds.eps > 0.0) {
            return Err(invalid("reconstruction.mds.eps", mds.eps, "must be positive"));
        }

        let scale = self.registry.reference_position_scale;
        if !(scale.is_finite() && scale > 0.0) {
            return Err(invalid("registry.reference_position_scale", scale, "must be positive"));
        }

        let mut ids: Vec<AnchorId> = self.registry.anchors.iter().map(|a| a.id).collect();
        ids.sort_unstable();
        if let Some(pair) = ids.windows(2).find(|w| w[0] == w[1]) {
            return Err(invalid("registry.anchors", pair[0], "duplicate anchor id"));
        }

        Ok(())
    }
}

fn invalid<V: std::fmt::Display>(parameter: &str, value: V, reason: &str) -> ConfigError {
    ConfigError::InvalidParameter {
        parameter: parameter.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
