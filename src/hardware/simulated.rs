//! Simulated anchor field backed by known anchor positions
//!
//! Each anchor keeps its own result register. A trigger write computes the
//! true distance to the addressed low-level id, perturbs it with bounded
//! noise and stores it in the register of the commanding anchor. Rejections
//! and stale reads are drawn from a seeded generator so runs are
//! reproducible.

use crate::core::{Anchor, AnchorId, LowLevelId, Position2, RESULT_VARIABLE, TRIGGER_VARIABLE};
use crate::hardware::{CommError, CommResult, RangingTransport};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Noise and failure model of the simulated field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Half-width of the additive noise on each ranging result (millimetres)
    pub noise_mm: f64,
    /// Probability that a trigger write is rejected (0.0 to 1.0)
    pub reject_probability: f64,
    /// Probability that a register read returns a not-ready value (0.0 to 1.0)
    pub stale_probability: f64,
    /// Seed for the noise generator
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            noise_mm: 0.0,
            reject_probability: 0.0,
            stale_probability: 0.0,
            seed: 1,
        }
    }
}

/// Ranging transport over a synthetic anchor placement
pub struct SimulatedField {
    positions: HashMap<AnchorId, Position2>,
    by_low_level: HashMap<LowLevelId, AnchorId>,
    registers: HashMap<AnchorId, i64>,
    blocked: HashSet<(AnchorId, AnchorId)>,
    config: SimulationConfig,
    rng: StdRng,
    trigger_count: usize,
}

impl SimulatedField {
    /// Create a field with anchors placed at the given positions (millimetres)
    pub fn new(placements: &[(Anchor, Position2)], config: SimulationConfig) -> Self {
        let positions = placements.iter().map(|(a, p)| (a.id, *p)).collect();
        let by_low_level = placements.iter().map(|(a, _)| (a.low_level_id, a.id)).collect();
        let rng = StdRng::seed_from_u64(config.seed);

        Self {
            positions,
            by_low_level,
            registers: HashMap::new(),
            blocked: HashSet::new(),
            config,
            rng,
            trigger_count: 0,
        }
    }

    /// Make ranging from `from` toward `to` always fail (obstructed link)
    pub fn block_link(&mut self, from: AnchorId, to: AnchorId) {
        self.blocked.insert((from, to));
    }

    /// True position of an anchor
    pub fn position(&self, anchor: AnchorId) -> Option<Position2> {
        self.positions.get(&anchor).copied()
    }

    /// Number of accepted ranging commands
    pub fn trigger_count(&self) -> usize {
        self.trigger_count
    }

    fn chance(&mut self, probability: f64) -> bool {
        probability > 0.0 && self.rng.gen::<f64>() < probability
    }

    fn range(&mut self, from: AnchorId, target: LowLevelId) -> i64 {
        let Some(&to) = self.by_low_level.get(&target) else {
            return -1;
        };
        if self.blocked.contains(&(from, to)) {
            return 0;
        }
        let (Some(a), Some(b)) = (self.positions.get(&from), self.positions.get(&to)) else {
            return -1;
        };

        let mut distance = a.distance_to(b);
        if self.config.noise_mm > 0.0 {
            let half = self.config.noise_mm;
            // Sum of two uniforms: triangular noise bounded by +/- noise_mm
            let noise = (self.rng.gen_range(-half..=half) + self.rng.gen_range(-half..=half)) / 2.0;
            distance += noise;
        }
        distance.round().max(1.0) as i64
    }
}

impl RangingTransport for SimulatedField {
    fn write_variable(&mut self, anchor: AnchorId, variable: &str, value: &Value) -> CommResult<()> {
        if !self.positions.contains_key(&anchor) {
            return Err(CommError::UnknownAnchor { anchor });
        }
        if variable != TRIGGER_VARIABLE {
            return Err(CommError::InvalidVariable {
                variable: variable.to_string(),
            });
        }
        if self.chance(self.config.reject_probability) {
            return Err(CommError::Rejected {
                anchor,
                variable: variable.to_string(),
            });
        }

        let Some(target) = value.as_u64() else {
            self.registers.insert(anchor, -1);
            return Ok(());
        };

        self.trigger_count += 1;
        let result = self.range(anchor, LowLevelId(target));
        self.registers.insert(anchor, result);
        Ok(())
    }

    fn read_variable(&mut self, anchor: AnchorId, variable: &str) -> CommResult<Value> {
        if !self.positions.contains_key(&anchor) {
            return Err(CommError::UnknownAnchor { anchor });
        }
        if variable != RESULT_VARIABLE {
            return Err(CommError::InvalidVariable {
                variable: variable.to_string(),
            });
        }
        if self.chance(self.config.stale_probability) {
            return Ok(Value::from(0));
        }

        Ok(self
            .registers
            .get(&anchor)
            .map(|v| Value::from(*v))
            .unwrap_or(Value::Null))
    }
}
