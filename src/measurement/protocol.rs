//! Directional distance measurement with retry and multi-sample averaging
//!
//! One directional measurement runs up to `meas_count` sampling rounds.
//! Within a round the trigger variable is written up to `max_retry` times;
//! an accepted trigger is followed by the settle pause and a read of the
//! result register, a rejected trigger by the backoff pause. The first
//! positive integer read ends the round. The estimate is the truncated mean
//! of all accepted samples, or `Unmeasurable` when no round succeeded.
//!
//! The loop is an explicit state machine so that every transition can be
//! driven step by step against a fake transport.

use crate::core::{
    AnchorId, LowLevelId, BACKOFF_INTERVAL_MS, MAX_RETRY, MEAS_COUNT, RESULT_VARIABLE, SETTLE_INTERVAL_MS,
    TRIGGER_VARIABLE,
};
use crate::hardware::RangingTransport;
use crate::measurement::Pause;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Retry, averaging and timing policy for directional measurements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementPolicy {
    /// Command attempts per sampling round
    pub max_retry: u32,
    /// Sampling rounds per directional measurement
    pub meas_count: u32,
    /// Pause after an accepted command before reading the result
    pub settle: Duration,
    /// Pause after a rejected command
    pub backoff: Duration,
    /// Trigger variable name
    pub trigger_variable: String,
    /// Result register name
    pub result_variable: String,
}

impl Default for MeasurementPolicy {
    fn default() -> Self {
        Self {
            max_retry: MAX_RETRY,
            meas_count: MEAS_COUNT,
            settle: Duration::from_millis(SETTLE_INTERVAL_MS),
            backoff: Duration::from_millis(BACKOFF_INTERVAL_MS),
            trigger_variable: TRIGGER_VARIABLE.to_string(),
            result_variable: RESULT_VARIABLE.to_string(),
        }
    }
}

/// States of a directional measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementState {
    /// Ready to issue the next ranging command
    Idle,
    /// Command accepted, settle pause not yet taken
    CommandSent,
    /// Settle pause elapsed, result register not yet read
    AwaitingSettle,
    /// Result register holds a usable value
    Read,
    /// Current round produced a sample
    RoundSuccess,
    /// Current round spent every attempt without a sample
    RoundFailed,
    /// All rounds spent; terminal
    Exhausted,
}

/// Final result of a directional measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeasurementOutcome {
    Distance(u64),
    Unmeasurable,
}

impl MeasurementOutcome {
    pub fn distance(&self) -> Option<u64> {
        match self {
            MeasurementOutcome::Distance(d) => Some(*d),
            MeasurementOutcome::Unmeasurable => None,
        }
    }
}

/// Outcome plus the attempt statistics of one directional measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementReport {
    pub from: AnchorId,
    pub target: LowLevelId,
    pub outcome: MeasurementOutcome,
    pub samples: Vec<u64>,
    pub attempts: u32,
    pub rejected_commands: u32,
    pub invalid_reads: u32,
}

/// State machine measuring `from`'s distance to the radio at `target`
#[derive(Debug)]
pub struct DirectionalMeasurement<'a> {
    policy: &'a MeasurementPolicy,
    from: AnchorId,
    target: LowLevelId,
    state: MeasurementState,
    round: u32,
    attempt: u32,
    pending: Option<u64>,
    samples: Vec<u64>,
    attempts: u32,
    rejected_commands: u32,
    invalid_reads: u32,
}

impl<'a> DirectionalMeasurement<'a> {
    pub fn new(policy: &'a MeasurementPolicy, from: AnchorId, target: LowLevelId) -> Self {
        let state = if policy.meas_count == 0 || policy.max_retry == 0 {
            MeasurementState::Exhausted
        } else {
            MeasurementState::Idle
        };

        Self {
            policy,
            from,
            target,
            state,
            round: 0,
            attempt: 0,
            pending: None,
            samples: Vec::new(),
            attempts: 0,
            rejected_commands: 0,
            invalid_reads: 0,
        }
    }

    pub fn state(&self) -> MeasurementState {
        self.state
    }

    /// Zero-based index of the current sampling round
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Zero-based index of the current attempt within the round
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn samples(&self) -> &[u64] {
        &self.samples
    }

    pub fn is_finished(&self) -> bool {
        self.state == MeasurementState::Exhausted
    }

    /// Perform one transition, including its side effect, and return the new state
    pub fn step<T, P>(&mut self, transport: &mut T, pause: &mut P) -> MeasurementState
    where
        T: RangingTransport + ?Sized,
        P: Pause + ?Sized,
    {
        self.state = match self.state {
            MeasurementState::Idle => self.send_command(transport, pause),
            MeasurementState::CommandSent => {
                pause.pause(self.policy.settle);
                MeasurementState::AwaitingSettle
            }
            MeasurementState::AwaitingSettle => self.read_result(transport),
            MeasurementState::Read => match self.pending.take() {
                Some(sample) => {
                    self.samples.push(sample);
                    MeasurementState::RoundSuccess
                }
                None => MeasurementState::RoundFailed,
            },
            MeasurementState::RoundSuccess | MeasurementState::RoundFailed => self.next_round(),
            MeasurementState::Exhausted => MeasurementState::Exhausted,
        };
        self.state
    }

    /// Drive the state machine to completion
    pub fn run<T, P>(mut self, transport: &mut T, pause: &mut P) -> MeasurementReport
    where
        T: RangingTransport + ?Sized,
        P: Pause + ?Sized,
    {
        while !self.is_finished() {
            self.step(transport, pause);
        }
        self.into_report()
    }

    /// Truncated mean of the accepted samples
    pub fn outcome(&self) -> MeasurementOutcome {
        if self.samples.is_empty() {
            return MeasurementOutcome::Unmeasurable;
        }
        // Summed in u128: any u64 register value is a valid sample
        let sum: u128 = self.samples.iter().map(|&s| u128::from(s)).sum();
        let mean = sum / self.samples.len() as u128;
        MeasurementOutcome::Distance(u64::try_from(mean).unwrap_or(u64::MAX))
    }

    pub fn into_report(self) -> MeasurementReport {
        MeasurementReport {
            from: self.from,
            target: self.target,
            outcome: self.outcome(),
            samples: self.samples,
            attempts: self.attempts,
            rejected_commands: self.rejected_commands,
            invalid_reads: self.invalid_reads,
        }
    }

    fn send_command<T, P>(&mut self, transport: &mut T, pause: &mut P) -> MeasurementState
    where
        T: RangingTransport + ?Sized,
        P: Pause + ?Sized,
    {
        self.attempts += 1;
        let target = Value::from(self.target.0);

        match transport.write_variable(self.from, &self.policy.trigger_variable, &target) {
            Ok(()) => MeasurementState::CommandSent,
            Err(err) => {
                debug!(
                    from = %self.from,
                    target = %self.target,
                    round = self.round,
                    attempt = self.attempt,
                    error = %err,
                    transient = err.is_transient(),
                    "ranging command rejected"
                );
                self.rejected_commands += 1;
                pause.pause(self.policy.backoff);
                self.next_attempt()
            }
        }
    }

    fn read_result<T>(&mut self, transport: &mut T) -> MeasurementState
    where
        T: RangingTransport + ?Sized,
    {
        let value = transport.read_variable(self.from, &self.policy.result_variable);

        match value.ok().as_ref().and_then(Value::as_u64).filter(|v| *v > 0) {
            Some(sample) => {
                self.pending = Some(sample);
                MeasurementState::Read
            }
            None => {
                debug!(
                    from = %self.from,
                    target = %self.target,
                    round = self.round,
                    attempt = self.attempt,
                    "result register not ready"
                );
                self.invalid_reads += 1;
                self.next_attempt()
            }
        }
    }

    fn next_attempt(&mut self) -> MeasurementState {
        self.attempt += 1;
        if self.attempt >= self.policy.max_retry {
            MeasurementState::RoundFailed
        } else {
            MeasurementState::Idle
        }
    }

    fn next_round(&mut self) -> MeasurementState {
        self.round += 1;
        self.attempt = 0;
        if self.round >= self.policy.meas_count {
            MeasurementState::Exhausted
        } else {
            MeasurementState::Idle
        }
    }
}

/// Measure one direction with the given policy
pub fn measure<T, P>(
    policy: &MeasurementPolicy,
    transport: &mut T,
    pause: &mut P,
    from: AnchorId,
    target: LowLevelId,
) -> MeasurementReport
where
    T: RangingTransport + ?Sized,
    P: Pause + ?Sized,
{
    DirectionalMeasurement::new(policy, from, target).run(transport, pause)
}
