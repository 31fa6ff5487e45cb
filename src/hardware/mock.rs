//! Scripted transport for testing the measurement protocol without hardware

use crate::core::AnchorId;
use crate::hardware::{CommError, CommResult, RangingTransport};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};

/// Outcome of a scripted variable write
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WriteResponse {
    Accept,
    Reject,
}

/// Transport that replays queued write outcomes and register values per anchor
///
/// When a queue runs dry, writes are accepted and reads return `null`.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    writes: HashMap<AnchorId, VecDeque<WriteResponse>>,
    reads: HashMap<AnchorId, VecDeque<Value>>,
    sent_commands: Vec<(AnchorId, String, Value)>,
    read_count: usize,
    connected: bool,
}

impl ScriptedTransport {
    /// Create a new scripted transport
    pub fn new() -> Self {
        Self {
            connected: true,
            ..Default::default()
        }
    }

    /// Queue write outcomes for `anchor`
    pub fn push_writes<I: IntoIterator<Item = WriteResponse>>(&mut self, anchor: AnchorId, responses: I) {
        self.writes.entry(anchor).or_default().extend(responses);
    }

    /// Queue result register contents for `anchor`
    pub fn push_reads<I: IntoIterator<Item = Value>>(&mut self, anchor: AnchorId, values: I) {
        self.reads.entry(anchor).or_default().extend(values);
    }

    /// Convenience for queueing integer register values
    pub fn push_results(&mut self, anchor: AnchorId, values: &[i64]) {
        self.push_reads(anchor, values.iter().map(|v| Value::from(*v)));
    }

    /// Simulate loss of the device control API
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    /// Restore the device control API
    pub fn reconnect(&mut self) {
        self.connected = true;
    }

    /// Every write issued so far, in order
    pub fn sent_commands(&self) -> &[(AnchorId, String, Value)] {
        &self.sent_commands
    }

    /// Number of register reads issued so far
    pub fn read_count(&self) -> usize {
        self.read_count
    }
}

impl RangingTransport for ScriptedTransport {
    fn write_variable(&mut self, anchor: AnchorId, variable: &str, value: &Value) -> CommResult<()> {
        self.sent_commands.push((anchor, variable.to_string(), value.clone()));

        if !self.connected {
            return Err(CommError::ConnectionLost { anchor });
        }

        let response = self
            .writes
            .get_mut(&anchor)
            .and_then(VecDeque::pop_front)
            .unwrap_or(WriteResponse::Accept);

        match response {
            WriteResponse::Accept => Ok(()),
            WriteResponse::Reject => Err(CommError::Rejected {
                anchor,
                variable: variable.to_string(),
            }),
        }
    }

    fn read_variable(&mut self, anchor: AnchorId, _variable: &str) -> CommResult<Value> {
        self.read_count += 1;

        if !self.connected {
            return Err(CommError::ConnectionLost { anchor });
        }

        Ok(self
            .reads
            .get_mut(&anchor)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Value::Null))
    }
}
