//! Ranging transport trait

use crate::core::AnchorId;
use crate::hardware::CommResult;
use serde_json::Value;

/// Variable-level access to the anchors' device control API
///
/// Implementations may fail transiently; callers treat every error as a
/// rejected command and retry under their own policy.
pub trait RangingTransport {
    /// Write `value` into `variable` on `anchor`
    /// Returns Ok(()) if the device accepted the write
    fn write_variable(&mut self, anchor: AnchorId, variable: &str, value: &Value) -> CommResult<()>;

    /// Read the current content of `variable` on `anchor`
    fn read_variable(&mut self, anchor: AnchorId, variable: &str) -> CommResult<Value>;
}

impl<T: RangingTransport + ?Sized> RangingTransport for &mut T {
    fn write_variable(&mut self, anchor: AnchorId, variable: &str, value: &Value) -> CommResult<()> {
        (**self).write_variable(anchor, variable, value)
    }

    fn read_variable(&mut self, anchor: AnchorId, variable: &str) -> CommResult<Value> {
        (**self).read_variable(anchor, variable)
    }
}

impl<T: RangingTransport + ?Sized> RangingTransport for Box<T> {
    fn write_variable(&mut self, anchor: AnchorId, variable: &str, value: &Value) -> CommResult<()> {
        (**self).write_variable(anchor, variable, value)
    }

    fn read_variable(&mut self, anchor: AnchorId, variable: &str) -> CommResult<Value> {
        (**self).read_variable(anchor, variable)
    }
}
