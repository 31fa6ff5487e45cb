//! Communication error types for the ranging transport

use crate::core::AnchorId;
use thiserror::Error;

/// Errors raised by a ranging transport implementation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommError {
    /// The device refused the variable write
    #[error("anchor {anchor} rejected write to {variable}")]
    Rejected { anchor: AnchorId, variable: String },
    /// Anchor unknown to the device control API
    #[error("anchor {anchor} is not known to the transport")]
    UnknownAnchor { anchor: AnchorId },
    /// Connection to the device control API failed or was lost
    #[error("connection lost while talking to anchor {anchor}")]
    ConnectionLost { anchor: AnchorId },
    /// No answer within the transport deadline
    #[error("communication timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u32 },
    /// Variable does not exist or is not accessible in this direction
    #[error("variable {variable} is not accessible")]
    InvalidVariable { variable: String },
}

/// Result type for transport operations
pub type CommResult<T> = Result<T, CommError>;

impl CommError {
    /// Whether a later attempt may succeed without operator action
    pub fn is_transient(&self) -> bool {
        !matches!(self, CommError::UnknownAnchor { .. } | CommError::InvalidVariable { .. })
    }
}
