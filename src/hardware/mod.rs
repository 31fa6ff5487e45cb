//! Hardware abstraction layer for the ranging transport
//!
//! The device control API is reached through variables on each anchor: a
//! write-only trigger that starts a two-way ranging exchange toward a
//! low-level id, and a read-only result register.

pub mod transport;
pub mod mock;
pub mod simulated;
pub mod error;

pub use transport::RangingTransport;
pub use mock::{ScriptedTransport, WriteResponse};
pub use simulated::{SimulatedField, SimulationConfig};
pub use error::{CommError, CommResult};
