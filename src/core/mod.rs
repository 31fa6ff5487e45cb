//! Core types and constants for anchor layout estimation

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;
