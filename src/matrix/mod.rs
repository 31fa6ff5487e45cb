//! Incrementally built symmetric distance matrix

pub mod store;

pub use store::{DistanceMatrix, MissingDistancePolicy};
