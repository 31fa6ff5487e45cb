//! Layout reconstruction algorithms

pub mod canonical;
pub mod hull;
pub mod mds;
pub mod reconstruction;

pub use canonical::{canonicalize, CanonicalParams, CanonicalTransform};
pub use hull::{convex_hull, hull_angle, HullAngleAveraging, HullError};
pub use mds::{smacof, Embedding, MdsConfig, MdsError};
pub use reconstruction::{reconstruct, Layout, ReconstructionConfig, ReconstructionError, ReconstructionResult};
