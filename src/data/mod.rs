//! Value types the search operates on
//!
//! - [`Instance`]: an immutable attribute vector with exact-value identity
//! - [`ResultSet`]: the deduplicated, monotonically growing output
//! - [`Constraint`]: per-attribute legal domains used for clipping
//! - [`ClusterData`]: dataset rows plus precomputed cluster labels

mod cluster;
mod constraint;
mod instance;

pub use cluster::ClusterData;
pub use constraint::{Constraint, Domain};
pub use instance::{Instance, ResultSet};
