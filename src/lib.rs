//! # fedig: gradient-guided individual discrimination search
//!
//! fedig looks for *individual discriminatory instances* in a trained
//! classifier: inputs whose predicted label changes when only protected
//! attributes (age, race, sex, ...) are changed.
//!
//! ## Architecture
//!
//! - **autograd**: Tape-based automatic differentiation for input gradients
//! - **model**: The [`Classifier`](model::Classifier) seam and a dense MLP
//! - **data**: Instances, domains, clustered datasets, the result set
//! - **search**: Oracle, bias ranking, momentum, global/local phases, orchestrator
//! - **config**: Declarative YAML runs, dataset presets, CLI
//! - **io**: Model, dataset and result persistence (JSON, YAML, SafeTensors)

pub mod autograd;
pub mod config;
pub mod data;
pub mod io;
pub mod model;
pub mod search;

pub mod error;

// Re-export commonly used types
pub use autograd::{backward, Tensor};
pub use data::{ClusterData, Constraint, Instance, ResultSet};
pub use error::{Error, Result};
pub use model::{Classifier, Mlp};
pub use search::{individual_discrimination_generation, FairnessConfig, SearchParams};
