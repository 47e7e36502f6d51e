//! Declarative YAML configuration
//!
//! A run names the dataset (preset or explicit domains), the classifier,
//! the clustered seed data and the search hyperparameters.
//!
//! # Example
//!
//! ```yaml
//! dataset:
//!   preset: census
//!
//! model:
//!   path: census_model.safetensors
//!
//! data:
//!   clusters: census_clusters.json
//!
//! search:
//!   decay: 0.2
//!   max_iter: 10
//!   cluster_count: 4
//!   seed: 42
//!
//! output:
//!   path: census_idi.safetensors
//! ```

mod cli;
mod presets;
mod run;
mod schema;
mod validate;



pub use cli::{
    apply_overrides, parse_args, Cli, Command, InfoArgs, OutputFormat, RunArgs, ValidateArgs,
};
pub use presets::Preset;
pub use run::{load_config, run_from_yaml, run_spec, RunReport};
pub use schema::{DataConfig, DatasetSpec, ModelRef, OutputSpec, RunSpec};
pub use validate::{validate_config, ValidationError};
