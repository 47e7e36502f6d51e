//! Single-command search runs from YAML configuration

use super::schema::RunSpec;
use super::validate::validate_config;
use crate::error::{Error, Result};
use crate::io::{load_cluster_data, load_model, save_instances};
use crate::search::{individual_discrimination_generation, SearchReporter, TracingReporter};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Distinct discriminatory instances found
    pub found: usize,
    pub num_attrs: usize,
    /// Where the instances were written
    pub output: PathBuf,
}

/// Load run spec from YAML file (without searching)
///
/// Useful for testing config parsing and validation separately from the search.
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<RunSpec> {
    let yaml_content = fs::read_to_string(config_path.as_ref()).map_err(|e| {
        Error::ConfigError(format!(
            "Failed to read config file {}: {}",
            config_path.as_ref().display(),
            e
        ))
    })?;

    let spec: RunSpec = serde_yaml::from_str(&yaml_content)
        .map_err(|e| Error::ConfigError(format!("Failed to parse YAML config: {e}")))?;

    validate_config(&spec).map_err(|e| Error::ConfigError(format!("Invalid config: {e}")))?;

    Ok(spec)
}

/// Execute a validated spec: load artifacts, search, persist the result set
pub fn run_spec(spec: &RunSpec, reporter: &mut dyn SearchReporter) -> Result<RunReport> {
    let config = spec.dataset.resolve()?;
    let model = load_model(&spec.model.path)?;
    let data = load_cluster_data(&spec.data.clusters)?;
    info!(
        model = %spec.model.path.display(),
        rows = data.len(),
        clusters = data.cluster_count(),
        "artifacts loaded"
    );

    let found = individual_discrimination_generation(&data, &config, &model, &spec.search, reporter)?;

    let num_attrs = config.constraint.num_attrs();
    if let Some(parent) = spec.output.path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    save_instances(found.as_slice(), num_attrs, &spec.output.path)?;
    info!(
        found = found.len(),
        output = %spec.output.path.display(),
        "result set saved"
    );

    Ok(RunReport {
        found: found.len(),
        num_attrs,
        output: spec.output.path.clone(),
    })
}

/// Run a search from YAML configuration file
///
/// # Example
///
/// ```no_run
/// use fedig::config::run_from_yaml;
///
/// let report = run_from_yaml("census.yaml")?;
/// println!("{} instances", report.found);
/// # Ok::<(), fedig::Error>(())
/// ```
pub fn run_from_yaml<P: AsRef<Path>>(config_path: P) -> Result<RunReport> {
    let spec = load_config(config_path)?;
    run_spec(&spec, &mut TracingReporter)
}
