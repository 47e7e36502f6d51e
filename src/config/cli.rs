//! CLI argument parsing and validation
//!
//! # Usage
//!
//! ```bash
//! fedig run census.yaml
//! fedig run census.yaml --seed 7 --max-iter 20 --output ./out/idi.safetensors
//! fedig validate census.yaml --detailed
//! fedig info census.yaml --format json
//! ```

use super::schema::RunSpec;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fedig: gradient-guided individual discrimination search
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "fedig")]
#[command(version)]
#[command(about = "Search trained classifiers for individual discriminatory instances")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run a search from YAML configuration
    Run(RunArgs),

    /// Validate a configuration file without searching
    Validate(ValidateArgs),

    /// Display the resolved dataset and search settings
    Info(InfoArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct RunArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Override output path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override momentum decay
    #[arg(long)]
    pub decay: Option<f32>,

    /// Override global iterations per seed
    #[arg(long)]
    pub max_iter: Option<usize>,

    /// Override number of sampled seed rows
    #[arg(long)]
    pub sample_len: Option<usize>,

    /// Random seed for reproducibility
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Show detailed validation report
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for the info command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct InfoArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Output format (text, json, yaml)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Output format for info command
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            _ => Err(format!(
                "Unknown output format: {s}. Valid formats: text, json, yaml"
            )),
        }
    }
}

/// Parse CLI arguments from a string slice (for testing)
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Apply command-line overrides to a RunSpec
pub fn apply_overrides(spec: &mut RunSpec, args: &RunArgs) {
    if let Some(output) = &args.output {
        spec.output.path = output.clone();
    }
    if let Some(decay) = args.decay {
        spec.search.decay = decay;
    }
    if let Some(max_iter) = args.max_iter {
        spec.search.max_iter = max_iter;
    }
    if let Some(sample_len) = args.sample_len {
        spec.search.sample_len = sample_len;
    }
    if let Some(seed) = args.seed {
        spec.search.seed = Some(seed);
    }
}
