//! fedig CLI
//!
//! # Usage
//!
//! ```bash
//! # Search from config
//! fedig run census.yaml
//!
//! # Search with overrides
//! fedig run census.yaml --seed 7 --max-iter 20
//!
//! # Validate config
//! fedig validate census.yaml --detailed
//!
//! # Show resolved config
//! fedig info census.yaml --format json
//! ```

use clap::Parser;
use fedig::config::{
    apply_overrides, load_config, run_spec, Cli, Command, InfoArgs, OutputFormat, RunArgs,
    ValidateArgs,
};
use fedig::search::TracingReporter;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Command::Run(args) => run_search(args, cli.quiet),
        Command::Validate(args) => run_validate(args),
        Command::Info(args) => run_info(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run_search(args: RunArgs, quiet: bool) -> Result<(), String> {
    tracing::info!(config = %args.config.display(), "starting search");

    let mut spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;
    apply_overrides(&mut spec, &args);
    spec.search
        .validate()
        .map_err(|e| format!("Config error: {e}"))?;

    let report = run_spec(&spec, &mut TracingReporter).map_err(|e| format!("Search error: {e}"))?;

    if !quiet {
        println!(
            "{} discriminatory instances written to {}",
            report.found,
            report.output.display()
        );
    }
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    tracing::info!(config = %args.config.display(), "validating config");

    let spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;
    let config = spec
        .dataset
        .resolve()
        .map_err(|e| format!("Validation failed: {e}"))?;

    println!("Configuration is valid");

    if args.detailed {
        println!();
        println!("Configuration Summary:");
        if let Some(preset) = spec.dataset.preset {
            println!("  Dataset preset: {preset}");
        }
        println!("  Attributes: {}", config.constraint.num_attrs());
        println!("  Protected: {:?}", config.protected_attrs);
        println!();
        println!("  Model path: {}", spec.model.path.display());
        println!("  Cluster data: {}", spec.data.clusters.display());
        println!();
        println!("  Decay: {}", spec.search.decay);
        println!("  Max iterations: {}", spec.search.max_iter);
        println!(
            "  Steps: global {}, local {}",
            spec.search.global_step, spec.search.local_step
        );
        println!("  Clusters: {}", spec.search.cluster_count);
        println!(
            "  Samples: {} seeds, {} for ranking",
            spec.search.sample_len, spec.search.min_sample_len
        );
        println!("  Optimal fraction: {}", spec.search.optimal_fraction);
        match spec.search.seed {
            Some(seed) => println!("  Seed: {seed}"),
            None => println!("  Seed: from OS"),
        }
        println!("  Output: {}", spec.output.path.display());
    }

    Ok(())
}

fn run_info(args: InfoArgs) -> Result<(), String> {
    let spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;

    match args.format {
        OutputFormat::Text => {
            let config = spec
                .dataset
                .resolve()
                .map_err(|e| format!("Config error: {e}"))?;
            println!("Configuration Info:");
            println!();
            println!("Model: {}", spec.model.path.display());
            println!("Clusters: {}", spec.data.clusters.display());
            println!(
                "Attributes: {} ({} protected: {:?})",
                config.constraint.num_attrs(),
                config.protected_attrs.len(),
                config.protected_attrs
            );
            for (attr, domain) in config.constraint.domains().iter().enumerate() {
                let marker = if config.protected_attrs.contains(&attr) { "*" } else { " " };
                println!("  {marker}{attr:>3}: {domain:?}");
            }
            println!(
                "Search: decay={} max_iter={} cluster_count={}",
                spec.search.decay, spec.search.max_iter, spec.search.cluster_count
            );
            println!("Output: {}", spec.output.path.display());
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&spec)
                .map_err(|e| format!("JSON serialization error: {e}"))?;
            println!("{json}");
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(&spec)
                .map_err(|e| format!("YAML serialization error: {e}"))?;
            println!("{yaml}");
        }
    }

    Ok(())
}
