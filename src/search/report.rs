//! Progress reporting for a search run
//!
//! The search itself never logs directly; it calls a [`SearchReporter`] at
//! fixed checkpoints:
//! - `on_run_begin` / `on_run_end`
//! - `on_cluster_begin` / `on_cluster_end`
//! - `on_seed_end` after every global seed
//! - `on_skip` whenever a seed or witness is dropped after an error
//!
//! # Example
//!
//! ```rust
//! use fedig::search::{ClusterSummary, SearchReporter};
//!
//! struct CountClusters(usize);
//!
//! impl SearchReporter for CountClusters {
//!     fn on_cluster_end(&mut self, _summary: &ClusterSummary) {
//!         self.0 += 1;
//!     }
//! }
//! ```

use crate::Error;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Which search phase a checkpoint belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Global,
    Local,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Global => "global",
            Phase::Local => "local",
        }
    }
}

/// State at the start of a run
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub num_attrs: usize,
    pub sampled: usize,
    pub cluster_count: usize,
    pub optimal_features: Vec<usize>,
    pub irrelevant_features: Vec<usize>,
}

/// Outcome of one global seed
#[derive(Debug, Clone, Default)]
pub struct SeedOutcome {
    pub cluster: usize,
    pub seed: usize,
    /// Iterations used before a witness was found or the budget ran out
    pub iterations: usize,
    pub witnesses: usize,
}

/// Outcome of one cluster
#[derive(Debug, Clone, Default)]
pub struct ClusterSummary {
    pub cluster: usize,
    pub seeds: usize,
    pub global_found: usize,
    pub local_found: usize,
    pub skipped: usize,
}

/// Outcome of the whole run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub total: usize,
    pub clusters_searched: usize,
    pub skipped: usize,
    pub elapsed: Duration,
}

/// Checkpoint hooks for a search run
///
/// All methods default to no-ops.
pub trait SearchReporter {
    fn on_run_begin(&mut self, _ctx: &RunContext) {}

    fn on_cluster_begin(&mut self, _cluster: usize, _seeds: usize) {}

    fn on_seed_end(&mut self, _outcome: &SeedOutcome) {}

    /// A seed (global) or witness (local) was dropped after a recoverable error
    fn on_skip(&mut self, _phase: Phase, _cluster: usize, _error: &Error) {}

    fn on_cluster_end(&mut self, _summary: &ClusterSummary) {}

    fn on_run_end(&mut self, _summary: &RunSummary) {}
}

/// Discards every checkpoint
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl SearchReporter for NoopReporter {}

/// Emits checkpoints as `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl SearchReporter for TracingReporter {
    fn on_run_begin(&mut self, ctx: &RunContext) {
        info!(
            num_attrs = ctx.num_attrs,
            sampled = ctx.sampled,
            clusters = ctx.cluster_count,
            optimal = ?ctx.optimal_features,
            irrelevant = ?ctx.irrelevant_features,
            "search started"
        );
    }

    fn on_cluster_begin(&mut self, cluster: usize, seeds: usize) {
        info!(cluster, seeds, "cluster started");
    }

    fn on_seed_end(&mut self, outcome: &SeedOutcome) {
        debug!(
            cluster = outcome.cluster,
            seed = outcome.seed,
            iterations = outcome.iterations,
            witnesses = outcome.witnesses,
            "seed finished"
        );
    }

    fn on_skip(&mut self, phase: Phase, cluster: usize, error: &Error) {
        warn!(phase = phase.as_str(), cluster, %error, "skipped after error");
    }

    fn on_cluster_end(&mut self, summary: &ClusterSummary) {
        info!(
            cluster = summary.cluster,
            global = summary.global_found,
            local = summary.local_found,
            skipped = summary.skipped,
            "cluster finished"
        );
    }

    fn on_run_end(&mut self, summary: &RunSummary) {
        info!(
            total = summary.total,
            clusters = summary.clusters_searched,
            skipped = summary.skipped,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "search finished"
        );
    }
}

/// Keeps every checkpoint in memory, for tests and callers that post-process
#[derive(Debug, Default, Clone)]
pub struct RecordingReporter {
    pub run: Option<RunContext>,
    pub seeds: Vec<SeedOutcome>,
    pub clusters: Vec<ClusterSummary>,
    pub skips: Vec<(Phase, usize, String)>,
    pub summary: Option<RunSummary>,
}

impl SearchReporter for RecordingReporter {
    fn on_run_begin(&mut self, ctx: &RunContext) {
        self.run = Some(ctx.clone());
    }

    fn on_seed_end(&mut self, outcome: &SeedOutcome) {
        self.seeds.push(outcome.clone());
    }

    fn on_skip(&mut self, phase: Phase, cluster: usize, error: &Error) {
        self.skips.push((phase, cluster, error.to_string()));
    }

    fn on_cluster_end(&mut self, summary: &ClusterSummary) {
        self.clusters.push(summary.clone());
    }

    fn on_run_end(&mut self, summary: &RunSummary) {
        self.summary = Some(summary.clone());
    }
}
