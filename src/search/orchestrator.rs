//! Whole-dataset driver: rank once, then global and local search per cluster

use super::global::{global_generation, GlobalParams};
use super::local::{local_generation, LocalParams};
use super::ranking::{sort_biased_features, split_biased_features};
use super::report::{ClusterSummary, RunContext, RunSummary, SearchReporter};
use super::{FairnessConfig, SearchContext};
use crate::data::{ClusterData, Instance, ResultSet};
use crate::model::Classifier;
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Tunable parameters of a search run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// Momentum decay for the gradient accumulators, in `[0, 1)`
    pub decay: f32,
    /// Global iterations per seed
    pub max_iter: usize,
    pub global_step: f32,
    pub local_step: f32,
    /// Number of cluster buckets; every label must be below this
    pub cluster_count: usize,
    /// Samples used for the bias ranking
    pub min_sample_len: usize,
    /// Rows drawn from the dataset as seeds
    pub sample_len: usize,
    /// Share of ranked attributes treated as optimal
    pub optimal_fraction: f32,
    /// Probability floor for local attribute sampling
    pub epsilon: f32,
    /// RNG seed; `None` draws from the OS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            decay: 0.5,
            max_iter: 10,
            global_step: 1.0,
            local_step: 1.0,
            cluster_count: 4,
            min_sample_len: 1000,
            sample_len: 1000,
            optimal_fraction: 0.5,
            epsilon: 1e-6,
            seed: None,
        }
    }
}

impl SearchParams {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.decay) {
            return Err(Error::InvalidParameter(format!(
                "decay must be in [0, 1), got {}",
                self.decay
            )));
        }
        if self.max_iter == 0 {
            return Err(Error::InvalidParameter("max_iter must be > 0".into()));
        }
        for (name, step) in [("global_step", self.global_step), ("local_step", self.local_step)] {
            if !(step.is_finite() && step > 0.0) {
                return Err(Error::InvalidParameter(format!(
                    "{name} must be finite and > 0, got {step}"
                )));
            }
        }
        if self.cluster_count == 0 {
            return Err(Error::InvalidParameter("cluster_count must be > 0".into()));
        }
        if !(self.optimal_fraction > 0.0 && self.optimal_fraction <= 1.0) {
            return Err(Error::InvalidParameter(format!(
                "optimal_fraction must be in (0, 1], got {}",
                self.optimal_fraction
            )));
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "epsilon must be finite and > 0, got {}",
                self.epsilon
            )));
        }
        Ok(())
    }

    pub fn global(&self) -> GlobalParams {
        GlobalParams {
            decay: self.decay,
            max_iter: self.max_iter,
            step: self.global_step,
        }
    }

    pub fn local(&self) -> LocalParams {
        LocalParams {
            decay: self.decay,
            step: self.local_step,
            epsilon: self.epsilon,
        }
    }
}

/// Generate individual discriminatory instances for a whole dataset
///
/// Draws up to `sample_len` rows as seeds, ranks attribute bias once over the
/// dataset, buckets the seeds by cluster label, and runs the global then local
/// phase on each non-empty cluster. Every witness from either phase is merged
/// into one deduplicated set.
///
/// Shape and label problems are reported before any search starts. After
/// that, only non-recoverable errors end the run; per-seed and per-witness
/// failures are passed to `reporter` and skipped.
pub fn individual_discrimination_generation(
    data: &ClusterData,
    config: &FairnessConfig,
    model: &dyn Classifier,
    params: &SearchParams,
    reporter: &mut dyn SearchReporter,
) -> Result<ResultSet> {
    let started = Instant::now();
    params.validate()?;
    config.validate()?;
    data.check_shape()?;

    let num_attrs = config.constraint.num_attrs();
    if let Some(width) = data.num_attrs() {
        if width != num_attrs {
            return Err(Error::ConfigError(format!(
                "dataset rows have {width} attributes, constraint describes {num_attrs}"
            )));
        }
    }
    if model.num_inputs() != num_attrs {
        return Err(Error::ConfigError(format!(
            "model expects {} inputs, constraint describes {num_attrs}",
            model.num_inputs()
        )));
    }
    if let Some(label) = data
        .cluster_labels
        .iter()
        .find(|l| **l >= params.cluster_count)
    {
        return Err(Error::ConfigError(format!(
            "cluster label {label} out of range for cluster_count {}",
            params.cluster_count
        )));
    }

    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let sample_len = params.sample_len.min(data.len());
    let mut sampled = rand::seq::index::sample(&mut rng, data.len(), sample_len).into_vec();
    sampled.sort_unstable();

    let ctx = SearchContext::new(model, config);
    let ranking = sort_biased_features(
        &data.instances,
        model,
        &config.protected_attrs,
        &config.constraint,
        params.min_sample_len,
    )?;
    let split = split_biased_features(&ranking, params.optimal_fraction)?;

    let mut clusters: Vec<Vec<Instance>> = vec![Vec::new(); params.cluster_count];
    for row in sampled {
        clusters[data.cluster_labels[row]].push(data.instances[row].clone());
    }

    reporter.on_run_begin(&RunContext {
        num_attrs,
        sampled: sample_len,
        cluster_count: params.cluster_count,
        optimal_features: split.optimal.clone(),
        irrelevant_features: split.irrelevant.clone(),
    });

    let global_params = params.global();
    let local_params = params.local();
    let mut all = ResultSet::new();
    let mut clusters_searched = 0;
    let mut skipped = 0;

    for (cluster, seeds) in clusters.iter().enumerate() {
        if seeds.is_empty() {
            continue;
        }
        reporter.on_cluster_begin(cluster, seeds.len());

        let global = global_generation(seeds, &ctx, &split.optimal, &global_params, cluster, reporter)?;
        let local = local_generation(
            global.found.as_slice(),
            &ctx,
            &split.irrelevant,
            &local_params,
            cluster,
            reporter,
            &mut rng,
        )?;

        reporter.on_cluster_end(&ClusterSummary {
            cluster,
            seeds: seeds.len(),
            global_found: global.found.len(),
            local_found: local.found.len(),
            skipped: global.skipped + local.skipped,
        });
        clusters_searched += 1;
        skipped += global.skipped + local.skipped;

        all.union(global.found);
        all.union(local.found);
    }

    reporter.on_run_end(&RunSummary {
        total: all.len(),
        clusters_searched,
        skipped,
        elapsed: started.elapsed(),
    });

    Ok(all)
}
