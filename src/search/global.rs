//! Global phase: diversify from each seed until a witness appears

use super::gradient::{compute_grad, Momentum};
use super::oracle::{find_boundary_pair, is_discriminatory};
use super::perturb::potential_global_x;
use super::report::{Phase, SearchReporter, SeedOutcome};
use super::similarity::similar_set;
use super::{PhaseOutput, SearchContext};
use crate::data::{Instance, ResultSet};
use crate::Result;

/// Knobs for the global phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalParams {
    pub decay: f32,
    pub max_iter: usize,
    pub step: f32,
}

/// What one seed produced
#[derive(Debug, Clone, PartialEq)]
pub struct SeedResult {
    pub witnesses: Vec<Instance>,
    pub iterations: usize,
}

/// Search outward from one seed
///
/// Each iteration tests the whole working set. Any discriminatory members end
/// the search and are returned together. Otherwise every member is expanded
/// along the momentum direction over the optimal features and the deduplicated
/// expansion becomes the next working set. Running out of iterations, or of
/// candidates, yields no witnesses.
pub fn global_search_seed(
    seed: &Instance,
    ctx: &SearchContext<'_>,
    optimal_features: &[usize],
    params: &GlobalParams,
) -> Result<SeedResult> {
    let mut working = vec![ctx.constraint.clip(seed)];
    let mut momentum = Momentum::new(seed.len(), params.decay);

    for iteration in 1..=params.max_iter {
        let mut similar_sets = Vec::with_capacity(working.len());
        let mut witnesses = Vec::new();
        for x in &working {
            let similar = similar_set(x, ctx.protected_attrs, ctx.constraint)?;
            if is_discriminatory(x, &similar, ctx.model)? {
                witnesses.push(x.clone());
            }
            similar_sets.push(similar);
        }
        if !witnesses.is_empty() {
            return Ok(SeedResult {
                witnesses,
                iterations: iteration,
            });
        }
        if iteration == params.max_iter {
            break;
        }

        let mut expansion = ResultSet::new();
        for (x, similar) in working.iter().zip(&similar_sets) {
            let pair = find_boundary_pair(x, similar, ctx.model)?;
            let grad1 = compute_grad(x, ctx.model)?;
            let grad2 = compute_grad(&pair, ctx.model)?;
            let direction = momentum.accumulate(&grad1, &grad2, ctx.protected_attrs)?;
            expansion.extend(potential_global_x(
                x,
                &direction,
                optimal_features,
                ctx.constraint,
                params.step,
            ));
        }
        if expansion.is_empty() {
            return Ok(SeedResult {
                witnesses: Vec::new(),
                iterations: iteration,
            });
        }
        working = expansion.into_vec();
    }

    Ok(SeedResult {
        witnesses: Vec::new(),
        iterations: params.max_iter,
    })
}

/// Run the global phase over every seed of one cluster
///
/// A seed that fails with a recoverable error is reported and skipped;
/// anything else aborts.
pub fn global_generation(
    seeds: &[Instance],
    ctx: &SearchContext<'_>,
    optimal_features: &[usize],
    params: &GlobalParams,
    cluster: usize,
    reporter: &mut dyn SearchReporter,
) -> Result<PhaseOutput> {
    let mut output = PhaseOutput::default();
    for (index, seed) in seeds.iter().enumerate() {
        match global_search_seed(seed, ctx, optimal_features, params) {
            Ok(result) => {
                reporter.on_seed_end(&SeedOutcome {
                    cluster,
                    seed: index,
                    iterations: result.iterations,
                    witnesses: result.witnesses.len(),
                });
                output.found.extend(result.witnesses);
            }
            Err(e) if e.is_recoverable() => {
                reporter.on_skip(Phase::Global, cluster, &e);
                output.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(output)
}
