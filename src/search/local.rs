//! Local phase: one exploitation step around each known witness

use super::gradient::{compute_grad, pick_attribute, sampling_weights, Momentum};
use super::oracle::{find_idi_pair, is_discriminatory};
use super::perturb::potential_local_x;
use super::report::{Phase, SearchReporter};
use super::similarity::similar_set;
use super::{PhaseOutput, SearchContext};
use crate::data::Instance;
use crate::Result;
use rand::Rng;

/// Knobs for the local phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalParams {
    pub decay: f32,
    pub step: f32,
    /// Probability floor added to every irrelevant attribute
    pub epsilon: f32,
}

/// New witnesses one step away from `witness`
///
/// The attribute to move is drawn from the irrelevant features with
/// probability proportional to the summed gradient magnitude of the witness
/// and its idi pair. Returns nothing if `witness` has no idi pair.
pub fn local_search_witness<R: Rng>(
    witness: &Instance,
    ctx: &SearchContext<'_>,
    irrelevant_features: &[usize],
    params: &LocalParams,
    rng: &mut R,
) -> Result<Vec<Instance>> {
    let similar = similar_set(witness, ctx.protected_attrs, ctx.constraint)?;
    let Some(pair) = find_idi_pair(witness, &similar, ctx.model, rng)? else {
        return Ok(Vec::new());
    };

    let mut momentum = Momentum::new(witness.len(), params.decay);
    let direction = momentum.accumulate(
        &compute_grad(witness, ctx.model)?,
        &compute_grad(&pair, ctx.model)?,
        ctx.protected_attrs,
    )?;
    let weights = sampling_weights(
        momentum.grad1(),
        momentum.grad2(),
        irrelevant_features,
        params.epsilon,
    )?;
    let attr = pick_attribute(irrelevant_features, &weights, rng)?;

    let mut found = Vec::new();
    for candidate in potential_local_x(
        witness,
        &direction,
        attr,
        irrelevant_features,
        ctx.constraint,
        params.step,
    )? {
        let similar = similar_set(&candidate, ctx.protected_attrs, ctx.constraint)?;
        if is_discriminatory(&candidate, &similar, ctx.model)? {
            found.push(candidate);
        }
    }
    Ok(found)
}

/// Run the local phase over every witness the global phase found
pub fn local_generation<R: Rng>(
    witnesses: &[Instance],
    ctx: &SearchContext<'_>,
    irrelevant_features: &[usize],
    params: &LocalParams,
    cluster: usize,
    reporter: &mut dyn SearchReporter,
    rng: &mut R,
) -> Result<PhaseOutput> {
    let mut output = PhaseOutput::default();
    for witness in witnesses {
        match local_search_witness(witness, ctx, irrelevant_features, params, rng) {
            Ok(found) => output.found.extend(found),
            Err(e) if e.is_recoverable() => {
                reporter.on_skip(Phase::Local, cluster, &e);
                output.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(output)
}
