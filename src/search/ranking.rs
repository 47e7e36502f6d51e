//! Bias ranking of non-protected attributes

use crate::data::{Constraint, Instance};
use crate::model::Classifier;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Non-protected attributes ordered by how strongly they move the output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasRanking {
    /// Attribute indices, most influential first
    pub ranked: Vec<usize>,
    /// Mean L1 output change per attribute, parallel to `ranked`
    pub scores: Vec<f32>,
}

/// Optimal/irrelevant partition threaded into the two search phases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSplit {
    /// High-influence attributes, stepped by the global phase
    pub optimal: Vec<usize>,
    /// Low-influence attributes, stepped by the local phase
    pub irrelevant: Vec<usize>,
}

/// Rank non-protected attributes by sensitivity over a sample
///
/// Uses the first `min(min_len, samples.len())` samples. Every non-protected
/// attribute is stepped by +1 and -1 in isolation (kept legal through
/// [`Constraint::step_value`], no-op shifts skipped) and the mean L1 change
/// of the model output is its score. Ties keep ascending index order, so
/// equal inputs give equal rankings.
pub fn sort_biased_features(
    samples: &[Instance],
    model: &dyn Classifier,
    protected_attrs: &[usize],
    constraint: &Constraint,
    min_len: usize,
) -> Result<BiasRanking> {
    let num_attrs = constraint.num_attrs();
    let used = &samples[..min_len.min(samples.len())];

    let mut totals = vec![0.0f64; num_attrs];
    let mut counts = vec![0usize; num_attrs];

    for x in used {
        if x.len() != num_attrs {
            return Err(Error::ShapeMismatch {
                expected: vec![num_attrs],
                got: vec![x.len()],
            });
        }
        let base = model.predict(x)?;
        for attr in (0..num_attrs).filter(|a| !protected_attrs.contains(a)) {
            for delta in [1.0f32, -1.0] {
                let value = constraint.step_value(attr, x[attr], delta);
                if value == x[attr] {
                    continue;
                }
                let output = model.predict(&x.with_value(attr, value))?;
                totals[attr] += f64::from((&output - &base).mapv(f32::abs).sum());
                counts[attr] += 1;
            }
        }
    }

    let mut scored: Vec<(usize, f32)> = (0..num_attrs)
        .filter(|a| !protected_attrs.contains(a))
        .map(|attr| {
            let score = if counts[attr] == 0 {
                0.0
            } else {
                (totals[attr] / counts[attr] as f64) as f32
            };
            (attr, score)
        })
        .collect();
    if let Some((attr, _)) = scored.iter().find(|(_, score)| score.is_nan()) {
        return Err(Error::Inference(format!(
            "model output is NaN while ranking attribute {attr}"
        )));
    }
    // stable sort keeps ascending index among equal scores
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    Ok(BiasRanking {
        ranked: scored.iter().map(|(attr, _)| *attr).collect(),
        scores: scored.iter().map(|(_, score)| *score).collect(),
    })
}

/// Cut a ranking into optimal (top) and irrelevant (bottom) attributes
///
/// The top `ceil(optimal_fraction * n)` attributes, at least one, are
/// optimal and the rest irrelevant. When nothing is left over the
/// lowest-ranked attribute doubles as the irrelevant set.
pub fn split_biased_features(ranking: &BiasRanking, optimal_fraction: f32) -> Result<FeatureSplit> {
    if !(optimal_fraction > 0.0 && optimal_fraction <= 1.0) {
        return Err(Error::InvalidParameter(format!(
            "optimal_fraction must be in (0, 1], got {optimal_fraction}"
        )));
    }
    let n = ranking.ranked.len();
    if n == 0 {
        return Ok(FeatureSplit {
            optimal: Vec::new(),
            irrelevant: Vec::new(),
        });
    }
    let cut = ((optimal_fraction * n as f32).ceil() as usize).clamp(1, n);
    let optimal = ranking.ranked[..cut].to_vec();
    let irrelevant = if cut < n {
        ranking.ranked[cut..].to_vec()
    } else {
        vec![ranking.ranked[n - 1]]
    };
    Ok(FeatureSplit {
        optimal,
        irrelevant,
    })
}
