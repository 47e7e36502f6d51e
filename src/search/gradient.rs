//! Gradient direction estimation with momentum
//!
//! A single input gradient at a discrete point is noisy, so the search keeps
//! two decayed accumulators, one for the working instance and one for its
//! contrasting pair, and steps along the sign of their sum:
//!
//! ```text
//! g1_t = decay * g1_{t-1} + ∇f(x_t)
//! g2_t = decay * g2_{t-1} + ∇f(pair_t)
//! d_t  = sign(g1_t + g2_t), protected positions forced to 0
//! ```
//!
//! The accumulators live in a [`Momentum`] value owned by one seed's search,
//! so independent searches never share state.

use crate::data::Instance;
use crate::model::Classifier;
use crate::{Error, Result};
use ndarray::Array1;
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;

/// Input gradient of the model at `x`
pub fn compute_grad(x: &Instance, model: &dyn Classifier) -> Result<Array1<f32>> {
    let grad = model.gradient(x)?;
    if grad.len() != x.len() {
        return Err(Error::ShapeMismatch {
            expected: vec![x.len()],
            got: vec![grad.len()],
        });
    }
    if let Some(attr) = grad.iter().position(|g| !g.is_finite()) {
        return Err(Error::InvalidGradient(format!(
            "non-finite gradient at attribute {attr}"
        )));
    }
    Ok(grad)
}

/// Per-attribute step sign in {-1, 0, +1}
#[derive(Debug, Clone, PartialEq)]
pub struct Direction(Vec<f32>);

impl Direction {
    /// Sign of every component, with `protected_attrs` zeroed
    pub fn from_gradient(grad: &Array1<f32>, protected_attrs: &[usize]) -> Self {
        let mut signs: Vec<f32> = grad
            .iter()
            .map(|g| {
                if *g > 0.0 {
                    1.0
                } else if *g < 0.0 {
                    -1.0
                } else {
                    0.0
                }
            })
            .collect();
        for &attr in protected_attrs {
            if let Some(s) = signs.get_mut(attr) {
                *s = 0.0;
            }
        }
        Self(signs)
    }

    pub fn get(&self, attr: usize) -> f32 {
        self.0[attr]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Decayed gradient accumulators for one search
#[derive(Debug, Clone)]
pub struct Momentum {
    decay: f32,
    grad1: Array1<f32>,
    grad2: Array1<f32>,
}

impl Momentum {
    /// Fresh accumulators of width `num_attrs`
    pub fn new(num_attrs: usize, decay: f32) -> Self {
        Self {
            decay,
            grad1: Array1::zeros(num_attrs),
            grad2: Array1::zeros(num_attrs),
        }
    }

    /// Fold in one gradient pair and return the resulting step direction
    pub fn accumulate(
        &mut self,
        grad1: &Array1<f32>,
        grad2: &Array1<f32>,
        protected_attrs: &[usize],
    ) -> Result<Direction> {
        for grad in [grad1, grad2] {
            if grad.len() != self.grad1.len() {
                return Err(Error::ShapeMismatch {
                    expected: vec![self.grad1.len()],
                    got: vec![grad.len()],
                });
            }
        }
        self.grad1 = &self.grad1 * self.decay + grad1;
        self.grad2 = &self.grad2 * self.decay + grad2;
        Ok(self.direction(protected_attrs))
    }

    /// Direction implied by the current accumulators
    pub fn direction(&self, protected_attrs: &[usize]) -> Direction {
        Direction::from_gradient(&(&self.grad1 + &self.grad2), protected_attrs)
    }

    pub fn grad1(&self) -> &Array1<f32> {
        &self.grad1
    }

    pub fn grad2(&self) -> &Array1<f32> {
        &self.grad2
    }
}

/// Selection probabilities over `candidates` from the two accumulators
///
/// Each candidate gets `|g1| + |g2| + epsilon`, normalised to sum to one.
/// The epsilon floor keeps every candidate reachable when gradients vanish.
pub fn sampling_weights(
    grad1: &Array1<f32>,
    grad2: &Array1<f32>,
    candidates: &[usize],
    epsilon: f32,
) -> Result<Vec<f32>> {
    if candidates.is_empty() {
        return Err(Error::NoSelectableAttribute(
            "candidate attribute set is empty".into(),
        ));
    }
    let raw: Vec<f32> = candidates
        .iter()
        .map(|&attr| grad1[attr].abs() + grad2[attr].abs() + epsilon)
        .collect();
    let total: f32 = raw.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return Err(Error::NoSelectableAttribute(format!(
            "weights sum to {total}"
        )));
    }
    Ok(raw.into_iter().map(|w| w / total).collect())
}

/// Draw one attribute from `candidates` with the given probabilities
pub fn pick_attribute<R: Rng>(
    candidates: &[usize],
    weights: &[f32],
    rng: &mut R,
) -> Result<usize> {
    let dist = WeightedIndex::new(weights)
        .map_err(|e| Error::NoSelectableAttribute(e.to_string()))?;
    Ok(candidates[dist.sample(rng)])
}
