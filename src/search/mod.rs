//! Gradient-guided discrimination search
//!
//! ## Pipeline
//!
//! 1. [`sort_biased_features`] ranks non-protected attributes once per run and
//!    [`split_biased_features`] cuts them into optimal and irrelevant sets.
//! 2. [`global_generation`] walks each seed along the momentum direction over
//!    the optimal features until a discriminatory instance appears.
//! 3. [`local_generation`] takes one weighted step over the irrelevant
//!    features around each witness.
//! 4. [`individual_discrimination_generation`] drives both phases per cluster
//!    and merges everything into one [`ResultSet`](crate::data::ResultSet).
//!
//! [`image_idi_generation`] runs the same phases over images, with the pixels
//! of a face box as the protected features.
//!
//! The leaves ([`similar_set`], [`is_discriminatory`], [`Momentum`], the
//! perturbation generators) are pure functions of their inputs and the
//! read-only model.

mod global;
mod gradient;
mod image;
mod local;
mod oracle;
mod orchestrator;
mod perturb;
mod ranking;
mod report;
mod similarity;


pub use global::{global_generation, global_search_seed, GlobalParams, SeedResult};
pub use gradient::{compute_grad, pick_attribute, sampling_weights, Direction, Momentum};
pub use image::{
    image_idi_generation, BoundingBox, FaceImage, ImageOutput, ImageParams, ImageSearch, ImageShape,
};
pub use local::{local_generation, local_search_witness, LocalParams};
pub use oracle::{find_boundary_pair, find_idi_pair, is_discriminatory};
pub use orchestrator::{individual_discrimination_generation, SearchParams};
pub use perturb::{potential_global_x, potential_local_x};
pub use ranking::{sort_biased_features, split_biased_features, BiasRanking, FeatureSplit};
pub use report::{
    ClusterSummary, NoopReporter, Phase, RecordingReporter, RunContext, RunSummary,
    SearchReporter, SeedOutcome, TracingReporter,
};
pub use similarity::{similar_set, similar_set_size, MAX_SIMILAR_SET};

use crate::data::{Constraint, ResultSet};
use crate::model::Classifier;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Which attributes are protected and what values every attribute may take
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairnessConfig {
    pub protected_attrs: Vec<usize>,
    pub constraint: Constraint,
}

impl FairnessConfig {
    pub fn new(protected_attrs: Vec<usize>, constraint: Constraint) -> Result<Self> {
        let config = Self {
            protected_attrs,
            constraint,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check protected indices are in range, distinct and enumerable, and
    /// that their similar sets stay within [`MAX_SIMILAR_SET`]
    pub fn validate(&self) -> Result<()> {
        self.constraint.validate()?;
        if self.protected_attrs.is_empty() {
            return Err(Error::ConfigError("no protected attributes given".into()));
        }
        for (i, &attr) in self.protected_attrs.iter().enumerate() {
            if attr >= self.constraint.num_attrs() {
                return Err(Error::ConfigError(format!(
                    "protected attribute {attr} out of range for {} attributes",
                    self.constraint.num_attrs()
                )));
            }
            if self.protected_attrs[..i].contains(&attr) {
                return Err(Error::ConfigError(format!(
                    "protected attribute {attr} listed twice"
                )));
            }
        }
        similar_set_size(&self.protected_attrs, &self.constraint)?;
        Ok(())
    }
}

/// Model plus fairness config, shared read-only by every search step
#[derive(Clone, Copy)]
pub struct SearchContext<'a> {
    pub model: &'a dyn Classifier,
    pub protected_attrs: &'a [usize],
    pub constraint: &'a Constraint,
}

impl<'a> SearchContext<'a> {
    pub fn new(model: &'a dyn Classifier, config: &'a FairnessConfig) -> Self {
        Self {
            model,
            protected_attrs: &config.protected_attrs,
            constraint: &config.constraint,
        }
    }
}

/// Witnesses found by one phase over one cluster
#[derive(Debug, Clone, Default)]
pub struct PhaseOutput {
    pub found: ResultSet,
    /// Seeds or witnesses dropped after a recoverable error
    pub skipped: usize,
}
