//! Configuration validation

use super::schema::RunSpec;

/// Validation error type
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Model path does not exist: {0}")]
    ModelPathNotFound(String),

    #[error("Cluster data path does not exist: {0}")]
    ClusterDataNotFound(String),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Invalid decay: {0} (must be in [0, 1))")]
    InvalidDecay(f32),

    #[error("Invalid max_iter: {0} (must be > 0)")]
    InvalidMaxIter(usize),

    #[error("Invalid {name}: {value} (must be finite and > 0.0)")]
    InvalidStep { name: &'static str, value: f32 },

    #[error("Invalid cluster_count: {0} (must be > 0)")]
    InvalidClusterCount(usize),

    #[error("Invalid optimal_fraction: {0} (must be in (0, 1])")]
    InvalidOptimalFraction(f32),

    #[error("Invalid epsilon: {0} (must be finite and > 0.0)")]
    InvalidEpsilon(f32),

    #[error("No protected attributes given")]
    EmptyProtectedSet,

    #[error("Protected attribute {attr} out of range for {num_attrs} attributes")]
    ProtectedOutOfRange { attr: usize, num_attrs: usize },

    #[error("Protected attribute {0} listed twice")]
    DuplicateProtected(usize),

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),
}

/// Validate a run specification
///
/// Checks:
/// - File paths exist
/// - Search parameters are in range
/// - The dataset resolves to a usable protected set and constraint
pub fn validate_config(spec: &RunSpec) -> Result<(), ValidationError> {
    #[cfg(not(test))]
    {
        if !spec.model.path.exists() {
            return Err(ValidationError::ModelPathNotFound(
                spec.model.path.display().to_string(),
            ));
        }
        if !spec.data.clusters.exists() {
            return Err(ValidationError::ClusterDataNotFound(
                spec.data.clusters.display().to_string(),
            ));
        }
    }

    let search = &spec.search;
    if !(0.0..1.0).contains(&search.decay) {
        return Err(ValidationError::InvalidDecay(search.decay));
    }
    if search.max_iter == 0 {
        return Err(ValidationError::InvalidMaxIter(search.max_iter));
    }
    for (name, value) in [
        ("global_step", search.global_step),
        ("local_step", search.local_step),
    ] {
        if !(value.is_finite() && value > 0.0) {
            return Err(ValidationError::InvalidStep { name, value });
        }
    }
    if search.cluster_count == 0 {
        return Err(ValidationError::InvalidClusterCount(search.cluster_count));
    }
    if !(search.optimal_fraction > 0.0 && search.optimal_fraction <= 1.0) {
        return Err(ValidationError::InvalidOptimalFraction(
            search.optimal_fraction,
        ));
    }
    if !(search.epsilon.is_finite() && search.epsilon > 0.0) {
        return Err(ValidationError::InvalidEpsilon(search.epsilon));
    }

    let dataset = &spec.dataset;
    let protected = match (&dataset.protected_attrs, dataset.preset) {
        (Some(p), _) => p.clone(),
        (None, Some(preset)) => preset.protected_attrs().to_vec(),
        (None, None) => {
            return Err(ValidationError::InvalidDataset(
                "needs a preset or explicit protected_attrs".to_string(),
            ))
        }
    };
    let num_attrs = match (&dataset.constraint, dataset.preset) {
        (Some(c), _) => {
            c.validate()
                .map_err(|e| ValidationError::InvalidDomain(e.to_string()))?;
            c.num_attrs()
        }
        (None, Some(preset)) => preset.num_attrs(),
        (None, None) => {
            return Err(ValidationError::InvalidDataset(
                "needs a preset or an explicit constraint".to_string(),
            ))
        }
    };

    if protected.is_empty() {
        return Err(ValidationError::EmptyProtectedSet);
    }
    for (i, &attr) in protected.iter().enumerate() {
        if attr >= num_attrs {
            return Err(ValidationError::ProtectedOutOfRange { attr, num_attrs });
        }
        if protected[..i].contains(&attr) {
            return Err(ValidationError::DuplicateProtected(attr));
        }
    }

    // catches protected domains that cannot be enumerated or whose product
    // exceeds the similar-set cap
    dataset
        .resolve()
        .map_err(|e| ValidationError::InvalidDataset(e.to_string()))?;

    Ok(())
}
