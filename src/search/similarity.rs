//! Enumeration of protected-attribute substitutions

use crate::data::{Constraint, Instance};
use crate::{Error, Result};

/// Largest similar set a fairness config may produce per instance
///
/// Every oracle call labels the whole set, so the product of the protected
/// domain sizes is capped here.
pub const MAX_SIMILAR_SET: u64 = 1 << 16;

/// Size of the protected-value product, checked against [`MAX_SIMILAR_SET`]
///
/// Counts values without materializing any domain, so a huge protected
/// range is rejected before anything is allocated.
pub fn similar_set_size(protected_attrs: &[usize], constraint: &Constraint) -> Result<usize> {
    let mut total: u64 = 1;
    for &attr in protected_attrs {
        if attr >= constraint.num_attrs() {
            return Err(Error::ConfigError(format!(
                "protected attribute {attr} out of range for {} attributes",
                constraint.num_attrs()
            )));
        }
        let count = constraint.domain(attr).cardinality().ok_or_else(|| {
            Error::ConfigError(format!(
                "protected attribute {attr} has no enumerable values"
            ))
        })?;
        total = total
            .checked_mul(count)
            .filter(|t| *t <= MAX_SIMILAR_SET)
            .ok_or_else(|| {
                Error::ConfigError(format!(
                    "protected domains allow more than {MAX_SIMILAR_SET} combinations \
                     (attribute {attr} has {count} values)"
                ))
            })?;
    }
    Ok(total as usize)
}

/// Every instance reachable from `x` by changing only protected attributes
///
/// Walks the Cartesian product of the protected domains in lexicographic
/// order (first protected attribute slowest) and leaves `x` itself out.
/// Non-protected attributes are copied unchanged.
pub fn similar_set(
    x: &Instance,
    protected_attrs: &[usize],
    constraint: &Constraint,
) -> Result<Vec<Instance>> {
    if let Some(&attr) = protected_attrs.iter().find(|&&attr| attr >= x.len()) {
        return Err(Error::ConfigError(format!(
            "protected attribute {attr} out of range for {} attributes",
            x.len()
        )));
    }
    let total = similar_set_size(protected_attrs, constraint)?;
    let domains = protected_attrs
        .iter()
        .map(|&attr| {
            constraint.domain(attr).enumerate().ok_or_else(|| {
                Error::ConfigError(format!(
                    "protected attribute {attr} has no enumerable values"
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if domains.is_empty() {
        return Ok(Vec::new());
    }

    let mut similar = Vec::with_capacity(total.saturating_sub(1));
    let mut cursor = vec![0usize; domains.len()];
    let mut combo = vec![0.0f32; domains.len()];

    for _ in 0..total {
        for (slot, (values, &idx)) in combo.iter_mut().zip(domains.iter().zip(&cursor)) {
            *slot = values[idx];
        }
        let candidate = x.with_values(protected_attrs, &combo);
        if candidate != *x {
            similar.push(candidate);
        }

        // odometer increment, last position fastest
        for pos in (0..cursor.len()).rev() {
            cursor[pos] += 1;
            if cursor[pos] < domains[pos].len() {
                break;
            }
            cursor[pos] = 0;
        }
    }

    Ok(similar)
}
