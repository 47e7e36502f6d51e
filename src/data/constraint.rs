//! Per-attribute legal domains

use super::Instance;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Legal values of a single attribute
///
/// In YAML a range is written as a two-element list `[min, max]` and an
/// enumerated domain as `{ values: [...] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Domain {
    /// Inclusive numeric range
    Range(f32, f32),
    /// Finite set of legal values
    Values { values: Vec<f32> },
}

impl Domain {
    pub fn range(min: f32, max: f32) -> Self {
        Domain::Range(min, max)
    }

    pub fn values(values: impl Into<Vec<f32>>) -> Self {
        Domain::Values {
            values: values.into(),
        }
    }

    pub fn contains(&self, value: f32) -> bool {
        match self {
            Domain::Range(min, max) => value >= *min && value <= *max,
            Domain::Values { values } => values.iter().any(|v| *v == value),
        }
    }

    /// Map a value into the domain
    ///
    /// Ranges clamp; enumerated domains snap to the nearest legal value, the
    /// lower one on ties.
    pub fn clip(&self, value: f32) -> f32 {
        match self {
            Domain::Range(min, max) => value.clamp(*min, *max),
            Domain::Values { values } => {
                let mut best = values[0];
                for &candidate in &values[1..] {
                    let d_best = (best - value).abs();
                    let d_cand = (candidate - value).abs();
                    if d_cand < d_best || (d_cand == d_best && candidate < best) {
                        best = candidate;
                    }
                }
                best
            }
        }
    }

    /// Move `value` by `delta`, staying legal
    ///
    /// Ranges clamp. Enumerated domains snap to the nearest legal value; when
    /// that does not move in the direction of `delta` (the step is smaller
    /// than the gap to the next value) the next legal value in that direction
    /// is taken instead. At the edge of the domain the value stays put.
    pub fn step(&self, value: f32, delta: f32) -> f32 {
        let snapped = self.clip(value + delta);
        let Domain::Values { values } = self else {
            return snapped;
        };
        if delta == 0.0 || (snapped - value) * delta > 0.0 {
            return snapped;
        }
        let next = if delta > 0.0 {
            values
                .iter()
                .copied()
                .filter(|v| *v > value)
                .min_by(f32::total_cmp)
        } else {
            values
                .iter()
                .copied()
                .filter(|v| *v < value)
                .max_by(f32::total_cmp)
        };
        next.unwrap_or(snapped)
    }

    /// Number of values [`Domain::enumerate`] would produce, without building
    /// them; `None` when there are none
    pub fn cardinality(&self) -> Option<u64> {
        match self {
            Domain::Range(min, max) => {
                let lo = f64::from(*min).ceil();
                let hi = f64::from(*max).floor();
                // saturates for ranges wider than u64
                (lo <= hi).then(|| (hi - lo + 1.0) as u64)
            }
            Domain::Values { values } => {
                let mut sorted = values.clone();
                sorted.sort_by(f32::total_cmp);
                sorted.dedup();
                (!sorted.is_empty()).then_some(sorted.len() as u64)
            }
        }
    }

    /// Every legal value in ascending order
    ///
    /// Ranges enumerate their integers. Returns `None` when the domain has no
    /// integer points, which makes it unusable as a protected attribute.
    pub fn enumerate(&self) -> Option<Vec<f32>> {
        match self {
            Domain::Range(min, max) => {
                let lo = min.ceil() as i64;
                let hi = max.floor() as i64;
                (lo <= hi).then(|| (lo..=hi).map(|v| v as f32).collect())
            }
            Domain::Values { values } => {
                let mut sorted = values.clone();
                sorted.sort_by(f32::total_cmp);
                sorted.dedup();
                (!sorted.is_empty()).then_some(sorted)
            }
        }
    }

    fn check(&self, attr: usize) -> Result<()> {
        match self {
            Domain::Range(min, max) => {
                if !min.is_finite() || !max.is_finite() || min > max {
                    return Err(Error::ConfigError(format!(
                        "attribute {attr}: invalid range [{min}, {max}]"
                    )));
                }
            }
            Domain::Values { values } => {
                if values.is_empty() || values.iter().any(|v| !v.is_finite()) {
                    return Err(Error::ConfigError(format!(
                        "attribute {attr}: value set must be non-empty and finite"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Domains for every attribute of an instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Constraint {
    domains: Vec<Domain>,
}

impl Constraint {
    /// Build a constraint, checking every domain is well formed
    pub fn new(domains: Vec<Domain>) -> Result<Self> {
        for (attr, domain) in domains.iter().enumerate() {
            domain.check(attr)?;
        }
        Ok(Self { domains })
    }

    /// Integer ranges, one `[min, max]` pair per attribute
    pub fn from_ranges(ranges: &[(i32, i32)]) -> Result<Self> {
        Self::new(
            ranges
                .iter()
                .map(|&(lo, hi)| Domain::range(lo as f32, hi as f32))
                .collect(),
        )
    }

    /// Re-run the domain checks, for constraints that came through serde
    pub fn validate(&self) -> Result<()> {
        for (attr, domain) in self.domains.iter().enumerate() {
            domain.check(attr)?;
        }
        Ok(())
    }

    pub fn num_attrs(&self) -> usize {
        self.domains.len()
    }

    pub fn domain(&self, attr: usize) -> &Domain {
        &self.domains[attr]
    }

    pub fn domains(&self) -> &[Domain] {
        &self.domains
    }

    pub fn clip_value(&self, attr: usize, value: f32) -> f32 {
        self.domains[attr].clip(value)
    }

    /// [`Domain::step`] on one attribute
    pub fn step_value(&self, attr: usize, value: f32, delta: f32) -> f32 {
        self.domains[attr].step(value, delta)
    }

    /// Whether every attribute of `x` lies in its domain
    pub fn contains(&self, x: &Instance) -> bool {
        x.len() == self.domains.len()
            && x.iter()
                .zip(&self.domains)
                .all(|(v, domain)| domain.contains(*v))
    }

    /// Clip every attribute of `x` into its domain
    pub fn clip(&self, x: &Instance) -> Instance {
        let attrs: Vec<usize> = (0..self.domains.len()).collect();
        let values: Vec<f32> = x
            .iter()
            .zip(&self.domains)
            .map(|(v, domain)| domain.clip(*v))
            .collect();
        x.with_values(&attrs, &values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_clip_and_enumerate() {
        let d = Domain::range(0.0, 3.0);
        assert_eq!(d.clip(-2.0), 0.0);
        assert_eq!(d.clip(7.5), 3.0);
        assert_eq!(d.clip(1.5), 1.5);
        assert_eq!(d.enumerate().unwrap(), vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_fractional_range_enumerates_integers() {
        assert_eq!(
            Domain::range(0.5, 2.5).enumerate().unwrap(),
            vec![1.0, 2.0]
        );
        assert!(Domain::range(0.2, 0.8).enumerate().is_none());
    }

    #[test]
    fn test_value_set_snaps_to_nearest() {
        let d = Domain::values(vec![10.0, 0.0, 4.0]);
        assert_eq!(d.clip(3.0), 4.0);
        assert_eq!(d.clip(2.0), 0.0); // tie between 0 and 4 goes low
        assert_eq!(d.clip(100.0), 10.0);
        assert!(d.contains(4.0));
        assert!(!d.contains(5.0));
        assert_eq!(d.enumerate().unwrap(), vec![0.0, 4.0, 10.0]);
    }

    #[test]
    fn test_step_crosses_wide_value_gaps() {
        let d = Domain::values(vec![0.0, 5.0, 10.0]);
        // a unit step would snap straight back
        assert_eq!(d.clip(1.0), 0.0);
        assert_eq!(d.step(0.0, 1.0), 5.0);
        assert_eq!(d.step(5.0, 1.0), 10.0);
        assert_eq!(d.step(5.0, -1.0), 0.0);
        assert_eq!(d.step(10.0, 1.0), 10.0);
        assert_eq!(d.step(0.0, -1.0), 0.0);
        // a step past the next value snaps as usual
        assert_eq!(d.step(0.0, 9.0), 10.0);
    }

    #[test]
    fn test_range_step_clamps() {
        let d = Domain::range(0.0, 3.0);
        assert_eq!(d.step(2.5, 1.0), 3.0);
        assert_eq!(d.step(1.0, -1.0), 0.0);
    }

    #[test]
    fn test_cardinality_without_materializing() {
        assert_eq!(Domain::range(0.0, 3.0).cardinality(), Some(4));
        assert_eq!(Domain::range(0.5, 2.5).cardinality(), Some(2));
        assert_eq!(Domain::range(0.2, 0.8).cardinality(), None);
        assert_eq!(Domain::values(vec![4.0, 0.0, 4.0]).cardinality(), Some(2));
        let wide = Domain::range(-1e30, 1e30).cardinality().unwrap();
        assert!(wide > u64::from(u32::MAX));
    }

    #[test]
    fn test_constraint_rejects_inverted_range() {
        assert!(Constraint::from_ranges(&[(0, 1), (5, 2)]).is_err());
        assert!(Constraint::new(vec![Domain::values(Vec::new())]).is_err());
    }

    #[test]
    fn test_constraint_clip_instance() {
        let c = Constraint::from_ranges(&[(0, 1), (1, 9)]).unwrap();
        let x = Instance::new(vec![4.0, -3.0]).unwrap();
        let clipped = c.clip(&x);
        assert_eq!(clipped.values(), &[1.0, 1.0]);
        assert!(c.contains(&clipped));
        assert!(!c.contains(&x));
    }

    #[test]
    fn test_yaml_domains() {
        let yaml = "- [0, 7]\n- values: [1, 3, 5]\n";
        let c: Constraint = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(c.domain(0), &Domain::range(0.0, 7.0));
        assert_eq!(c.domain(1), &Domain::values(vec![1.0, 3.0, 5.0]));
    }
}
