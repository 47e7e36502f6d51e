//! Instances and the deduplicated result set

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

/// One point in a classifier's input space
///
/// Immutable: every perturbation builds a new instance. Equality and hashing
/// compare the stored `f32` bit patterns, with `-0.0` folded into `0.0` on
/// construction and NaN rejected, so two instances are equal exactly when
/// every attribute value is identical.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct Instance {
    values: Vec<f32>,
}

fn canonical(value: f32) -> f32 {
    if value == 0.0 {
        0.0
    } else {
        value
    }
}

impl Instance {
    /// Build an instance, rejecting NaN attribute values
    pub fn new(values: Vec<f32>) -> Result<Self> {
        if let Some(pos) = values.iter().position(|v| v.is_nan()) {
            return Err(Error::InvalidParameter(format!(
                "attribute {pos} is NaN"
            )));
        }
        Ok(Self {
            values: values.into_iter().map(canonical).collect(),
        })
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Copy of this instance with one attribute replaced
    pub fn with_value(&self, attr: usize, value: f32) -> Self {
        let mut values = self.values.clone();
        values[attr] = canonical(value);
        Self { values }
    }

    /// Copy of this instance with several attributes replaced
    pub fn with_values(&self, attrs: &[usize], values: &[f32]) -> Self {
        let mut out = self.values.clone();
        for (&attr, &value) in attrs.iter().zip(values) {
            out[attr] = canonical(value);
        }
        Self { values: out }
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.values
    }
}

impl Deref for Instance {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.values
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl Eq for Instance {}

impl Hash for Instance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.values.len().hash(state);
        for v in &self.values {
            v.to_bits().hash(state);
        }
    }
}

impl TryFrom<Vec<f32>> for Instance {
    type Error = Error;

    fn try_from(values: Vec<f32>) -> Result<Self> {
        Self::new(values)
    }
}

impl From<Instance> for Vec<f32> {
    fn from(instance: Instance) -> Self {
        instance.values
    }
}

/// Insertion-ordered set of instances, grown only by union
#[derive(Clone, Debug, Default)]
pub struct ResultSet {
    seen: HashSet<Instance>,
    ordered: Vec<Instance>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an instance, returning `false` if an identical one is present
    pub fn insert(&mut self, instance: Instance) -> bool {
        if self.seen.contains(&instance) {
            return false;
        }
        self.seen.insert(instance.clone());
        self.ordered.push(instance);
        true
    }

    /// Union another set into this one, returning how many were new
    pub fn union(&mut self, other: ResultSet) -> usize {
        other
            .ordered
            .into_iter()
            .map(|instance| self.insert(instance))
            .filter(|inserted| *inserted)
            .count()
    }

    pub fn contains(&self, instance: &Instance) -> bool {
        self.seen.contains(instance)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instance> {
        self.ordered.iter()
    }

    pub fn as_slice(&self) -> &[Instance] {
        &self.ordered
    }

    pub fn into_vec(self) -> Vec<Instance> {
        self.ordered
    }
}

impl Extend<Instance> for ResultSet {
    fn extend<T: IntoIterator<Item = Instance>>(&mut self, iter: T) {
        for instance in iter {
            self.insert(instance);
        }
    }
}

impl FromIterator<Instance> for ResultSet {
    fn from_iter<T: IntoIterator<Item = Instance>>(iter: T) -> Self {
        let mut set = ResultSet::new();
        set.extend(iter);
        set
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Instance;
    type IntoIter = std::slice::Iter<'a, Instance>;

    fn into_iter(self) -> Self::IntoIter {
        self.ordered.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst(values: &[f32]) -> Instance {
        Instance::new(values.to_vec()).unwrap()
    }

    #[test]
    fn test_rejects_nan() {
        assert!(Instance::new(vec![1.0, f32::NAN]).is_err());
    }

    #[test]
    fn test_negative_zero_equals_zero() {
        assert_eq!(inst(&[-0.0, 1.0]), inst(&[0.0, 1.0]));
        assert_eq!(inst(&[1.0, 2.0]).with_value(0, -0.0), inst(&[0.0, 2.0]));
    }

    #[test]
    fn test_with_value_leaves_original_untouched() {
        let x = inst(&[1.0, 2.0, 3.0]);
        let y = x.with_value(1, 7.0);
        assert_eq!(x.values(), &[1.0, 2.0, 3.0]);
        assert_eq!(y.values(), &[1.0, 7.0, 3.0]);

        let z = x.with_values(&[0, 2], &[4.0, 5.0]);
        assert_eq!(z.values(), &[4.0, 2.0, 5.0]);
    }

    #[test]
    fn test_result_set_dedup_keeps_first_order() {
        let mut set = ResultSet::new();
        assert!(set.insert(inst(&[1.0, 2.0])));
        assert!(set.insert(inst(&[3.0, 4.0])));
        assert!(!set.insert(inst(&[1.0, 2.0])));
        assert_eq!(set.len(), 2);
        assert_eq!(set.as_slice()[0], inst(&[1.0, 2.0]));
    }

    #[test]
    fn test_result_set_union_counts_new() {
        let mut a: ResultSet = vec![inst(&[1.0]), inst(&[2.0])].into_iter().collect();
        let b: ResultSet = vec![inst(&[2.0]), inst(&[3.0])].into_iter().collect();
        assert_eq!(a.union(b), 1);
        assert_eq!(a.len(), 3);
        assert!(a.contains(&inst(&[3.0])));
    }

    #[test]
    fn test_serde_as_plain_array() {
        let x = inst(&[1.5, 0.0]);
        let json = serde_json::to_string(&x).unwrap();
        assert_eq!(json, "[1.5,0.0]");
        let back: Instance = serde_json::from_str(&json).unwrap();
        assert_eq!(back, x);
    }
}
