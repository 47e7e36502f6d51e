//! Candidate generation along an estimated direction
//!
//! Both generators return fresh instances and keep every shifted value in
//! its domain before anything reaches the oracle: ranges clamp, enumerated
//! domains move to the next legal value in the step's direction. Candidates
//! that end up back on the base instance are dropped.

use super::gradient::Direction;
use crate::data::{Constraint, Instance};
use crate::{Error, Result};

fn shifted(x: &Instance, attr: usize, delta: f32, constraint: &Constraint) -> Option<Instance> {
    let value = constraint.step_value(attr, x[attr], delta);
    (value != x[attr]).then(|| x.with_value(attr, value))
}

/// One candidate per optimal attribute, stepped along its direction
///
/// Attributes whose direction is zero (including every protected attribute)
/// produce nothing.
pub fn potential_global_x(
    x: &Instance,
    direction: &Direction,
    optimal_features: &[usize],
    constraint: &Constraint,
    step: f32,
) -> Vec<Instance> {
    optimal_features
        .iter()
        .filter_map(|&attr| {
            let sign = direction.get(attr);
            if sign == 0.0 {
                return None;
            }
            shifted(x, attr, step * sign, constraint)
        })
        .collect()
}

/// Candidates that move only `attr`, one of the irrelevant features
///
/// A nonzero direction gives a single step in that sign; a zero direction
/// tries both signs.
pub fn potential_local_x(
    x: &Instance,
    direction: &Direction,
    attr: usize,
    irrelevant_features: &[usize],
    constraint: &Constraint,
    step: f32,
) -> Result<Vec<Instance>> {
    if !irrelevant_features.contains(&attr) {
        return Err(Error::InvalidParameter(format!(
            "attribute {attr} is not an irrelevant feature"
        )));
    }
    let sign = direction.get(attr);
    let deltas: &[f32] = if sign == 0.0 { &[1.0, -1.0] } else { &[1.0] };
    let mut candidates = Vec::with_capacity(deltas.len());
    for d in deltas {
        let delta = if sign == 0.0 { step * d } else { step * sign };
        if let Some(candidate) = shifted(x, attr, delta, constraint) {
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
    }
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Domain;
    use ndarray::arr1;

    fn inst(values: &[f32]) -> Instance {
        Instance::new(values.to_vec()).unwrap()
    }

    fn direction(signs: &[f32]) -> Direction {
        Direction::from_gradient(&arr1(signs), &[])
    }

    #[test]
    fn test_global_one_candidate_per_moving_attr() {
        let c = Constraint::from_ranges(&[(0, 10), (0, 10), (0, 10), (0, 1)]).unwrap();
        let x = inst(&[5.0, 5.0, 5.0, 0.0]);
        let d = direction(&[1.0, -1.0, 0.0, 1.0]);
        let candidates = potential_global_x(&x, &d, &[0, 1, 2], &c, 2.0);
        assert_eq!(
            candidates,
            vec![inst(&[7.0, 5.0, 5.0, 0.0]), inst(&[5.0, 3.0, 5.0, 0.0])]
        );
    }

    #[test]
    fn test_global_clips_and_drops_stuck_candidates() {
        let c = Constraint::from_ranges(&[(0, 3), (0, 3)]).unwrap();
        let x = inst(&[3.0, 2.0]);
        let d = direction(&[1.0, 1.0]);
        let candidates = potential_global_x(&x, &d, &[0, 1], &c, 5.0);
        // attr 0 is already at its max
        assert_eq!(candidates, vec![inst(&[3.0, 3.0])]);
    }

    #[test]
    fn test_sparse_value_domain_still_moves() {
        // spacing 10 > 2 · step: clipping alone would snap back every time
        let c = Constraint::new(vec![
            Domain::values(vec![0.0, 10.0, 20.0]),
            Domain::range(0.0, 1.0),
        ])
        .unwrap();
        let x = inst(&[10.0, 0.0]);
        let up = potential_global_x(&x, &direction(&[1.0, 0.0]), &[0], &c, 1.0);
        assert_eq!(up, vec![inst(&[20.0, 0.0])]);

        let both = potential_local_x(&x, &direction(&[0.0, 0.0]), 0, &[0], &c, 1.0).unwrap();
        assert_eq!(both, vec![inst(&[20.0, 0.0]), inst(&[0.0, 0.0])]);
    }

    #[test]
    fn test_local_single_attr_in_sign() {
        let c = Constraint::from_ranges(&[(0, 10), (0, 10)]).unwrap();
        let x = inst(&[5.0, 5.0]);
        let d = direction(&[-1.0, 1.0]);
        let candidates = potential_local_x(&x, &d, 0, &[0], &c, 1.0).unwrap();
        assert_eq!(candidates, vec![inst(&[4.0, 5.0])]);
    }

    #[test]
    fn test_local_zero_direction_tries_both_signs() {
        let c = Constraint::from_ranges(&[(0, 10), (0, 10)]).unwrap();
        let x = inst(&[5.0, 0.0]);
        let d = direction(&[0.0, 0.0]);
        let both = potential_local_x(&x, &d, 0, &[0, 1], &c, 1.0).unwrap();
        assert_eq!(both, vec![inst(&[6.0, 0.0]), inst(&[4.0, 0.0])]);

        // at the lower bound only the upward step survives
        let edge = potential_local_x(&x, &d, 1, &[0, 1], &c, 1.0).unwrap();
        assert_eq!(edge, vec![inst(&[5.0, 1.0])]);
    }

    #[test]
    fn test_local_rejects_foreign_attribute() {
        let c = Constraint::from_ranges(&[(0, 10), (0, 10)]).unwrap();
        let x = inst(&[5.0, 5.0]);
        assert!(potential_local_x(&x, &direction(&[1.0, 1.0]), 1, &[0], &c, 1.0).is_err());
    }
}
