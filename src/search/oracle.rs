//! Discrimination oracle and contrasting-pair finders

use crate::data::Instance;
use crate::model::Classifier;
use crate::Result;
use rand::Rng;

/// Whether any member of `similar` gets a different label from `x`
///
/// The similar set is labelled in one batch and inference errors propagate.
///
/// An empty set is never discriminatory, and `x` is not run through the model
/// at all in that case: an `x` the model would reject (wrong width, failing
/// inference) comes back as `Ok(false)`, not as an error. Callers that need
/// `x` checked must label it themselves.
pub fn is_discriminatory(x: &Instance, similar: &[Instance], model: &dyn Classifier) -> Result<bool> {
    if similar.is_empty() {
        return Ok(false);
    }
    let label = model.label(x)?;
    Ok(model.labels(similar)?.into_iter().any(|l| l != label))
}

/// Member of `similar` whose output is farthest (L1) from `x`'s output
///
/// This is the instance closest to crossing the decision boundary relative
/// to `x`. Returns `x` itself for an empty set.
pub fn find_boundary_pair(
    x: &Instance,
    similar: &[Instance],
    model: &dyn Classifier,
) -> Result<Instance> {
    let base = model.predict(x)?;
    let mut best: Option<(f32, &Instance)> = None;
    for candidate in similar {
        let output = model.predict(candidate)?;
        let distance: f32 = (&output - &base).mapv(f32::abs).sum();
        if best.map_or(true, |(d, _)| distance > d) {
            best = Some((distance, candidate));
        }
    }
    Ok(best.map_or_else(|| x.clone(), |(_, pair)| pair.clone()))
}

/// A uniformly chosen member of `similar` labelled differently from `x`
///
/// `None` when `x` is not discriminatory.
pub fn find_idi_pair<R: Rng>(
    x: &Instance,
    similar: &[Instance],
    model: &dyn Classifier,
    rng: &mut R,
) -> Result<Option<Instance>> {
    if similar.is_empty() {
        return Ok(None);
    }
    let label = model.label(x)?;
    let labels = model.labels(similar)?;
    let pairs: Vec<&Instance> = similar
        .iter()
        .zip(labels)
        .filter(|(_, l)| *l != label)
        .map(|(s, _)| s)
        .collect();
    if pairs.is_empty() {
        return Ok(None);
    }
    Ok(Some(pairs[rng.random_range(0..pairs.len())].clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tests::RuleModel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn inst(values: &[f32]) -> Instance {
        Instance::new(values.to_vec()).unwrap()
    }

    #[test]
    fn test_empty_set_is_not_discriminatory() {
        let model = RuleModel::new(2, |x| x[1]);
        assert!(!is_discriminatory(&inst(&[0.0, 1.0]), &[], &model).unwrap());
    }

    #[test]
    fn test_empty_set_skips_inference_on_x() {
        // x has the wrong width, but with nothing to compare it is never labelled
        let model = RuleModel::new(3, |x| x[0]);
        assert!(!is_discriminatory(&inst(&[1.0]), &[], &model).unwrap());
        assert!(model.label(&inst(&[1.0])).is_err());
    }

    #[test]
    fn test_label_flip_is_discriminatory() {
        let model = RuleModel::new(2, |x| if x[1] == 1.0 { 1.0 } else { 0.0 });
        let x = inst(&[3.0, 0.0]);
        assert!(is_discriminatory(&x, &[inst(&[3.0, 1.0])], &model).unwrap());
        assert!(!is_discriminatory(&x, &[inst(&[4.0, 0.0])], &model).unwrap());
    }

    #[test]
    fn test_inference_error_propagates() {
        let model = RuleModel::new(3, |x| x[0]);
        assert!(is_discriminatory(&inst(&[1.0]), &[inst(&[2.0])], &model).is_err());
    }

    #[test]
    fn test_boundary_pair_takes_largest_output_change() {
        let model = RuleModel::new(2, |x| 0.1 * x[1]);
        let x = inst(&[0.0, 0.0]);
        let similar = vec![inst(&[0.0, 1.0]), inst(&[0.0, 3.0]), inst(&[0.0, 2.0])];
        assert_eq!(find_boundary_pair(&x, &similar, &model).unwrap(), inst(&[0.0, 3.0]));
        assert_eq!(find_boundary_pair(&x, &[], &model).unwrap(), x);
    }

    #[test]
    fn test_idi_pair_has_different_label() {
        let model = RuleModel::new(2, |x| if x[1] >= 2.0 { 1.0 } else { 0.0 });
        let mut rng = StdRng::seed_from_u64(3);
        let x = inst(&[0.0, 0.0]);
        let similar = vec![inst(&[0.0, 1.0]), inst(&[0.0, 2.0]), inst(&[0.0, 3.0])];
        for _ in 0..10 {
            let pair = find_idi_pair(&x, &similar, &model, &mut rng).unwrap().unwrap();
            assert!(pair[1] >= 2.0);
        }
        let fair = RuleModel::new(2, |x| x[0]);
        assert!(find_idi_pair(&x, &similar, &fair, &mut rng).unwrap().is_none());
    }
}
