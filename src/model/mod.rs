//! Classifiers under test
//!
//! The search only ever reads a model through [`Classifier`]: a forward pass,
//! an input gradient, and the label derived from the output. [`Mlp`] is the
//! bundled implementation, evaluated through the crate's autograd engine.

mod mlp;

pub use mlp::{Dense, Mlp, OutputHead};

use crate::data::Instance;
use crate::{Error, Result};
use ndarray::Array1;

/// Read-only view of a trained classifier
pub trait Classifier {
    /// Width of the inputs the model accepts
    fn num_inputs(&self) -> usize;

    /// Raw model output for one instance
    fn predict(&self, x: &[f32]) -> Result<Array1<f32>>;

    /// Gradient of one output score with respect to every input dimension
    ///
    /// Multi-output models pick a single class score; the sum of a softmax
    /// output is constant and has no gradient.
    fn gradient(&self, x: &[f32]) -> Result<Array1<f32>>;

    /// Predicted class id
    fn label(&self, x: &[f32]) -> Result<usize> {
        label_from_output(&self.predict(x)?)
    }

    /// Labels for a batch, in order
    ///
    /// Override when the backend can evaluate a batch more cheaply than
    /// instance by instance.
    fn labels(&self, xs: &[Instance]) -> Result<Vec<usize>> {
        xs.iter().map(|x| self.label(x)).collect()
    }
}

/// Class id for a model output
///
/// A single output is a probability thresholded at 0.5; wider outputs take
/// the argmax, first maximum winning.
pub fn label_from_output(output: &Array1<f32>) -> Result<usize> {
    if output.is_empty() {
        return Err(Error::Inference("model produced an empty output".into()));
    }
    if output.iter().any(|v| v.is_nan()) {
        return Err(Error::Inference("model produced NaN".into()));
    }
    if output.len() == 1 {
        return Ok(usize::from(output[0] >= 0.5));
    }
    let mut best = 0;
    for (i, v) in output.iter().enumerate().skip(1) {
        if *v > output[best] {
            best = i;
        }
    }
    Ok(best)
}

/// Reject inputs whose width the model was not built for
pub fn check_input(expected: usize, x: &[f32]) -> Result<()> {
    if x.len() != expected {
        return Err(Error::ShapeMismatch {
            expected: vec![expected],
            got: vec![x.len()],
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn test_binary_threshold() {
        assert_eq!(label_from_output(&arr1(&[0.49])).unwrap(), 0);
        assert_eq!(label_from_output(&arr1(&[0.5])).unwrap(), 1);
    }

    #[test]
    fn test_argmax_first_wins() {
        assert_eq!(label_from_output(&arr1(&[0.1, 0.7, 0.2])).unwrap(), 1);
        assert_eq!(label_from_output(&arr1(&[0.4, 0.4, 0.2])).unwrap(), 0);
    }

    #[test]
    fn test_bad_outputs() {
        assert!(label_from_output(&Array1::zeros(0)).is_err());
        assert!(label_from_output(&arr1(&[f32::NAN, 1.0])).is_err());
    }

    #[test]
    fn test_check_input() {
        assert!(check_input(3, &[1.0, 2.0, 3.0]).is_ok());
        assert!(matches!(
            check_input(3, &[1.0]),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
