//! Dense feed-forward classifier on the autograd tape

use super::{check_input, Classifier};
use crate::autograd::{add, backward, matmul, relu, select, sigmoid, softmax, Tensor};
use crate::{Error, Result};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Activation applied to the final layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputHead {
    /// Single probability, thresholded at 0.5
    Sigmoid,
    /// Class distribution, argmax label
    Softmax,
    /// Raw logits
    Linear,
}

impl OutputHead {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputHead::Sigmoid => "sigmoid",
            OutputHead::Softmax => "softmax",
            OutputHead::Linear => "linear",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "sigmoid" => Some(OutputHead::Sigmoid),
            "softmax" => Some(OutputHead::Softmax),
            "linear" => Some(OutputHead::Linear),
            _ => None,
        }
    }
}

/// Fully connected layer, weight stored row-major as `inputs × outputs`
#[derive(Debug, Clone, PartialEq)]
pub struct Dense {
    weight: Array1<f32>,
    bias: Array1<f32>,
    inputs: usize,
    outputs: usize,
}

impl Dense {
    pub fn new(inputs: usize, outputs: usize, weight: Vec<f32>, bias: Vec<f32>) -> Result<Self> {
        if inputs == 0 || outputs == 0 {
            return Err(Error::InvalidParameter(format!(
                "dense layer must be non-empty, got {inputs}x{outputs}"
            )));
        }
        if weight.len() != inputs * outputs {
            return Err(Error::ShapeMismatch {
                expected: vec![inputs, outputs],
                got: vec![weight.len()],
            });
        }
        if bias.len() != outputs {
            return Err(Error::ShapeMismatch {
                expected: vec![outputs],
                got: vec![bias.len()],
            });
        }
        Ok(Self {
            weight: Array1::from(weight),
            bias: Array1::from(bias),
            inputs,
            outputs,
        })
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }

    pub fn outputs(&self) -> usize {
        self.outputs
    }

    pub fn weight(&self) -> &Array1<f32> {
        &self.weight
    }

    pub fn bias(&self) -> &Array1<f32> {
        &self.bias
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let w = Tensor::new(self.weight.clone(), false);
        let b = Tensor::new(self.bias.clone(), false);
        Ok(add(&matmul(x, &w, 1, self.inputs, self.outputs)?, &b))
    }
}

/// Multi-layer perceptron with ReLU hidden activations
///
/// [`Classifier::gradient`] differentiates one output: the only output of a
/// single-output head, otherwise `gradient_class` (the last class unless set
/// with [`Mlp::with_gradient_class`]). A two-class softmax therefore steers
/// exactly like a sigmoid head on the same logit difference.
#[derive(Debug, Clone, PartialEq)]
pub struct Mlp {
    layers: Vec<Dense>,
    head: OutputHead,
    gradient_class: usize,
}

impl Mlp {
    pub fn new(layers: Vec<Dense>, head: OutputHead) -> Result<Self> {
        if layers.is_empty() {
            return Err(Error::InvalidParameter("MLP needs at least one layer".into()));
        }
        for pair in layers.windows(2) {
            if pair[0].outputs != pair[1].inputs {
                return Err(Error::ShapeMismatch {
                    expected: vec![pair[0].outputs],
                    got: vec![pair[1].inputs],
                });
            }
        }
        let gradient_class = layers[layers.len() - 1].outputs.saturating_sub(1);
        Ok(Self {
            layers,
            head,
            gradient_class,
        })
    }

    /// Differentiate the score of `class` instead of the last output
    pub fn with_gradient_class(mut self, class: usize) -> Result<Self> {
        if class >= self.num_outputs() {
            return Err(Error::InvalidParameter(format!(
                "gradient class {class} out of range for {} outputs",
                self.num_outputs()
            )));
        }
        self.gradient_class = class;
        Ok(self)
    }

    pub fn gradient_class(&self) -> usize {
        self.gradient_class
    }

    /// Randomly initialised network with the given layer widths
    ///
    /// `sizes` lists the input width followed by every layer's output width.
    /// Weights are Xavier-uniform from a seeded generator.
    pub fn random(sizes: &[usize], head: OutputHead, seed: u64) -> Result<Self> {
        if sizes.len() < 2 {
            return Err(Error::InvalidParameter(
                "need an input width and at least one layer width".into(),
            ));
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let layers = sizes
            .windows(2)
            .map(|pair| {
                let (inputs, outputs) = (pair[0], pair[1]);
                let limit = (6.0 / (inputs + outputs) as f32).sqrt();
                let weight = (0..inputs * outputs)
                    .map(|_| rng.random_range(-limit..limit))
                    .collect();
                Dense::new(inputs, outputs, weight, vec![0.0; outputs])
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(layers, head)
    }

    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }

    pub fn head(&self) -> OutputHead {
        self.head
    }

    /// Input width followed by each layer's output width
    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![self.layers[0].inputs];
        sizes.extend(self.layers.iter().map(|l| l.outputs));
        sizes
    }

    pub fn num_outputs(&self) -> usize {
        self.layers[self.layers.len() - 1].outputs
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let last = self.layers.len() - 1;
        let mut h = x.clone();
        for (i, layer) in self.layers.iter().enumerate() {
            h = layer.forward(&h)?;
            if i < last {
                h = relu(&h);
            }
        }
        Ok(match self.head {
            OutputHead::Sigmoid => sigmoid(&h),
            OutputHead::Softmax => softmax(&h),
            OutputHead::Linear => h,
        })
    }
}

impl Classifier for Mlp {
    fn num_inputs(&self) -> usize {
        self.layers[0].inputs
    }

    fn predict(&self, x: &[f32]) -> Result<Array1<f32>> {
        check_input(self.num_inputs(), x)?;
        Ok(self.forward(&Tensor::from_slice(x, false))?.data().clone())
    }

    fn gradient(&self, x: &[f32]) -> Result<Array1<f32>> {
        check_input(self.num_inputs(), x)?;
        let input = Tensor::from_slice(x, true);
        let score = select(&self.forward(&input)?, self.gradient_class)?;
        backward(&score, None);

        let grad = input
            .grad()
            .ok_or_else(|| Error::InvalidGradient("input received no gradient".into()))?;
        if grad.iter().any(|g| !g.is_finite()) {
            return Err(Error::InvalidGradient("non-finite input gradient".into()));
        }
        Ok(grad)
    }
}
