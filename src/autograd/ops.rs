//! Differentiable ops a dense classifier is built from

use super::tensor::GradCell;
use super::{BackwardOp, Tensor};
use crate::{Error, Result};
use ndarray::{Array1, ArrayView2, Zip};
use std::rc::Rc;

fn as_matrix(values: &Array1<f32>, rows: usize, cols: usize) -> Result<ArrayView2<'_, f32>> {
    values
        .view()
        .into_shape_with_order((rows, cols))
        .map_err(|_| Error::ShapeMismatch {
            expected: vec![rows, cols],
            got: vec![values.len()],
        })
}

fn upstream(cell: &GradCell) -> Option<Array1<f32>> {
    cell.borrow().clone()
}

/// Attach the node built by `make` to `output` when it is tracked
fn record<N, F>(output: Tensor, make: F) -> Tensor
where
    N: BackwardOp + 'static,
    F: FnOnce(GradCell) -> N,
{
    if !output.requires_grad() {
        return output;
    }
    let cell = output.grad_cell();
    output.with_node(Rc::new(make(cell)))
}

/// Element-wise sum of two equally sized tensors
pub fn add(a: &Tensor, b: &Tensor) -> Tensor {
    let output = Tensor::new(a.data() + b.data(), a.requires_grad() || b.requires_grad());
    record(output, |out_grad| AddNode {
        a: a.clone(),
        b: b.clone(),
        out_grad,
    })
}

struct AddNode {
    a: Tensor,
    b: Tensor,
    out_grad: GradCell,
}

impl BackwardOp for AddNode {
    fn backward(&self) {
        let Some(grad) = upstream(&self.out_grad) else {
            return;
        };
        for input in [&self.a, &self.b] {
            if input.requires_grad() {
                input.accumulate_grad(grad.clone());
            }
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.a, &self.b]
    }
}

/// Element-wise op whose local derivative is fixed at forward time
struct PointwiseNode {
    input: Tensor,
    derivative: Array1<f32>,
    out_grad: GradCell,
}

impl BackwardOp for PointwiseNode {
    fn backward(&self) {
        if let Some(grad) = upstream(&self.out_grad) {
            if self.input.requires_grad() {
                self.input.accumulate_grad(grad * &self.derivative);
            }
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.input]
    }
}

/// Apply `f` element-wise; `df(x, f(x))` is the derivative at `x`
fn pointwise(a: &Tensor, f: impl Fn(f32) -> f32, df: impl Fn(f32, f32) -> f32) -> Tensor {
    let output = Tensor::new(a.data().mapv(f), a.requires_grad());
    let derivative = Zip::from(a.data())
        .and(output.data())
        .map_collect(|&x, &y| df(x, y));
    record(output, |out_grad| PointwiseNode {
        input: a.clone(),
        derivative,
        out_grad,
    })
}

/// max(x, 0)
pub fn relu(a: &Tensor) -> Tensor {
    pointwise(a, |x| x.max(0.0), |x, _| if x > 0.0 { 1.0 } else { 0.0 })
}

/// Logistic sigmoid, the head of single-output binary classifiers
pub fn sigmoid(a: &Tensor) -> Tensor {
    pointwise(a, |x| 1.0 / (1.0 + (-x).exp()), |_, s| s * (1.0 - s))
}

/// Numerically stable softmax over the whole tensor
pub fn softmax(a: &Tensor) -> Tensor {
    let peak = a.data().fold(f32::NEG_INFINITY, |m, &x| m.max(x));
    let exp = a.data().mapv(|x| (x - peak).exp());
    let output = Tensor::new(&exp / exp.sum(), a.requires_grad());
    let probs = output.data().clone();
    record(output, |out_grad| SoftmaxNode {
        input: a.clone(),
        probs,
        out_grad,
    })
}

struct SoftmaxNode {
    input: Tensor,
    probs: Array1<f32>,
    out_grad: GradCell,
}

impl BackwardOp for SoftmaxNode {
    fn backward(&self) {
        let Some(grad) = upstream(&self.out_grad) else {
            return;
        };
        if self.input.requires_grad() {
            // Jacobian-vector product: p ⊙ (g − p·g)
            let dot = self.probs.dot(&grad);
            self.input
                .accumulate_grad(&self.probs * &grad.mapv(|g| g - dot));
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.input]
    }
}

/// One element of `a` as a single-element tensor
///
/// Differentiating the selected element of a classifier output gives the
/// input gradient of that class score alone.
pub fn select(a: &Tensor, index: usize) -> Result<Tensor> {
    let value = *a.data().get(index).ok_or_else(|| {
        Error::InvalidParameter(format!("index {index} out of range for length {}", a.len()))
    })?;
    let output = Tensor::from_vec(vec![value], a.requires_grad());
    Ok(record(output, |out_grad| SelectNode {
        input: a.clone(),
        index,
        out_grad,
    }))
}

struct SelectNode {
    input: Tensor,
    index: usize,
    out_grad: GradCell,
}

impl BackwardOp for SelectNode {
    fn backward(&self) {
        if let Some(grad) = upstream(&self.out_grad) {
            if self.input.requires_grad() {
                let mut scattered = Array1::zeros(self.input.len());
                scattered[self.index] = grad[0];
                self.input.accumulate_grad(scattered);
            }
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.input]
    }
}

/// Row-major matrix product `C = A·B` of an `m×k` and a `k×n` matrix
///
/// A dense layer applied to one instance is `matmul(x, w, 1, inputs, outputs)`.
pub fn matmul(a: &Tensor, b: &Tensor, m: usize, k: usize, n: usize) -> Result<Tensor> {
    let lhs = as_matrix(a.data(), m, k)?;
    let rhs = as_matrix(b.data(), k, n)?;
    let product: Array1<f32> = lhs.dot(&rhs).into_iter().collect();

    let output = Tensor::new(product, a.requires_grad() || b.requires_grad());
    Ok(record(output, |out_grad| MatmulNode {
        a: a.clone(),
        b: b.clone(),
        dims: (m, k, n),
        out_grad,
    }))
}

struct MatmulNode {
    a: Tensor,
    b: Tensor,
    dims: (usize, usize, usize),
    out_grad: GradCell,
}

impl MatmulNode {
    fn grads(&self, grad: &Array1<f32>) -> Result<(Array1<f32>, Array1<f32>)> {
        let (m, k, n) = self.dims;
        let g = as_matrix(grad, m, n)?;
        let a = as_matrix(self.a.data(), m, k)?;
        let b = as_matrix(self.b.data(), k, n)?;
        // dA = dC·Bᵀ, dB = Aᵀ·dC
        let grad_a = g.dot(&b.t()).into_iter().collect();
        let grad_b = a.t().dot(&g).into_iter().collect();
        Ok((grad_a, grad_b))
    }
}

impl BackwardOp for MatmulNode {
    fn backward(&self) {
        let Some(grad) = upstream(&self.out_grad) else {
            return;
        };
        // shapes were checked on the forward pass
        if let Ok((grad_a, grad_b)) = self.grads(&grad) {
            if self.a.requires_grad() {
                self.a.accumulate_grad(grad_a);
            }
            if self.b.requires_grad() {
                self.b.accumulate_grad(grad_b);
            }
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        vec![&self.a, &self.b]
    }
}
