//! Vector value on the gradient tape

use super::BackwardOp;
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Shared slot an op writes its output gradient into
pub(crate) type GradCell = Rc<RefCell<Option<Array1<f32>>>>;

/// Flat `f32` vector, optionally tracked for gradients
///
/// Cloning is cheap: values, gradient slot and producing node are all
/// reference-counted, so the copy an op keeps of its input sees every
/// gradient later accumulated into that input.
#[derive(Clone)]
pub struct Tensor {
    values: Rc<Array1<f32>>,
    grad: GradCell,
    node: Option<Rc<dyn BackwardOp>>,
    tracked: bool,
}

impl Tensor {
    pub fn new(values: Array1<f32>, tracked: bool) -> Self {
        Self {
            values: Rc::new(values),
            grad: GradCell::default(),
            node: None,
            tracked,
        }
    }

    pub fn from_vec(values: Vec<f32>, tracked: bool) -> Self {
        Self::new(Array1::from(values), tracked)
    }

    pub fn from_slice(values: &[f32], tracked: bool) -> Self {
        Self::new(Array1::from(values.to_vec()), tracked)
    }

    pub fn data(&self) -> &Array1<f32> {
        &self.values
    }

    /// Accumulated gradient, `None` until a backward pass reaches this tensor
    pub fn grad(&self) -> Option<Array1<f32>> {
        self.grad.borrow().clone()
    }

    pub fn requires_grad(&self) -> bool {
        self.tracked
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Add `delta` into the gradient slot; a tensor used twice sums both paths
    pub(crate) fn accumulate_grad(&self, delta: Array1<f32>) {
        let mut slot = self.grad.borrow_mut();
        match slot.as_mut() {
            Some(total) => *total += &delta,
            None => *slot = Some(delta),
        }
    }

    pub(crate) fn seed_grad(&self, grad: Array1<f32>) {
        *self.grad.borrow_mut() = Some(grad);
    }

    pub(crate) fn grad_cell(&self) -> GradCell {
        Rc::clone(&self.grad)
    }

    pub(crate) fn node(&self) -> Option<&Rc<dyn BackwardOp>> {
        self.node.as_ref()
    }

    pub(crate) fn with_node(mut self, node: Rc<dyn BackwardOp>) -> Self {
        self.node = Some(node);
        self
    }
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("values", &self.values)
            .field("grad", &self.grad.borrow())
            .field("tracked", &self.tracked)
            .field("has_node", &self.node.is_some())
            .finish()
    }
}
