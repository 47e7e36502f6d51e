//! Tape nodes and the reverse pass

use super::Tensor;
use ndarray::Array1;
use std::collections::HashSet;
use std::rc::Rc;

/// A recorded node on the gradient tape
pub trait BackwardOp {
    /// Push this node's output gradient into its inputs
    ///
    /// Called once per reverse pass, after every consumer of the output has
    /// already contributed its share.
    fn backward(&self);

    /// Tensors this node read during the forward pass
    fn inputs(&self) -> Vec<&Tensor>;
}

fn node_key(node: &Rc<dyn BackwardOp>) -> *const () {
    Rc::as_ptr(node) as *const ()
}

/// Nodes reachable from `output`, each after every node it depends on
fn topological_order(output: &Tensor) -> Vec<Rc<dyn BackwardOp>> {
    let mut order = Vec::new();
    let mut seen = HashSet::new();
    let mut stack: Vec<(Rc<dyn BackwardOp>, bool)> = output
        .node()
        .map(|node| vec![(Rc::clone(node), false)])
        .unwrap_or_default();

    while let Some((node, finished)) = stack.pop() {
        if finished {
            order.push(node);
            continue;
        }
        if !seen.insert(node_key(&node)) {
            continue;
        }
        stack.push((Rc::clone(&node), true));
        for input in node.inputs() {
            if let Some(child) = input.node() {
                if !seen.contains(&node_key(child)) {
                    stack.push((Rc::clone(child), false));
                }
            }
        }
    }
    order
}

/// Run the reverse pass from `output`
///
/// `seed` is the gradient of the final objective with respect to `output`;
/// `None` seeds with ones, i.e. differentiates the sum of its elements.
pub fn backward(output: &Tensor, seed: Option<Array1<f32>>) {
    output.seed_grad(seed.unwrap_or_else(|| Array1::ones(output.len())));
    for node in topological_order(output).iter().rev() {
        node.backward();
    }
}
