//! Tape-based autograd engine
//!
//! Every tracked op records a node on its output. [`backward`] orders the
//! nodes reachable from the final tensor so each one runs after all of its
//! consumers, then lets each push its gradient into its inputs once. The
//! classifiers in [`crate::model`] use this to take input gradients without
//! finite differences.

mod backward;
mod ops;
mod tensor;

#[cfg(test)]
mod tests;

pub use backward::{backward, BackwardOp};
pub use ops::{add, matmul, relu, select, sigmoid, softmax};
pub use tensor::Tensor;
