//! Gradient checks for the autograd ops

use super::*;
use approx::assert_abs_diff_eq;
use proptest::prelude::*;

/// Central-difference gradient of a scalar function
fn finite_difference<F>(f: F, x: &[f32], epsilon: f32) -> Vec<f32>
where
    F: Fn(&[f32]) -> f32,
{
    let mut nudged = x.to_vec();
    (0..x.len())
        .map(|i| {
            nudged[i] = x[i] + epsilon;
            let up = f(&nudged);
            nudged[i] = x[i] - epsilon;
            let down = f(&nudged);
            nudged[i] = x[i];
            (up - down) / (2.0 * epsilon)
        })
        .collect()
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_grad_accumulates_across_uses() {
        let t = Tensor::from_vec(vec![1.0, 2.0, 3.0], true);
        t.accumulate_grad(ndarray::arr1(&[1.0, 1.0, 1.0]));
        t.accumulate_grad(ndarray::arr1(&[0.5, 0.0, 2.0]));
        assert_eq!(t.grad().unwrap().to_vec(), vec![1.5, 1.0, 3.0]);
    }

    #[test]
    fn test_untracked_ops_record_nothing() {
        let a = Tensor::from_vec(vec![1.0, -1.0], false);
        let c = sigmoid(&relu(&a));
        assert!(!c.requires_grad());
        assert!(c.node().is_none());
    }

    #[test]
    fn test_add_backward() {
        let a = Tensor::from_vec(vec![1.0, 2.0, 3.0], true);
        let b = Tensor::from_vec(vec![4.0, 5.0, 6.0], false);
        let c = add(&a, &b);
        assert_abs_diff_eq!(c.data()[2], 9.0);

        backward(&c, None);

        assert_abs_diff_eq!(a.grad().unwrap()[0], 1.0);
        assert!(b.grad().is_none());
    }

    #[test]
    fn test_relu_backward() {
        let a = Tensor::from_vec(vec![-1.0, 0.5, 2.0], true);
        let c = relu(&a);
        assert_abs_diff_eq!(c.data()[0], 0.0);

        backward(&c, None);
        assert_eq!(a.grad().unwrap().to_vec(), vec![0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_sigmoid_forward_and_backward() {
        let a = Tensor::from_vec(vec![0.0, 2.0], true);
        let c = sigmoid(&a);
        assert_abs_diff_eq!(c.data()[0], 0.5);

        backward(&c, None);
        // σ'(0) = 0.25
        assert_abs_diff_eq!(a.grad().unwrap()[0], 0.25, epsilon = 1e-6);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let c = softmax(&Tensor::from_vec(vec![1.0, 2.0, 3.0], false));
        assert_abs_diff_eq!(c.data().sum(), 1.0, epsilon = 1e-6);
        assert!(c.data()[2] > c.data()[1]);
    }

    #[test]
    fn test_softmax_summed_gradient_vanishes() {
        let a = Tensor::from_vec(vec![0.3, -1.0, 2.0], true);
        backward(&softmax(&a), None);
        for g in a.grad().unwrap() {
            assert_abs_diff_eq!(g, 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_select_scatters_into_one_slot() {
        let a = Tensor::from_vec(vec![1.0, 2.0, 3.0], true);
        let picked = select(&a, 1).unwrap();
        assert_eq!(picked.data().to_vec(), vec![2.0]);

        backward(&picked, None);
        assert_eq!(a.grad().unwrap().to_vec(), vec![0.0, 1.0, 0.0]);
        assert!(select(&a, 3).is_err());
    }

    #[test]
    fn test_selected_softmax_class_gradient() {
        // ∂p_i/∂x_j = p_i (δ_ij − p_j)
        let a = Tensor::from_vec(vec![0.5, -0.5], true);
        let probs = softmax(&a);
        let p = probs.data().clone();
        backward(&select(&probs, 1).unwrap(), None);

        let grad = a.grad().unwrap();
        assert_abs_diff_eq!(grad[0], -p[1] * p[0], epsilon = 1e-6);
        assert_abs_diff_eq!(grad[1], p[1] * (1.0 - p[1]), epsilon = 1e-6);
    }

    #[test]
    fn test_diamond_graph_runs_each_node_once() {
        // h = relu(x) feeds both branches; d/dx (h + h) = 2 where x > 0
        let x = Tensor::from_vec(vec![1.0, -1.0], true);
        let h = relu(&x);
        backward(&add(&h, &h), None);
        assert_eq!(x.grad().unwrap().to_vec(), vec![2.0, 0.0]);
    }

    #[test]
    fn test_dense_chain_input_gradient() {
        // y = sigmoid(x @ w + b), grad wrt x only
        let x = Tensor::from_vec(vec![1.0, -2.0], true);
        let w = Tensor::from_vec(vec![0.5, -0.25], false);
        let b = Tensor::from_vec(vec![0.1], false);

        let y = sigmoid(&add(&matmul(&x, &w, 1, 2, 1).unwrap(), &b));
        backward(&y, None);

        let s = y.data()[0];
        let grad = x.grad().unwrap();
        assert_abs_diff_eq!(grad[0], s * (1.0 - s) * 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(grad[1], s * (1.0 - s) * -0.25, epsilon = 1e-6);
        assert!(w.grad().is_none());
    }

    #[test]
    fn test_matmul_forward() {
        // [[1, 2], [3, 4]] @ [[5, 6], [7, 8]]
        let a = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], false);
        let b = Tensor::from_vec(vec![5.0, 6.0, 7.0, 8.0], false);
        let c = matmul(&a, &b, 2, 2, 2).unwrap();
        assert_eq!(c.data().to_vec(), vec![19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_matmul_shape_mismatch() {
        let a = Tensor::from_vec(vec![1.0, 2.0, 3.0], false);
        let b = Tensor::from_vec(vec![1.0, 2.0], false);
        assert!(matches!(
            matmul(&a, &b, 1, 2, 1),
            Err(crate::Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_weight_gradient_is_outer_product() {
        let x = Tensor::from_vec(vec![2.0, 3.0], false);
        let w = Tensor::from_vec(vec![0.0; 4], true);
        backward(&matmul(&x, &w, 1, 2, 2).unwrap(), None);
        assert_eq!(w.grad().unwrap().to_vec(), vec![2.0, 2.0, 3.0, 3.0]);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_sigmoid_backward_gradient_check(
        x in prop::collection::vec(-6.0f32..6.0, 1..16)
    ) {
        let a = Tensor::from_vec(x.clone(), true);
        backward(&sigmoid(&a), None);
        let analytical = a.grad().unwrap();

        let numerical = finite_difference(
            |v| sigmoid(&Tensor::from_slice(v, false)).data().sum(),
            &x,
            1e-3,
        );

        for i in 0..x.len() {
            let diff = (analytical[i] - numerical[i]).abs();
            prop_assert!(diff < 1e-2, "index {}: analytical={}, numerical={}", i, analytical[i], numerical[i]);
        }
    }

    #[test]
    fn prop_softmax_class_gradient_check(
        x in prop::collection::vec(-3.0f32..3.0, 2..8),
        pick in 0usize..8,
    ) {
        let class = pick % x.len();
        let a = Tensor::from_vec(x.clone(), true);
        backward(&select(&softmax(&a), class).unwrap(), None);
        let analytical = a.grad().unwrap();

        let numerical = finite_difference(
            |v| softmax(&Tensor::from_slice(v, false)).data()[class],
            &x,
            1e-3,
        );

        for i in 0..x.len() {
            let diff = (analytical[i] - numerical[i]).abs();
            prop_assert!(diff < 1e-2, "index {}: analytical={}, numerical={}", i, analytical[i], numerical[i]);
        }
    }

    #[test]
    fn prop_matmul_backward_gradient_check(
        k in 1usize..6,
        n in 1usize..4,
        seed in prop::collection::vec(-2.0f32..2.0, 40)
    ) {
        let x: Vec<f32> = seed[..k].to_vec();
        let w: Vec<f32> = seed[k..k + k * n].to_vec();

        let a = Tensor::from_vec(x.clone(), true);
        backward(&matmul(&a, &Tensor::from_vec(w.clone(), false), 1, k, n).unwrap(), None);
        let analytical = a.grad().unwrap();

        let numerical = finite_difference(
            |v| {
                matmul(&Tensor::from_slice(v, false), &Tensor::from_slice(&w, false), 1, k, n)
                    .unwrap()
                    .data()
                    .sum()
            },
            &x,
            1e-2,
        );

        for i in 0..k {
            let diff = (analytical[i] - numerical[i]).abs();
            prop_assert!(diff < 5e-2, "index {}: analytical={}, numerical={}", i, analytical[i], numerical[i]);
        }
    }
}
