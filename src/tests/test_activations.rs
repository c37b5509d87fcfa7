use ndarray::{array, Array2};
use crate::activations::Activation;

#[test]
fn test_relu_activation() {
    let relu = Activation::Relu;
    let mut input = array![-1.0, 0.0, 1.0, 2.0];
    relu.apply(&mut input);
    assert_eq!(input, array![0.0, 0.0, 1.0, 2.0]);
}

#[test]
fn test_linear_is_identity() {
    let mut input = array![[-3.5, 0.0], [1.25, 8.0]];
    let expected = input.clone();
    Activation::Linear.apply_batch(&mut input);
    assert_eq!(input, expected);
}

#[test]
fn test_relu_derivative_gates_at_zero() {
    let pre = array![[-1.0, 0.0, 0.5], [2.0, -0.1, 1e-6]];
    let deriv = Activation::Relu.derivative_batch(pre.view());
    assert_eq!(deriv, array![[0.0, 0.0, 1.0], [1.0, 0.0, 1.0]]);
}

#[test]
fn test_linear_derivative_is_one() {
    let pre = array![[-4.0, 0.0], [3.0, 7.0]];
    let deriv = Activation::Linear.derivative_batch(pre.view());
    assert_eq!(deriv, Array2::<f32>::ones((2, 2)));
}

#[test]
fn test_default_activation() {
    assert_eq!(Activation::default(), Activation::Relu);
}
