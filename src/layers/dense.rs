use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;

use crate::activations::Activation;
use super::initialization::{WeightInit, BIAS_INIT};

/// `inputs · weights + biases`, broadcasting the bias row over the batch.
pub fn affine(inputs: ArrayView2<f32>, weights: &Array2<f32>, biases: &Array1<f32>) -> Array2<f32> {
    inputs.dot(weights) + &biases.view().insert_axis(Axis(0))
}

/// Sum over the batch of the outer products `inputs[b] ⊗ deltas[b]`.
pub fn outer_sum(inputs: ArrayView2<f32>, deltas: ArrayView2<f32>) -> Array2<f32> {
    inputs.t().dot(&deltas)
}

/// Deltas seen by the previous layer's outputs: `deltas · weightsᵀ`.
pub fn back_propagate(deltas: ArrayView2<f32>, weights: &Array2<f32>) -> Array2<f32> {
    deltas.dot(&weights.t())
}

/// Values retained by a batched forward pass for use in the backward pass
#[derive(Debug, Clone)]
pub struct LayerCache {
    pub inputs: Array2<f32>,
    pub pre_activation: Array2<f32>,
    pub outputs: Array2<f32>,
}

/// Gradients of one layer summed over a batch
#[derive(Debug, Clone)]
pub struct LayerGradients {
    /// Error after the activation derivative, one row per sample
    pub adjusted_error: Array2<f32>,
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
}

/// A fully connected (dense) layer in a neural network
#[derive(Clone, Debug, PartialEq)]
pub struct DenseLayer {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    pub activation: Activation,
}

impl DenseLayer {
    /// Create a new dense layer, drawing weights from `init` and biases
    /// uniformly in [-0.1, 0.1].
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        init: WeightInit,
        rng: &mut R,
    ) -> Self {
        let weights = init.initialize_weights((input_size, output_size), rng);
        let biases = BIAS_INIT.initialize_biases(output_size, rng);
        DenseLayer {
            weights,
            biases,
            activation,
        }
    }

    pub fn with_weights(mut self, weights: Array2<f32>) -> Self {
        assert_eq!(weights.dim(), self.weights.dim());
        self.weights = weights;
        self
    }

    pub fn with_biases(mut self, biases: Array1<f32>) -> Self {
        assert_eq!(biases.dim(), self.biases.dim());
        self.biases = biases;
        self
    }

    pub fn input_size(&self) -> usize {
        self.weights.nrows()
    }

    pub fn output_size(&self) -> usize {
        self.weights.ncols()
    }

    /// Forward pass for a single input vector. Does not touch any cache.
    pub fn forward(&self, input: ArrayView1<f32>) -> Array1<f32> {
        let mut output = input.dot(&self.weights) + &self.biases;
        self.activation.apply(&mut output);
        output
    }

    /// Forward pass for a batch without retaining intermediates.
    pub fn predict_batch(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let mut outputs = affine(inputs, &self.weights, &self.biases);
        self.activation.apply_batch(&mut outputs);
        outputs
    }

    /// Forward pass for a batch, keeping inputs and pre-activations.
    pub fn forward_batch(&self, inputs: ArrayView2<f32>) -> LayerCache {
        let pre_activation = affine(inputs, &self.weights, &self.biases);
        let mut outputs = pre_activation.clone();
        self.activation.apply_batch(&mut outputs);
        LayerCache {
            inputs: inputs.to_owned(),
            pre_activation,
            outputs,
        }
    }

    /// Gradients for a batch given the error on this layer's outputs.
    pub fn backward_batch(&self, cache: &LayerCache, output_errors: ArrayView2<f32>) -> LayerGradients {
        let activation_deriv = self.activation.derivative_batch(cache.pre_activation.view());
        let adjusted_error = &output_errors * &activation_deriv;
        let weights = outer_sum(cache.inputs.view(), adjusted_error.view());
        let biases = adjusted_error.sum_axis(Axis(0));

        LayerGradients {
            adjusted_error,
            weights,
            biases,
        }
    }
}
