use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;

use crate::activations::Activation;
use crate::config::NetworkConfig;
use crate::error::{DashError, Result};
use crate::layers::{back_propagate, DenseLayer, WeightInit};
use crate::optimizer::{Optimizer, SGD};
use crate::replay_buffer::Transition;

/// Summary of one gradient step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateStats {
    pub batch_size: usize,
    pub learning_rate: f32,
    /// Mean squared TD error over the batch, measured before the step
    pub loss: f32,
}

/// Fixed three-layer Q-value approximator:
/// `input -> hidden1 (ReLU) -> hidden2 (ReLU) -> output (linear)`.
///
/// `hidden1.weights` is `W_in` (input x hidden), `hidden2.weights` is `W_h1`
/// (hidden x hidden) and `output.weights` is `W_h2` (hidden x output).
#[derive(Clone, Debug, PartialEq)]
pub struct ValueNetwork {
    pub hidden1: DenseLayer,
    pub hidden2: DenseLayer,
    pub output: DenseLayer,
    config: NetworkConfig,
}

impl ValueNetwork {
    /// Create a network with He-scaled uniform weights and small uniform biases.
    pub fn new<R: Rng + ?Sized>(config: NetworkConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let NetworkConfig { input_size, hidden_size, output_size } = config;

        let hidden1 = DenseLayer::new(input_size, hidden_size, Activation::Relu, WeightInit::HeScaled, rng);
        let hidden2 = DenseLayer::new(hidden_size, hidden_size, Activation::Relu, WeightInit::HeScaled, rng);
        let output = DenseLayer::new(hidden_size, output_size, Activation::Linear, WeightInit::HeScaled, rng);

        Ok(ValueNetwork {
            hidden1,
            hidden2,
            output,
            config,
        })
    }

    pub fn config(&self) -> NetworkConfig {
        self.config
    }

    pub fn input_size(&self) -> usize {
        self.config.input_size
    }

    pub fn output_size(&self) -> usize {
        self.config.output_size
    }

    /// Q-values for a single state.
    pub fn predict(&self, state: ArrayView1<f32>) -> Result<Array1<f32>> {
        self.check_state(state.len())?;
        let hidden1 = self.hidden1.forward(state);
        let hidden2 = self.hidden2.forward(hidden1.view());
        Ok(self.output.forward(hidden2.view()))
    }

    /// Q-values for a batch of states, one row per state.
    pub fn predict_batch(&self, states: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_state(states.ncols())?;
        let hidden1 = self.hidden1.predict_batch(states);
        let hidden2 = self.hidden2.predict_batch(hidden1.view());
        Ok(self.output.predict_batch(hidden2.view()))
    }

    /// One synchronous gradient step of mean-squared TD regression over the whole batch.
    ///
    /// Gradients are summed across the batch and applied once, scaled by
    /// `learning_rate / batch.len()`. An empty batch is a no-op returning `None`.
    pub fn update(&mut self, batch: &[&Transition], learning_rate: f32, discount: f32) -> Result<Option<UpdateStats>> {
        if batch.is_empty() {
            return Ok(None);
        }
        for transition in batch {
            self.check_transition(transition)?;
        }

        let states = stack_rows(batch.iter().map(|t| t.state().view()), self.input_size());
        let next_states = stack_rows(batch.iter().map(|t| t.next_state().view()), self.input_size());

        let cache1 = self.hidden1.forward_batch(states.view());
        let cache2 = self.hidden2.forward_batch(cache1.outputs.view());
        let cache_out = self.output.forward_batch(cache2.outputs.view());

        let next_q = self.predict_batch(next_states.view())?;
        let targets = td_targets(cache_out.outputs.view(), next_q.view(), batch, discount);

        let output_errors = &cache_out.outputs - &targets;
        let loss = output_errors.mapv(|e| e * e).mean().unwrap_or(0.0);

        let grad_out = self.output.backward_batch(&cache_out, output_errors.view());
        let error2 = back_propagate(grad_out.adjusted_error.view(), &self.output.weights);
        let grad2 = self.hidden2.backward_batch(&cache2, error2.view());
        let error1 = back_propagate(grad2.adjusted_error.view(), &self.hidden2.weights);
        let grad1 = self.hidden1.backward_batch(&cache1, error1.view());

        let step = learning_rate / batch.len() as f32;
        let mut optimizer = SGD::new();
        for (layer, grads) in [
            (&mut self.hidden1, grad1),
            (&mut self.hidden2, grad2),
            (&mut self.output, grad_out),
        ] {
            optimizer.update_weights(&mut layer.weights, &grads.weights, step);
            optimizer.update_biases(&mut layer.biases, &grads.biases, step);
        }

        Ok(Some(UpdateStats {
            batch_size: batch.len(),
            learning_rate,
            loss,
        }))
    }

    /// Re-randomize every parameter in place, keeping the architecture.
    pub fn reinitialize<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        *self = ValueNetwork::new(self.config, rng)?;
        Ok(())
    }

    fn check_state(&self, len: usize) -> Result<()> {
        if len != self.input_size() {
            return Err(DashError::dimension_mismatch(
                format!("state of length {}", self.input_size()),
                format!("length {}", len),
            ));
        }
        Ok(())
    }

    fn check_transition(&self, transition: &Transition) -> Result<()> {
        self.check_state(transition.state().len())?;
        self.check_state(transition.next_state().len())?;
        if transition.action() >= self.output_size() {
            return Err(DashError::InvalidAction {
                action: transition.action(),
                max_actions: self.output_size(),
            });
        }
        Ok(())
    }
}

/// Fitted one-step Q-learning targets.
///
/// Each row starts as a copy of `outputs`; only the taken action is replaced,
/// with `reward` for terminal transitions and
/// `reward + discount * max(next_q row)` otherwise.
pub fn td_targets(
    outputs: ArrayView2<f32>,
    next_q: ArrayView2<f32>,
    batch: &[&Transition],
    discount: f32,
) -> Array2<f32> {
    let mut targets = outputs.to_owned();
    for (i, transition) in batch.iter().enumerate() {
        let target = if transition.terminal() {
            transition.reward()
        } else {
            let max_next_q = next_q
                .row(i)
                .iter()
                .fold(f32::NEG_INFINITY, |max, &q| max.max(q));
            transition.reward() + discount * max_next_q
        };
        targets[[i, transition.action()]] = target;
    }
    targets
}

fn stack_rows<'a, I>(rows: I, width: usize) -> Array2<f32>
where
    I: ExactSizeIterator<Item = ArrayView1<'a, f32>>,
{
    let mut stacked = Array2::zeros((rows.len(), width));
    for (mut dst, src) in stacked.axis_iter_mut(Axis(0)).zip(rows) {
        dst.assign(&src);
    }
    stacked
}
