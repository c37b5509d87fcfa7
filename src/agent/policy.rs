use ndarray::ArrayView1;
use rand::Rng;

use super::context::OperatingContext;
use crate::error::{DashError, Result};
use crate::network::ValueNetwork;

/// One exploration rate per operating context, annealed once per attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplorationSchedule {
    rates: [f32; OperatingContext::COUNT],
    initial_epsilon: f32,
    final_epsilon: f32,
    decay_factor: f32,
}

impl ExplorationSchedule {
    /// Every context starts at `initial_epsilon`; each decay multiplies by
    /// `(final / initial)^(1 / exploration_steps)`.
    pub fn new(initial_epsilon: f32, final_epsilon: f32, exploration_steps: usize) -> Self {
        let steps = exploration_steps.max(1) as f64;
        let decay_factor = (final_epsilon as f64 / initial_epsilon as f64).powf(1.0 / steps) as f32;
        ExplorationSchedule {
            rates: [initial_epsilon; OperatingContext::COUNT],
            initial_epsilon,
            final_epsilon,
            decay_factor: decay_factor.min(1.0),
        }
    }

    pub fn rate(&self, context: OperatingContext) -> f32 {
        self.rates[context.index()]
    }

    pub fn decay_factor(&self) -> f32 {
        self.decay_factor
    }

    pub fn final_epsilon(&self) -> f32 {
        self.final_epsilon
    }

    pub fn initial_epsilon(&self) -> f32 {
        self.initial_epsilon
    }

    /// Anneal one context's rate, floored at `final_epsilon`.
    ///
    /// The rate never increases: one that an override already put below the
    /// floor stays where it is.
    pub fn decay(&mut self, context: OperatingContext) -> f32 {
        let rate = &mut self.rates[context.index()];
        *rate = (*rate * self.decay_factor).max(self.final_epsilon).min(*rate);
        *rate
    }

    /// Write a rate directly, without blending.
    pub fn set(&mut self, context: OperatingContext, value: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&value) {
            return Err(DashError::invalid_parameter(
                "exploration_rate".to_string(),
                format!("{} is outside [0, 1]", value),
            ));
        }
        self.rates[context.index()] = value;
        Ok(())
    }

    /// Operator-driven retune; same semantics as [`ExplorationSchedule::set`].
    pub fn reset(&mut self, context: OperatingContext, value: f32) -> Result<()> {
        self.set(context, value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (OperatingContext, f32)> + '_ {
        OperatingContext::ALL.iter().map(move |&context| (context, self.rate(context)))
    }
}

/// Epsilon-greedy action selection over the value network's outputs
#[derive(Debug, Clone, PartialEq)]
pub struct EpsilonGreedyPolicy {
    pub schedule: ExplorationSchedule,
}

impl EpsilonGreedyPolicy {
    pub fn new(schedule: ExplorationSchedule) -> Self {
        EpsilonGreedyPolicy { schedule }
    }

    /// With probability `rate(context)` pick a uniformly random action without
    /// consulting the network; otherwise take the greedy action.
    pub fn select_action<R: Rng + ?Sized>(
        &self,
        context: OperatingContext,
        state: ArrayView1<f32>,
        network: &ValueNetwork,
        rng: &mut R,
    ) -> Result<usize> {
        if rng.gen::<f32>() < self.schedule.rate(context) {
            return Ok(rng.gen_range(0..network.output_size()));
        }
        let q_values = network.predict(state)?;
        greedy_action(q_values.view())
            .ok_or_else(|| DashError::dimension_mismatch("at least one Q-value", "none"))
    }

    pub fn decay(&mut self, context: OperatingContext) -> f32 {
        self.schedule.decay(context)
    }
}

/// Index of the largest Q-value; the first maximum wins ties.
pub fn greedy_action(q_values: ArrayView1<f32>) -> Option<usize> {
    let mut values = q_values.iter().copied().enumerate();
    let (mut best_index, mut best_value) = values.next()?;
    for (index, value) in values {
        if value > best_value {
            best_index = index;
            best_value = value;
        }
    }
    Some(best_index)
}
