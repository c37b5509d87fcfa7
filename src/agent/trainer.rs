use log::debug;
use ndarray::Array1;
use rand::Rng;

use crate::config::AgentConfig;
use crate::error::{DashError, Result};
use crate::network::{UpdateStats, ValueNetwork};
use crate::optimizer::LearningRateScheduler;
use crate::replay_buffer::{DemonstrationBuffer, ReplayBuffer, Transition};

/// Who chose the action of an observed transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlSource {
    #[default]
    Agent,
    /// Operator-driven demonstration
    Manual,
}

/// Why a training opportunity did not produce an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotEnoughSamples,
    OffSchedule,
    EmptyBatch,
    LearningRateExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrainOutcome {
    Trained(UpdateStats),
    Skipped(SkipReason),
}

impl TrainOutcome {
    pub fn is_trained(&self) -> bool {
        matches!(self, TrainOutcome::Trained(_))
    }
}

/// Owns the replay and demonstration buffers and assembles minibatches from them.
#[derive(Debug, Clone)]
pub struct Trainer {
    replay: ReplayBuffer,
    demonstrations: DemonstrationBuffer,
    batch_size: usize,
    train_every: usize,
    discount: f32,
    scheduler: LearningRateScheduler,
    input_size: usize,
    output_size: usize,
}

impl Trainer {
    pub fn new(config: &AgentConfig) -> Self {
        Trainer {
            replay: ReplayBuffer::new(config.memory_size),
            demonstrations: DemonstrationBuffer::new(),
            batch_size: config.batch_size,
            train_every: config.train_every_n_attempts.max(1),
            discount: config.gamma,
            scheduler: LearningRateScheduler::linear_to_zero(config.learning_rate, config.exploration_steps),
            input_size: config.network.input_size,
            output_size: config.network.output_size,
        }
    }

    pub fn replay(&self) -> &ReplayBuffer {
        &self.replay
    }

    pub fn demonstrations(&self) -> &DemonstrationBuffer {
        &self.demonstrations
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of transitions available to the next batch
    pub fn available(&self) -> usize {
        self.replay.len() + self.demonstrations.len()
    }

    /// Build a transition and store it in the buffer matching its control source.
    pub fn observe(
        &mut self,
        state: Array1<f32>,
        action: usize,
        reward: f32,
        next_state: Array1<f32>,
        terminal: bool,
        source: ControlSource,
    ) -> Result<()> {
        self.record(Transition::new(state, action, reward, next_state, terminal), source)
    }

    pub fn record(&mut self, transition: Transition, source: ControlSource) -> Result<()> {
        self.check_transition(&transition)?;
        match source {
            ControlSource::Agent => self.replay.push(transition),
            ControlSource::Manual => self.demonstrations.push(transition),
        }
        Ok(())
    }

    /// `base_lr * max(0, 1 - attempt / exploration_steps)`
    pub fn learning_rate(&self, attempt: usize) -> f32 {
        self.scheduler.get_lr(attempt)
    }

    /// Train when enough transitions are buffered and `attempt` falls on the
    /// training interval. The demonstration buffer is emptied after every
    /// step that consumed it; the replay buffer is left intact for resampling.
    pub fn maybe_train<R: Rng + ?Sized>(
        &mut self,
        network: &mut ValueNetwork,
        attempt: usize,
        rng: &mut R,
    ) -> Result<TrainOutcome> {
        if self.available() < self.batch_size {
            return Ok(TrainOutcome::Skipped(SkipReason::NotEnoughSamples));
        }
        if attempt % self.train_every != 0 {
            return Ok(TrainOutcome::Skipped(SkipReason::OffSchedule));
        }

        let outcome = {
            let batch = self.sample_batch(rng);
            self.train_on(network, &batch, attempt)
        };
        self.demonstrations.clear();
        outcome
    }

    /// One update over an explicit batch with the learning rate for `attempt`.
    pub fn train_on(&self, network: &mut ValueNetwork, batch: &[&Transition], attempt: usize) -> Result<TrainOutcome> {
        if batch.is_empty() {
            return Ok(TrainOutcome::Skipped(SkipReason::EmptyBatch));
        }
        let learning_rate = self.learning_rate(attempt);
        if learning_rate <= 0.0 {
            return Ok(TrainOutcome::Skipped(SkipReason::LearningRateExhausted));
        }

        match network.update(batch, learning_rate, self.discount)? {
            Some(stats) => {
                debug!(
                    "Trained with batch of {}. Learning rate: {:.5}, loss: {:.5}",
                    stats.batch_size, stats.learning_rate, stats.loss
                );
                Ok(TrainOutcome::Trained(stats))
            }
            None => Ok(TrainOutcome::Skipped(SkipReason::EmptyBatch)),
        }
    }

    /// Uniform sample without replacement over replay + demonstrations,
    /// or everything when no more than `batch_size` transitions are buffered.
    pub fn sample_batch<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<&Transition> {
        let total = self.available();
        if total <= self.batch_size {
            return self.replay.iter().chain(self.demonstrations.iter()).collect();
        }
        rand::seq::index::sample(rng, total, self.batch_size)
            .into_iter()
            .filter_map(|index| self.combined(index))
            .collect()
    }

    fn combined(&self, index: usize) -> Option<&Transition> {
        let replay_len = self.replay.len();
        if index < replay_len {
            self.replay.get(index)
        } else {
            self.demonstrations.get(index - replay_len)
        }
    }

    fn check_transition(&self, transition: &Transition) -> Result<()> {
        for len in [transition.state().len(), transition.next_state().len()] {
            if len != self.input_size {
                return Err(DashError::dimension_mismatch(
                    format!("state of length {}", self.input_size),
                    format!("length {}", len),
                ));
            }
        }
        if transition.action() >= self.output_size {
            return Err(DashError::InvalidAction {
                action: transition.action(),
                max_actions: self.output_size,
            });
        }
        Ok(())
    }
}
