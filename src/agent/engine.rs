use log::info;
use ndarray::{Array1, ArrayView1};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;

use super::context::OperatingContext;
use super::policy::{EpsilonGreedyPolicy, ExplorationSchedule};
use super::trainer::{ControlSource, TrainOutcome, Trainer};
use crate::config::AgentConfig;
use crate::error::{DashError, Result};
use crate::network::ValueNetwork;
use crate::persistence;

/// The learning session: value network, buffers, exploration schedule,
/// attempt counter and the random source every stochastic step draws from.
///
/// # Example
///
/// ```rust
/// use dashq::agent::{ControlSource, LearningEngine, OperatingContext};
/// use dashq::config::AgentConfig;
/// use ndarray::Array1;
///
/// let config = AgentConfig { seed: Some(3), batch_size: 2, ..AgentConfig::default() };
/// let mut engine = LearningEngine::new(config).unwrap();
///
/// let attempt = engine.begin_attempt();
/// let state = Array1::zeros(15);
/// let action = engine.select_action(OperatingContext::Cube, state.view()).unwrap();
/// engine
///     .observe(state.clone(), action, 0.01, state, false, ControlSource::Agent)
///     .unwrap();
/// let _ = engine.maybe_train().unwrap();
/// engine.finish_attempt(OperatingContext::Cube);
/// assert_eq!(attempt, 1);
/// ```
pub struct LearningEngine {
    config: AgentConfig,
    network: Option<ValueNetwork>,
    policy: EpsilonGreedyPolicy,
    trainer: Trainer,
    attempts: usize,
    rng: StdRng,
}

impl LearningEngine {
    /// Validate `config` and build a freshly initialized network.
    pub fn new(config: AgentConfig) -> Result<Self> {
        let mut engine = Self::without_network(config)?;
        engine.network = Some(ValueNetwork::new(engine.config.network, &mut engine.rng)?);
        Ok(engine)
    }

    /// An engine with no network attached; network-dependent calls fail with
    /// `MissingNetwork` until one is attached or reset.
    pub fn without_network(config: AgentConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let schedule = ExplorationSchedule::new(
            config.initial_epsilon,
            config.final_epsilon,
            config.exploration_steps,
        );
        Ok(LearningEngine {
            trainer: Trainer::new(&config),
            policy: EpsilonGreedyPolicy::new(schedule),
            network: None,
            attempts: 0,
            rng,
            config,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn has_network(&self) -> bool {
        self.network.is_some()
    }

    pub fn network(&self) -> Result<&ValueNetwork> {
        self.network.as_ref().ok_or(DashError::MissingNetwork)
    }

    pub fn network_mut(&mut self) -> Result<&mut ValueNetwork> {
        self.network.as_mut().ok_or(DashError::MissingNetwork)
    }

    /// Attach a network; its architecture must match the configured one.
    pub fn attach_network(&mut self, network: ValueNetwork) -> Result<()> {
        if network.config() != self.config.network {
            return Err(DashError::config_mismatch(
                self.config.network.to_string(),
                network.config().to_string(),
            ));
        }
        self.network = Some(network);
        Ok(())
    }

    pub fn detach_network(&mut self) -> Option<ValueNetwork> {
        self.network.take()
    }

    /// Replace the network's parameters with a fresh random initialization.
    pub fn reset_network(&mut self) -> Result<()> {
        self.network = Some(ValueNetwork::new(self.config.network, &mut self.rng)?);
        info!("Network reset ({})", self.config.network);
        Ok(())
    }

    pub fn policy(&self) -> &EpsilonGreedyPolicy {
        &self.policy
    }

    pub fn schedule(&self) -> &ExplorationSchedule {
        &self.policy.schedule
    }

    pub fn trainer(&self) -> &Trainer {
        &self.trainer
    }

    pub fn exploration_rate(&self, context: OperatingContext) -> f32 {
        self.policy.schedule.rate(context)
    }

    /// Attempts started so far
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Start a new attempt and return its 1-based number.
    pub fn begin_attempt(&mut self) -> usize {
        self.attempts += 1;
        self.attempts
    }

    /// Close an attempt: anneal the exploration rate of the context active
    /// during it. Returns the new rate.
    pub fn finish_attempt(&mut self, context: OperatingContext) -> f32 {
        self.policy.decay(context)
    }

    pub fn select_action(&mut self, context: OperatingContext, state: ArrayView1<f32>) -> Result<usize> {
        let network = self.network.as_ref().ok_or(DashError::MissingNetwork)?;
        self.policy.select_action(context, state, network, &mut self.rng)
    }

    pub fn observe(
        &mut self,
        state: Array1<f32>,
        action: usize,
        reward: f32,
        next_state: Array1<f32>,
        terminal: bool,
        source: ControlSource,
    ) -> Result<()> {
        self.trainer.observe(state, action, reward, next_state, terminal, source)
    }

    /// Run a training step if the buffers and the attempt counter allow it.
    pub fn maybe_train(&mut self) -> Result<TrainOutcome> {
        let network = self.network.as_mut().ok_or(DashError::MissingNetwork)?;
        self.trainer.maybe_train(network, self.attempts, &mut self.rng)
    }

    pub fn set_exploration(&mut self, context: OperatingContext, value: f32) -> Result<()> {
        self.policy.schedule.set(context, value)?;
        info!("Set exploration rate for {} to {:.2}", context, value);
        Ok(())
    }

    pub fn reset_exploration(&mut self, context: OperatingContext, value: f32) -> Result<()> {
        self.policy.schedule.reset(context, value)?;
        info!("Reset exploration rate for {} to {:.2}", context, value);
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        persistence::save_network(self.network()?, path)
    }

    /// Load a snapshot into the attached network. On failure the current
    /// parameters are kept.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let network = self.network.as_mut().ok_or(DashError::MissingNetwork)?;
        persistence::load_network_into(network, path)
    }

    pub fn save_default(&self) -> Result<()> {
        self.save(&self.config.weights_path)
    }

    pub fn load_default(&mut self) -> Result<()> {
        let path = self.config.weights_path.clone();
        self.load(path)
    }
}
