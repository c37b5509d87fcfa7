//! # dashq - Online Q-Learning for Frame-Paced Control
//!
//! dashq learns a discrete control policy from a live stream of
//! state/action/reward transitions while the environment keeps running at a
//! fixed frame rate. It provides a small fixed-topology value network with a
//! hand-written backward pass, a bounded replay buffer, per-context
//! epsilon-greedy exploration, a minibatch temporal-difference trainer and a
//! compact binary weight format.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dashq::agent::{ControlSource, LearningEngine, OperatingContext};
//! use dashq::config::AgentConfig;
//! use ndarray::Array1;
//!
//! let mut engine = LearningEngine::new(AgentConfig::default()).unwrap();
//!
//! engine.begin_attempt();
//! let state = Array1::zeros(15);
//! let action = engine.select_action(OperatingContext::Cube, state.view()).unwrap();
//! let next_state = Array1::zeros(15);
//! engine
//!     .observe(state, action, 0.01, next_state, false, ControlSource::Agent)
//!     .unwrap();
//! engine.maybe_train().unwrap();
//! engine.finish_attempt(OperatingContext::Cube);
//! engine.save_default().unwrap();
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - ReLU and identity activations
//! - [`agent`] - Operating contexts, epsilon-greedy policy, trainer and the learning engine
//! - [`config`] - Hyperparameters and JSON configuration
//! - [`error`] - Error types and result handling
//! - [`layers`] - Dense layer and the shared matrix helpers
//! - [`network`] - The three-layer value network
//! - [`optimizer`] - SGD and learning-rate schedules
//! - [`perception`] - State encoding and reward shaping
//! - [`persistence`] - Binary weight snapshots
//! - [`replay_buffer`] - Experience replay and demonstration storage
//! - [`session`] - Frame-paced control loop over pluggable perception and actuation

pub mod activations;
pub mod agent;
pub mod config;
pub mod error;
pub mod layers;
pub mod network;
pub mod optimizer;
pub mod perception;
pub mod persistence;
pub mod replay_buffer;
pub mod session;

#[cfg(test)]
mod tests;
