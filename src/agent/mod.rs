//! # Learning Agent Module
//!
//! Decision making and online training on top of the value network.
//!
//! ## Core Concepts
//!
//! - **Operating context**: the environment's current regime. Each context
//!   anneals its own exploration rate.
//! - **Epsilon-greedy**: explore uniformly at random with probability epsilon,
//!   otherwise take the action with the highest Q-value (first maximum wins).
//! - **Experience replay**: a bounded FIFO of past transitions resampled for
//!   training, plus demonstration transitions consumed by a single step.
//! - **Fitted Q-learning**: only the taken action is regressed toward
//!   `reward + gamma * max Q(next_state)`.
//!
//! [`LearningEngine`] owns all mutable learning state. Components never reach
//! for globals; the engine hands each one the network and random source it
//! needs.

pub mod context;
pub mod engine;
pub mod policy;
pub mod trainer;

pub use context::OperatingContext;
pub use engine::LearningEngine;
pub use policy::{greedy_action, EpsilonGreedyPolicy, ExplorationSchedule};
pub use trainer::{ControlSource, SkipReason, TrainOutcome, Trainer};
