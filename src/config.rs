//! # Agent Configuration
//!
//! Hyperparameters for the learning engine and the frame-paced session. The
//! defaults reproduce the reference configuration; any subset of fields can be
//! overridden from a JSON file, missing fields keep their defaults.
//!
//! ```rust
//! use dashq::config::AgentConfig;
//!
//! let config = AgentConfig::from_json_str(r#"{ "batch_size": 32, "seed": 7 }"#).unwrap();
//! assert_eq!(config.batch_size, 32);
//! assert_eq!(config.memory_size, 50_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DashError, Result};

pub const INPUT_SIZE: usize = 15;
pub const HIDDEN_SIZE: usize = 64;
pub const OUTPUT_SIZE: usize = 4;
pub const MEMORY_SIZE: usize = 50_000;
pub const BATCH_SIZE: usize = 128;

pub const INITIAL_EPSILON: f32 = 0.99;
pub const FINAL_EPSILON: f32 = 0.01;
pub const GAMMA: f32 = 0.99;
pub const LEARNING_RATE: f32 = 0.01;
pub const EXPLORATION_STEPS: usize = 100_000;
pub const TRAIN_EVERY_N_ATTEMPTS: usize = 5;
pub const FRAME_BUDGET_MS: u64 = 16;

/// Layer widths of the value network
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
}

impl NetworkConfig {
    pub fn new(input_size: usize, hidden_size: usize, output_size: usize) -> Self {
        NetworkConfig { input_size, hidden_size, output_size }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, size) in [
            ("input_size", self.input_size),
            ("hidden_size", self.hidden_size),
            ("output_size", self.output_size),
        ] {
            if size == 0 {
                return Err(DashError::invalid_parameter(name, "must be greater than zero"));
            }
            if size > i32::MAX as usize {
                return Err(DashError::invalid_parameter(name, "does not fit the snapshot header"));
            }
        }
        Ok(())
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig::new(INPUT_SIZE, HIDDEN_SIZE, OUTPUT_SIZE)
    }
}

impl std::fmt::Display for NetworkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.input_size, self.hidden_size, self.output_size)
    }
}

/// Full set of engine and session hyperparameters
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    // Network architecture
    pub network: NetworkConfig,

    // Replay
    pub memory_size: usize,
    pub batch_size: usize,

    // Exploration
    pub initial_epsilon: f32,
    pub final_epsilon: f32,
    pub exploration_steps: usize,

    // Training
    pub gamma: f32,
    pub learning_rate: f32,
    pub train_every_n_attempts: usize,

    // Session
    pub frame_budget_ms: u64,
    pub weights_path: PathBuf,

    /// Seed for every random draw; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            network: NetworkConfig::default(),
            memory_size: MEMORY_SIZE,
            batch_size: BATCH_SIZE,
            initial_epsilon: INITIAL_EPSILON,
            final_epsilon: FINAL_EPSILON,
            exploration_steps: EXPLORATION_STEPS,
            gamma: GAMMA,
            learning_rate: LEARNING_RATE,
            train_every_n_attempts: TRAIN_EVERY_N_ATTEMPTS,
            frame_budget_ms: FRAME_BUDGET_MS,
            weights_path: PathBuf::from("gdai_network.dat"),
            seed: None,
        }
    }
}

impl AgentConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AgentConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.network.validate()?;

        if self.memory_size == 0 {
            return Err(DashError::invalid_parameter("memory_size", "must be greater than zero"));
        }
        if self.batch_size == 0 {
            return Err(DashError::invalid_parameter("batch_size", "must be greater than zero"));
        }
        if !(self.initial_epsilon > 0.0 && self.initial_epsilon <= 1.0) {
            return Err(DashError::invalid_parameter("initial_epsilon", "must be in (0, 1]"));
        }
        if !(self.final_epsilon > 0.0 && self.final_epsilon <= self.initial_epsilon) {
            return Err(DashError::invalid_parameter(
                "final_epsilon",
                "must be in (0, initial_epsilon]",
            ));
        }
        if self.exploration_steps == 0 {
            return Err(DashError::invalid_parameter("exploration_steps", "must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(DashError::invalid_parameter("gamma", "must be in [0, 1]"));
        }
        if !(self.learning_rate >= 0.0 && self.learning_rate.is_finite()) {
            return Err(DashError::invalid_parameter("learning_rate", "must be finite and non-negative"));
        }
        if self.train_every_n_attempts == 0 {
            return Err(DashError::invalid_parameter(
                "train_every_n_attempts",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}
