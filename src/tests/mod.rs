// Test modules for all components
pub mod test_activations;
pub mod test_engine;
pub mod test_network;
pub mod test_persistence;

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{AgentConfig, NetworkConfig};
use crate::network::ValueNetwork;
use crate::replay_buffer::Transition;

pub(crate) fn small_config() -> NetworkConfig {
    NetworkConfig::new(4, 8, 3)
}

pub(crate) fn seeded_network(config: NetworkConfig, seed: u64) -> ValueNetwork {
    let mut rng = StdRng::seed_from_u64(seed);
    ValueNetwork::new(config, &mut rng).unwrap()
}

/// Engine config over the small network with a fixed seed
pub(crate) fn small_agent_config(batch_size: usize) -> AgentConfig {
    AgentConfig {
        network: small_config(),
        batch_size,
        memory_size: 64,
        seed: Some(11),
        ..AgentConfig::default()
    }
}

pub(crate) fn transition(fill: f32, action: usize, reward: f32, terminal: bool) -> Transition {
    Transition::new(
        Array1::from_elem(4, fill),
        action,
        reward,
        Array1::from_elem(4, fill + 0.1),
        terminal,
    )
}
