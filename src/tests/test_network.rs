use ndarray::{array, Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::{seeded_network, small_config, transition};
use crate::config::NetworkConfig;
use crate::error::DashError;
use crate::network::{td_targets, ValueNetwork};
use crate::replay_buffer::Transition;

fn half_squared_error(network: &ValueNetwork, t: &Transition) -> f32 {
    let q = network.predict(t.state().view()).unwrap();
    0.5 * (q[t.action()] - t.reward()).powi(2)
}

#[test]
fn test_value_network_creation() {
    let network = ValueNetwork::new(NetworkConfig::default(), &mut StdRng::seed_from_u64(1)).unwrap();
    assert_eq!(network.hidden1.weights.shape(), [15, 64]);
    assert_eq!(network.hidden2.weights.shape(), [64, 64]);
    assert_eq!(network.output.weights.shape(), [64, 4]);
    assert_eq!(network.hidden1.biases.len(), 64);
    assert_eq!(network.hidden2.biases.len(), 64);
    assert_eq!(network.output.biases.len(), 4);
}

#[test]
fn test_zero_sized_network_rejected() {
    let result = ValueNetwork::new(NetworkConfig::new(4, 0, 2), &mut StdRng::seed_from_u64(1));
    assert!(matches!(result, Err(DashError::InvalidParameter { .. })));
}

#[test]
fn test_predict_shape_and_determinism() {
    let network = seeded_network(NetworkConfig::default(), 5);
    let state = Array1::from_elem(15, 0.3);
    let first = network.predict(state.view()).unwrap();
    let second = network.predict(state.view()).unwrap();
    assert_eq!(first.len(), 4);
    assert_eq!(first, second);
}

#[test]
fn test_seeds_give_different_networks() {
    let a = seeded_network(NetworkConfig::default(), 1);
    let b = seeded_network(NetworkConfig::default(), 2);
    let state = Array1::from_elem(15, 0.5);
    let qa = a.predict(state.view()).unwrap();
    let qb = b.predict(state.view()).unwrap();
    assert_eq!(qa.len(), qb.len());
    assert_ne!(qa, qb);

    let again = seeded_network(NetworkConfig::default(), 1);
    assert_eq!(a, again);
}

#[test]
fn test_predict_wrong_length() {
    let network = seeded_network(small_config(), 0);
    let result = network.predict(array![1.0, 2.0].view());
    assert!(matches!(result, Err(DashError::DimensionMismatch { .. })));
}

#[test]
fn test_predict_batch_matches_predict() {
    let network = seeded_network(small_config(), 3);
    let states = array![[0.1, 0.2, 0.3, 0.4], [-1.0, 0.5, 0.0, 2.0]];
    let batch = network.predict_batch(states.view()).unwrap();
    for (row, state) in states.rows().into_iter().enumerate() {
        let single = network.predict(state).unwrap();
        for (a, b) in batch.row(row).iter().zip(single.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }
}

#[test]
fn test_td_targets_terminal_and_non_terminal() {
    let terminal = transition(0.0, 1, 2.5, true);
    let non_terminal = transition(0.0, 2, 1.0, false);
    let batch = vec![&terminal, &non_terminal];

    let outputs = array![[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]];
    let next_q = array![[9.0, 9.0, 9.0], [0.5, 3.0, -1.0]];
    let targets = td_targets(outputs.view(), next_q.view(), &batch, 0.99);

    assert_eq!(targets[[0, 1]], 2.5);
    assert_eq!(targets[[1, 2]], 1.0 + 0.99 * 3.0);
    // Untaken actions keep the current output
    assert_eq!(targets[[0, 0]], 0.1);
    assert_eq!(targets[[0, 2]], 0.3);
    assert_eq!(targets[[1, 0]], 0.4);
    assert_eq!(targets[[1, 1]], 0.5);
}

#[test]
fn test_empty_batch_is_noop() {
    let mut network = seeded_network(small_config(), 9);
    let before = network.clone();
    let stats = network.update(&[], 0.1, 0.99).unwrap();
    assert!(stats.is_none());
    assert_eq!(network, before);
}

#[test]
fn test_invalid_transition_leaves_network_untouched() {
    let mut network = seeded_network(small_config(), 9);
    let before = network.clone();
    let good = transition(0.2, 0, 1.0, false);
    let bad_action = transition(0.2, 3, 1.0, false);
    let result = network.update(&[&good, &bad_action], 0.1, 0.99);
    assert!(matches!(result, Err(DashError::InvalidAction { action: 3, max_actions: 3 })));
    assert_eq!(network, before);

    let short = Transition::new(Array1::zeros(2), 0, 0.0, Array1::zeros(4), false);
    assert!(network.update(&[&short], 0.1, 0.99).is_err());
    assert_eq!(network, before);
}

#[test]
fn test_gradient_matches_finite_difference() {
    let network = seeded_network(small_config(), 21);
    let sample = Transition::new(array![0.6, -0.2, 0.9, 0.3], 1, 0.75, Array1::zeros(4), true);
    let learning_rate = 0.01;

    let mut updated = network.clone();
    updated.update(&[&sample], learning_rate, 0.99).unwrap();

    let eps = 1e-3;
    let check = |analytic: f32, perturb: &dyn Fn(&mut ValueNetwork, f32)| {
        let mut plus = network.clone();
        perturb(&mut plus, eps);
        let mut minus = network.clone();
        perturb(&mut minus, -eps);
        let numeric = (half_squared_error(&plus, &sample) - half_squared_error(&minus, &sample)) / (2.0 * eps);
        assert!(
            (analytic - numeric).abs() < 1e-2 * (1.0 + numeric.abs()),
            "analytic {} vs numeric {}",
            analytic,
            numeric
        );
    };

    for j in 0..3 {
        let analytic = (network.output.biases[j] - updated.output.biases[j]) / learning_rate;
        check(analytic, &|n: &mut ValueNetwork, d: f32| n.output.biases[j] += d);
    }
    for i in 0..8 {
        let analytic = (network.output.weights[[i, 1]] - updated.output.weights[[i, 1]]) / learning_rate;
        check(analytic, &|n: &mut ValueNetwork, d: f32| n.output.weights[[i, 1]] += d);
    }
    for i in 0..4 {
        let analytic = (network.hidden1.weights[[i, 0]] - updated.hidden1.weights[[i, 0]]) / learning_rate;
        check(analytic, &|n: &mut ValueNetwork, d: f32| n.hidden1.weights[[i, 0]] += d);
    }
}

#[test]
fn test_repeated_updates_approach_terminal_reward() {
    let mut network = seeded_network(small_config(), 4);
    let sample = Transition::new(array![0.5, 0.1, -0.3, 0.8], 2, 1.0, Array1::zeros(4), true);

    let initial_error = (network.predict(sample.state().view()).unwrap()[2] - 1.0).abs();
    let mut last_loss = f32::INFINITY;
    for _ in 0..500 {
        let stats = network.update(&[&sample], 0.05, 0.99).unwrap().unwrap();
        assert!(stats.loss.is_finite());
        last_loss = stats.loss;
    }
    let final_error = (network.predict(sample.state().view()).unwrap()[2] - 1.0).abs();

    assert!(final_error < initial_error * 0.1 + 1e-4);
    assert!(last_loss < 1e-2);
}

#[test]
fn test_zero_learning_rate_keeps_parameters() {
    let mut network = seeded_network(small_config(), 8);
    let sample = transition(0.4, 0, 5.0, true);
    let before = network.clone();
    network.update(&[&sample], 0.0, 0.99).unwrap();
    assert_eq!(network, before);
}

#[test]
fn test_update_stats() {
    let mut network = seeded_network(small_config(), 8);
    let a = transition(0.1, 0, 1.0, true);
    let b = transition(0.7, 2, -1.0, false);
    let stats = network.update(&[&a, &b], 0.02, 0.9).unwrap().unwrap();
    assert_eq!(stats.batch_size, 2);
    assert_eq!(stats.learning_rate, 0.02);
    assert!(stats.loss >= 0.0);
}

#[test]
fn test_reinitialize_keeps_architecture() {
    let mut network = seeded_network(small_config(), 8);
    let before = network.clone();
    network.reinitialize(&mut StdRng::seed_from_u64(99)).unwrap();
    assert_eq!(network.config(), before.config());
    assert_ne!(network.hidden1.weights, before.hidden1.weights);

    let batch = Array2::<f32>::zeros((3, 4));
    assert_eq!(network.predict_batch(batch.view()).unwrap().dim(), (3, 3));
}
