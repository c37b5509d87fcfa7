use ndarray::Array1;
use tempfile::tempdir;

use super::{seeded_network, small_agent_config};
use crate::agent::{ControlSource, LearningEngine, OperatingContext, SkipReason, TrainOutcome};
use crate::config::{AgentConfig, NetworkConfig};
use crate::error::DashError;

fn state(fill: f32) -> Array1<f32> {
    Array1::from_elem(4, fill)
}

#[test]
fn test_engine_creation() {
    let engine = LearningEngine::new(small_agent_config(4)).unwrap();
    assert!(engine.has_network());
    assert_eq!(engine.attempts(), 0);
    assert_eq!(engine.exploration_rate(OperatingContext::Cube), 0.99);
    assert_eq!(engine.network().unwrap().config(), NetworkConfig::new(4, 8, 3));
}

#[test]
fn test_invalid_config_rejected() {
    let config = AgentConfig { batch_size: 0, ..AgentConfig::default() };
    assert!(matches!(LearningEngine::new(config), Err(DashError::InvalidParameter { .. })));
}

#[test]
fn test_same_seed_same_engine() {
    let a = LearningEngine::new(small_agent_config(4)).unwrap();
    let b = LearningEngine::new(small_agent_config(4)).unwrap();
    assert_eq!(a.network().unwrap(), b.network().unwrap());
}

#[test]
fn test_attempt_lifecycle_decays_one_context() {
    let mut engine = LearningEngine::new(small_agent_config(4)).unwrap();
    assert_eq!(engine.begin_attempt(), 1);
    assert_eq!(engine.begin_attempt(), 2);
    let rate = engine.finish_attempt(OperatingContext::Ship);
    assert!(rate < 0.99);
    assert_eq!(engine.exploration_rate(OperatingContext::Ship), rate);
    assert_eq!(engine.exploration_rate(OperatingContext::Cube), 0.99);
}

#[test]
fn test_trains_on_fifth_attempt() {
    let mut engine = LearningEngine::new(small_agent_config(4)).unwrap();
    for i in 0..4 {
        engine
            .observe(state(i as f32 * 0.2), i % 3, 0.1, state(i as f32 * 0.2 + 0.1), false, ControlSource::Agent)
            .unwrap();
    }

    for _ in 0..4 {
        engine.begin_attempt();
        assert_eq!(engine.maybe_train().unwrap(), TrainOutcome::Skipped(SkipReason::OffSchedule));
    }
    engine.begin_attempt();
    let before = engine.network().unwrap().clone();
    assert!(engine.maybe_train().unwrap().is_trained());
    assert_ne!(engine.network().unwrap(), &before);
}

#[test]
fn test_missing_network() {
    let mut engine = LearningEngine::without_network(small_agent_config(4)).unwrap();
    assert!(!engine.has_network());
    assert!(matches!(
        engine.select_action(OperatingContext::Cube, state(0.0).view()),
        Err(DashError::MissingNetwork)
    ));
    assert!(matches!(engine.maybe_train(), Err(DashError::MissingNetwork)));
    assert!(matches!(engine.save_default(), Err(DashError::MissingNetwork)));
    assert!(matches!(engine.load_default(), Err(DashError::MissingNetwork)));

    // Observing needs no network
    engine
        .observe(state(0.0), 0, 0.0, state(0.1), false, ControlSource::Agent)
        .unwrap();
    assert_eq!(engine.trainer().replay().len(), 1);

    engine.reset_network().unwrap();
    assert!(engine.select_action(OperatingContext::Cube, state(0.0).view()).is_ok());
}

#[test]
fn test_attach_network_checks_architecture() {
    let mut engine = LearningEngine::without_network(small_agent_config(4)).unwrap();
    let wrong = seeded_network(NetworkConfig::new(4, 6, 3), 0);
    assert!(matches!(engine.attach_network(wrong), Err(DashError::ConfigMismatch { .. })));
    assert!(!engine.has_network());

    let right = seeded_network(NetworkConfig::new(4, 8, 3), 0);
    engine.attach_network(right.clone()).unwrap();
    assert_eq!(engine.network().unwrap(), &right);
    assert_eq!(engine.detach_network(), Some(right));
    assert!(!engine.has_network());
}

#[test]
fn test_exploration_overrides() {
    let mut engine = LearningEngine::new(small_agent_config(4)).unwrap();
    engine.set_exploration(OperatingContext::Wave, 0.1).unwrap();
    assert_eq!(engine.exploration_rate(OperatingContext::Wave), 0.1);
    engine.reset_exploration(OperatingContext::Wave, 0.5).unwrap();
    assert_eq!(engine.exploration_rate(OperatingContext::Wave), 0.5);
    assert!(engine.set_exploration(OperatingContext::Wave, 2.0).is_err());
    assert_eq!(engine.exploration_rate(OperatingContext::Wave), 0.5);
}

#[test]
fn test_save_and_load_default_path() {
    let dir = tempdir().unwrap();
    let config = AgentConfig {
        weights_path: dir.path().join("net.dat"),
        ..small_agent_config(4)
    };
    let engine = LearningEngine::new(config.clone()).unwrap();
    engine.save_default().unwrap();

    let mut other = LearningEngine::new(AgentConfig { seed: Some(12345), ..config }).unwrap();
    assert_ne!(other.network().unwrap(), engine.network().unwrap());
    other.load_default().unwrap();
    assert_eq!(other.network().unwrap(), engine.network().unwrap());
}

#[test]
fn test_failed_load_keeps_weights() {
    let dir = tempdir().unwrap();
    let mut engine = LearningEngine::new(small_agent_config(4)).unwrap();
    let before = engine.network().unwrap().clone();
    assert!(engine.load(dir.path().join("missing.dat")).is_err());
    assert_eq!(engine.network().unwrap(), &before);
}
