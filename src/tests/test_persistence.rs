use std::fs;
use tempfile::tempdir;

use super::{seeded_network, small_config};
use crate::config::NetworkConfig;
use crate::error::DashError;
use crate::persistence::{
    load_network_into, read_network_into, save_network, snapshot_len, staging_path, write_network,
};

#[test]
fn test_save_load_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("weights.dat");

    let original = seeded_network(NetworkConfig::default(), 1);
    save_network(&original, &path).unwrap();

    let mut restored = seeded_network(NetworkConfig::default(), 2);
    assert_ne!(restored, original);
    load_network_into(&mut restored, &path).unwrap();
    assert_eq!(restored, original);

    assert_eq!(fs::metadata(&path).unwrap().len() as usize, snapshot_len(NetworkConfig::default()));
}

#[test]
fn test_snapshot_layout() {
    let network = seeded_network(small_config(), 4);
    let mut bytes = Vec::new();
    write_network(&network, &mut bytes).unwrap();
    assert_eq!(bytes.len(), snapshot_len(small_config()));

    let word = |i: usize| [bytes[4 * i], bytes[4 * i + 1], bytes[4 * i + 2], bytes[4 * i + 3]];
    assert_eq!(i32::from_le_bytes(word(0)), 4);
    assert_eq!(i32::from_le_bytes(word(1)), 8);
    assert_eq!(i32::from_le_bytes(word(2)), 3);
    assert_eq!(f32::from_le_bytes(word(3)), network.hidden1.weights[[0, 0]]);
    assert_eq!(f32::from_le_bytes(word(4)), network.hidden1.weights[[0, 1]]);

    // First hidden unit record follows W_in
    let unit0 = 3 + 4 * 8;
    assert_eq!(f32::from_le_bytes(word(unit0)), network.hidden1.biases[0]);
    assert_eq!(f32::from_le_bytes(word(unit0 + 1)), network.hidden2.biases[0]);
    assert_eq!(f32::from_le_bytes(word(unit0 + 2)), network.hidden2.weights[[0, 0]]);
    assert_eq!(f32::from_le_bytes(word(unit0 + 2 + 8)), network.output.weights[[0, 0]]);

    let last = bytes.len() / 4 - 1;
    assert_eq!(f32::from_le_bytes(word(last)), network.output.biases[2]);
}

#[test]
fn test_mismatched_architecture_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("small.dat");
    save_network(&seeded_network(small_config(), 1), &path).unwrap();

    let mut target = seeded_network(NetworkConfig::new(4, 5, 3), 2);
    let before = target.clone();
    let result = load_network_into(&mut target, &path);
    assert!(matches!(result, Err(DashError::ConfigMismatch { .. })));
    assert_eq!(target, before);
}

#[test]
fn test_truncated_snapshot_leaves_network_unchanged() {
    let source = seeded_network(small_config(), 1);
    let mut bytes = Vec::new();
    write_network(&source, &mut bytes).unwrap();
    bytes.truncate(bytes.len() - 6);

    let mut target = seeded_network(small_config(), 2);
    let before = target.clone();
    let result = read_network_into(&mut target, bytes.as_slice());
    assert!(matches!(result, Err(DashError::Serialization(_))));
    assert_eq!(target, before);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    let mut target = seeded_network(small_config(), 2);
    let result = load_network_into(&mut target, dir.path().join("absent.dat"));
    assert!(matches!(result, Err(DashError::Io(_))));
}

#[test]
fn test_save_replaces_existing_snapshot() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("weights.dat");
    save_network(&seeded_network(small_config(), 1), &path).unwrap();

    let newer = seeded_network(small_config(), 2);
    save_network(&newer, &path).unwrap();
    assert!(!staging_path(&path).exists());

    let mut restored = seeded_network(small_config(), 3);
    load_network_into(&mut restored, &path).unwrap();
    assert_eq!(restored, newer);
}

#[test]
fn test_failed_save_keeps_previous_snapshot() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("weights.dat");
    let saved = seeded_network(small_config(), 1);
    save_network(&saved, &path).unwrap();

    // A directory in the staging slot makes the write fail
    fs::create_dir(staging_path(&path)).unwrap();
    let result = save_network(&seeded_network(small_config(), 2), &path);
    assert!(matches!(result, Err(DashError::Io(_))));

    let mut restored = seeded_network(small_config(), 3);
    load_network_into(&mut restored, &path).unwrap();
    assert_eq!(restored, saved);
}
