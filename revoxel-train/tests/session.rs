//! End-to-end session tests on the CPU backend.
//!
//! These run real forward/backward passes at the full input resolution,
//! so each test sticks to batch size 1 and a handful of steps.

use std::path::PathBuf;

use burn::backend::{Autodiff, NdArray};
use burn::tensor::{Int, Tensor};

use revoxel_net::{IMAGE_CHANNELS, IMAGE_SIZE, OUTPUT_GRID, SEQ_LEN};
use revoxel_train::{TrainConfig, TrainingSession};

type B = Autodiff<NdArray<f32>>;
type Inner = NdArray<f32>;

fn test_config() -> TrainConfig {
    TrainConfig::new()
        .with_learn_rate(0.01)
        .with_batch_size(1)
        .with_epoch_count(1)
}

fn session() -> TrainingSession<B> {
    TrainingSession::new(test_config(), Default::default()).expect("session construction")
}

fn zero_images() -> Tensor<B, 5> {
    Tensor::zeros(
        [1, SEQ_LEN, IMAGE_SIZE, IMAGE_SIZE, IMAGE_CHANNELS],
        &Default::default(),
    )
}

fn zero_labels() -> Tensor<B, 4, Int> {
    Tensor::zeros([1, OUTPUT_GRID, OUTPUT_GRID, OUTPUT_GRID], &Default::default())
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("revoxel-{}-{}", name, std::process::id()));
    // A crashed earlier run can leave the directory behind; start clean so
    // stale files cannot mask a failure.
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[test]
fn test_created_at_is_captured_at_construction() {
    let before = std::time::SystemTime::now();
    let session = session();
    let after = std::time::SystemTime::now();

    let created = session.created_at();
    assert!(created >= before);
    assert!(created <= after);
}

#[test]
fn test_invalid_config_fails_construction() {
    let config = TrainConfig::new().with_learn_rate(-1.0);
    assert!(TrainingSession::<B>::new(config, Default::default()).is_err());
}

#[test]
fn test_zero_batch_train_steps_count_and_history() {
    let mut session = session();
    assert_eq!(session.step_count(), 0);
    assert!(session.loss_history().is_empty());

    let first = session
        .train_step(zero_images(), zero_labels())
        .expect("first step");
    assert!(first.is_finite());
    assert!(first >= 0.0);

    let second = session
        .train_step(zero_images(), zero_labels())
        .expect("second step");
    assert!(second.is_finite());

    assert_eq!(session.step_count(), 2);
    assert_eq!(session.loss_history(), [first, second].as_slice());
}

#[test]
fn test_predict_is_binary_and_idempotent() {
    let session = session();
    let images = || {
        Tensor::<Inner, 5>::ones(
            [1, SEQ_LEN, IMAGE_SIZE, IMAGE_SIZE, IMAGE_CHANNELS],
            &Default::default(),
        )
    };

    let first = session.predict(images()).expect("predict");
    assert_eq!(first.dims(), [1, OUTPUT_GRID, OUTPUT_GRID, OUTPUT_GRID]);

    let values = first.to_data().to_vec::<i64>().unwrap();
    assert!(values.iter().all(|&v| v == 0 || v == 1));

    // Unchanged parameters give identical output.
    let second = session.predict(images()).expect("predict again");
    assert_eq!(first.to_data(), second.to_data());
}

#[test]
fn test_save_restore_round_trip_reproduces_predictions() {
    let dir = temp_dir("roundtrip");
    let images = || {
        Tensor::<Inner, 5>::ones(
            [1, SEQ_LEN, IMAGE_SIZE, IMAGE_SIZE, IMAGE_CHANNELS],
            &Default::default(),
        )
    };

    let original = session();
    let before = original.predict(images()).expect("predict before save");
    original.save(&dir).expect("save");

    assert!(dir.join("model.mpk").exists());
    assert!(dir.join("loss.json").exists());
    assert!(dir.join("loss.png").exists());

    // A fresh session starts from different random parameters; restore must
    // replace them entirely.
    let mut restored = session();
    restored.restore(&dir).expect("restore");
    let after = restored.predict(images()).expect("predict after restore");

    assert_eq!(before.to_data(), after.to_data());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_restore_fails_without_checkpoint() {
    let dir = temp_dir("missing-checkpoint");
    let mut session = session();
    assert!(session.restore(&dir).is_err());
}

#[test]
fn test_visualize_writes_graph_structure() {
    let dir = temp_dir("visualize");
    let session = session();
    session.visualize(&dir).expect("visualize");

    let graph = std::fs::read_to_string(dir.join("graph.txt")).expect("graph file");
    assert!(!graph.is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}
