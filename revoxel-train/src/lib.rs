//! Revoxel Training Crate
//!
//! This crate owns the training lifecycle around [`revoxel_net::VoxelNet`]:
//! configuration, the long-lived training session with its optimizer and
//! loss history, checkpoint persistence, and the loss-curve plot.
//!
//! ## Modules
//!
//! - [`config`]: Training hyperparameters with defaults and disk loading
//! - [`session`]: The one long-lived session exposing train/predict/save/restore
//! - [`plot`]: Loss-curve rendering for the saved checkpoint directory

pub mod config;
pub mod plot;
pub mod session;

pub use config::TrainConfig;
pub use session::TrainingSession;

use revoxel_net::NetError;

/// Errors surfaced by session operations.
///
/// All propagate synchronously to the caller of the triggering operation;
/// there is no internal retry and no partial-failure mode.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("network error: {0}")]
    Net(#[from] NetError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("configuration load error: {0}")]
    Config(String),
    #[error("checkpoint error: {0}")]
    Checkpoint(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("loss history encoding error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("plot encoding error: {0}")]
    Image(#[from] image::ImageError),
}
