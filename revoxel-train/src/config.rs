//! Training hyperparameters
//!
//! The session is constructed with an explicit [`TrainConfig`]. When the
//! caller has none, [`TrainConfig::from_disk`] is the documented collaborator
//! for loading one from a JSON file; there is no implicit global fallback.

use std::path::Path;

use burn::config::Config;

use crate::SessionError;

/// Hyperparameters of one training session.
///
/// Only these three values are externally tunable.
#[derive(Config, Debug)]
pub struct TrainConfig {
    /// Fixed learning rate of the plain gradient-descent update.
    #[config(default = 0.01)]
    pub learn_rate: f64,
    /// Number of examples per batch.
    #[config(default = 16)]
    pub batch_size: usize,
    /// Number of passes over the training set the caller intends to run.
    #[config(default = 5)]
    pub epoch_count: usize,
}

impl TrainConfig {
    /// Load a configuration from a JSON file written by [`Config::save`].
    pub fn from_disk(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        Self::load(path.as_ref()).map_err(|e| SessionError::Config(e.to_string()))
    }

    /// Reject values a session cannot train with.
    pub fn validate(&self) -> Result<(), SessionError> {
        if !(self.learn_rate.is_finite() && self.learn_rate > 0.0) {
            return Err(SessionError::InvalidConfig(format!(
                "learn_rate must be a positive finite number, got {}",
                self.learn_rate
            )));
        }
        if self.batch_size == 0 {
            return Err(SessionError::InvalidConfig(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.epoch_count == 0 {
            return Err(SessionError::InvalidConfig(
                "epoch_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
