//! The long-lived training session
//!
//! One [`TrainingSession`] owns the network parameters, the optimizer and
//! the loss history for the lifetime of the process. The network is built
//! exactly once at construction. Callers must serialize concurrent access
//! themselves; every operation blocks until its computation completes.

use std::fs;
use std::marker::PhantomData;
use std::path::Path;
use std::time::SystemTime;

use burn::module::{AutodiffModule, Module, ModuleVisitor, ParamId};
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{GradientsParams, Optimizer, Sgd, SgdConfig};
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{ElementConversion, Int, Tensor};
use tracing::{debug, info};

use revoxel_net::finite::is_finite;
use revoxel_net::loss::{cross_entropy, predict_classes};
use revoxel_net::{NetError, VoxelNet, ensure_finite};

use crate::config::TrainConfig;
use crate::{SessionError, plot};

/// File name of the parameter checkpoint inside a save directory (the
/// recorder appends the `.mpk` extension).
const CHECKPOINT_NAME: &str = "model";
/// File name of the persisted loss history.
const HISTORY_NAME: &str = "loss.json";
/// File name of the loss-curve plot.
const PLOT_NAME: &str = "loss.png";

/// Owns the model, optimizer, device and training bookkeeping.
pub struct TrainingSession<B: AutodiffBackend> {
    config: TrainConfig,
    device: B::Device,
    model: VoxelNet<B>,
    optim: OptimizerAdaptor<Sgd<B::InnerBackend>, VoxelNet<B>, B>,
    loss_history: Vec<f32>,
    step_count: usize,
    created_at: SystemTime,
}

impl<B: AutodiffBackend> TrainingSession<B> {
    /// Build the network and optimizer once. Fails on an invalid config.
    pub fn new(config: TrainConfig, device: B::Device) -> Result<Self, SessionError> {
        config.validate()?;
        info!(
            learn_rate = config.learn_rate,
            batch_size = config.batch_size,
            epoch_count = config.epoch_count,
            "creating network"
        );

        let model = VoxelNet::new(&device);
        let optim = SgdConfig::new().init();
        info!("network created");

        Ok(Self {
            config,
            device,
            model,
            optim,
            loss_history: Vec::new(),
            step_count: 0,
            created_at: SystemTime::now(),
        })
    }

    /// One training step: forward, loss, backward, gradient finiteness
    /// check, single gradient-descent update. Returns the scalar loss.
    ///
    /// A failed step applies no update and is never retried internally.
    pub fn train_step(
        &mut self,
        images: Tensor<B, 5>,
        labels: Tensor<B, 4, Int>,
    ) -> Result<f32, SessionError> {
        let logits = self.model.forward(images)?;
        let loss = ensure_finite(cross_entropy(logits, labels)?, "batch loss")?;

        let grads = GradientsParams::from_grads(loss.backward(), &self.model);
        let mut check = GradientFiniteCheck::<B> {
            grads: &grads,
            failure: None,
            _backend: PhantomData,
        };
        self.model.visit(&mut check);
        if let Some(err) = check.failure {
            return Err(err.into());
        }

        self.model = self
            .optim
            .step(self.config.learn_rate, self.model.clone(), grads);
        self.step_count += 1;

        let value: f32 = loss.into_scalar().elem();
        self.loss_history.push(value);
        debug!(step = self.step_count, loss = value as f64, "train step");
        Ok(value)
    }

    /// Per-voxel class prediction on the inference view of the model.
    /// No gradients are computed and no parameter is mutated.
    pub fn predict(
        &self,
        images: Tensor<B::InnerBackend, 5>,
    ) -> Result<Tensor<B::InnerBackend, 4, Int>, SessionError> {
        let model = self.model.valid();
        let logits = model.forward(images)?;
        Ok(predict_classes(logits))
    }

    /// Persist the parameter checkpoint, the loss history and the loss
    /// curve plot into `dir`, creating the directory when absent.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<(), SessionError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        self.model
            .clone()
            .save_file(dir.join(CHECKPOINT_NAME), &recorder)
            .map_err(|e| SessionError::Checkpoint(e.to_string()))?;

        fs::write(
            dir.join(HISTORY_NAME),
            serde_json::to_string(&self.loss_history)?,
        )?;
        plot::render_loss_curve(&self.loss_history).save(dir.join(PLOT_NAME))?;

        info!(dir = %dir.display(), steps = self.step_count, "saved checkpoint");
        Ok(())
    }

    /// Replace the in-memory parameters with a checkpoint written by
    /// [`save`](Self::save). Fails when the checkpoint is absent or
    /// incompatible; there is no fallback.
    pub fn restore(&mut self, dir: impl AsRef<Path>) -> Result<(), SessionError> {
        let dir = dir.as_ref();
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        self.model = self
            .model
            .clone()
            .load_file(dir.join(CHECKPOINT_NAME), &recorder, &self.device)
            .map_err(|e| SessionError::Checkpoint(e.to_string()))?;

        info!(dir = %dir.display(), "restored checkpoint");
        Ok(())
    }

    /// Write the module structure into `log_dir` for external inspection.
    pub fn visualize(&self, log_dir: impl AsRef<Path>) -> Result<(), SessionError> {
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)?;
        fs::write(log_dir.join("graph.txt"), format!("{}", self.model))?;
        Ok(())
    }

    /// Scalar loss of every completed step, in chronological order.
    pub fn loss_history(&self) -> &[f32] {
        &self.loss_history
    }

    /// Number of successfully applied parameter updates.
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Wall-clock time at which this session was constructed.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }
}

/// Visits every parameter and checks the matching gradient for NaN/Inf.
/// A non-finite gradient is fatal; the update is not applied.
struct GradientFiniteCheck<'a, B: AutodiffBackend> {
    grads: &'a GradientsParams,
    failure: Option<NetError>,
    _backend: PhantomData<B>,
}

impl<'a, B: AutodiffBackend> ModuleVisitor<B> for GradientFiniteCheck<'a, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if self.failure.is_some() {
            return;
        }
        if let Some(grad) = self.grads.get::<B::InnerBackend, D>(id) {
            if !is_finite(&grad) {
                self.failure = Some(NetError::NonFinite {
                    stage: format!("gradient of parameter {id:?}"),
                });
            }
        }
    }
}
