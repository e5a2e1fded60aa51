//! Revoxel Training Runner
//!
//! Builds one training session on the CPU backend, runs a number of
//! training steps on synthetic all-zero batches and saves the resulting
//! checkpoint directory. Real data loading and batching live with the
//! caller; this binary only exercises the training surface.

use clap::Parser;
use std::path::PathBuf;

use burn::backend::{Autodiff, NdArray};
use burn::tensor::{Int, Tensor};
use tracing::info;
use tracing_subscriber::EnvFilter;

use revoxel_net::{IMAGE_CHANNELS, IMAGE_SIZE, OUTPUT_GRID, SEQ_LEN};
use revoxel_train::{SessionError, TrainConfig, TrainingSession};

type Backend = Autodiff<NdArray<f32>>;

/// Revoxel - recurrent volumetric reconstruction trainer
#[derive(Parser, Debug)]
#[command(name = "revoxel")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a JSON training config; built-in defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of training steps to run
    #[arg(short, long, default_value_t = 1)]
    steps: usize,

    /// Directory for the checkpoint, loss history and loss plot
    #[arg(short, long, default_value = "out")]
    out: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("Training error: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), SessionError> {
    let config = match &args.config {
        Some(path) => TrainConfig::from_disk(path)?,
        None => TrainConfig::new(),
    };
    let batch = config.batch_size;

    let device = Default::default();
    let mut session = TrainingSession::<Backend>::new(config, device)?;

    for step in 0..args.steps {
        let images = Tensor::<Backend, 5>::zeros(
            [batch, SEQ_LEN, IMAGE_SIZE, IMAGE_SIZE, IMAGE_CHANNELS],
            &device,
        );
        let labels = Tensor::<Backend, 4, Int>::zeros(
            [batch, OUTPUT_GRID, OUTPUT_GRID, OUTPUT_GRID],
            &device,
        );
        let loss = session.train_step(images, labels)?;
        info!(step, loss = loss as f64, "completed step");
    }

    session.save(&args.out)?;
    info!(out = %args.out.display(), "run complete");
    Ok(())
}
