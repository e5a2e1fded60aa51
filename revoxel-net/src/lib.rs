//! Revoxel Network Crate
//!
//! This crate provides the recurrent volumetric reconstruction network: a
//! per-view convolutional encoder, a gated recurrent cell that fuses view
//! features into one hidden 3D volume, and a decoder that upsamples the
//! hidden volume into a 32x32x32 voxel occupancy grid.
//!
//! ## Modules
//!
//! - [`encoder`]: Per-view 2D convolutional feature extractor (shared weights)
//! - [`recurrent`]: GRU-style gated cell over the volumetric hidden state
//! - [`decoder`]: 3D convolution + unpooling stack producing per-voxel logits
//! - [`loss`]: Per-voxel two-class cross-entropy and class prediction
//! - [`model`]: The assembled network and its forward contract
//! - [`finite`]: Finite-value diagnostics used at every stage boundary

pub mod decoder;
pub mod encoder;
pub mod finite;
pub mod loss;
pub mod model;
pub mod recurrent;

pub use finite::ensure_finite;
pub use model::VoxelNet;

/// Number of views in every input sequence.
pub const SEQ_LEN: usize = 24;
/// Input image height and width.
pub const IMAGE_SIZE: usize = 137;
/// Input image channels (RGB + silhouette alpha).
pub const IMAGE_CHANNELS: usize = 4;
/// Length of the per-view feature vector produced by the encoder.
pub const FEATURE_DIM: usize = 1024;
/// Channels of the volumetric hidden state.
pub const HIDDEN_CHANNELS: usize = 128;
/// Hidden state spatial resolution (per axis).
pub const HIDDEN_GRID: usize = 4;
/// Output occupancy grid resolution (per axis).
pub const OUTPUT_GRID: usize = 32;
/// Occupancy classes (empty, occupied).
pub const NUM_CLASSES: usize = 2;

/// Errors raised by the network forward pass.
///
/// Both variants are fatal by design: a shape mismatch is a caller bug and
/// a non-finite tensor indicates training divergence that must stop the
/// process rather than silently corrupt parameters.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("shape mismatch at {stage}: expected {expected}, got {actual:?}")]
    ShapeMismatch {
        stage: &'static str,
        expected: &'static str,
        actual: Vec<usize>,
    },
    #[error("non-finite value detected in {stage}")]
    NonFinite { stage: String },
}
