//! The assembled reconstruction network
//!
//! One encoder, one recurrent cell, one decoder, wired together behind a
//! single forward contract. Finite-value checks run at every stage boundary
//! so a diverging run fails loudly with the stage name instead of silently
//! corrupting parameters.

use burn::prelude::*;
use tracing::debug;

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::finite::ensure_finite;
use crate::recurrent::GruGrid;
use crate::{FEATURE_DIM, IMAGE_CHANNELS, IMAGE_SIZE, NetError, SEQ_LEN};

/// Encoder-recurrent-decoder network mapping a 24-view image sequence to
/// per-voxel occupancy logits.
#[derive(Module, Debug)]
pub struct VoxelNet<B: Backend> {
    encoder: Encoder<B>,
    recurrent: GruGrid<B>,
    decoder: Decoder<B>,
}

impl<B: Backend> VoxelNet<B> {
    /// Build the full network on the given device.
    pub fn new(device: &B::Device) -> Self {
        debug!("building encoder");
        let encoder = Encoder::new(device);
        debug!("building recurrent cell");
        let recurrent = GruGrid::new(device);
        debug!("building decoder");
        let decoder = Decoder::new(device);
        debug!("network ready");

        Self {
            encoder,
            recurrent,
            decoder,
        }
    }

    /// Full forward pass: `[B, 24, 137, 137, 4]` images to
    /// `[B, 32, 32, 32, 2]` logits.
    ///
    /// The hidden state is reinitialized for every call; it has no lifetime
    /// beyond one batch. Any shape violation or non-finite intermediate is
    /// fatal and aborts the pass.
    pub fn forward(&self, images: Tensor<B, 5>) -> Result<Tensor<B, 5>, NetError> {
        let dims = images.dims();
        let [batch, views, height, width, channels] = dims;
        if views != SEQ_LEN
            || height != IMAGE_SIZE
            || width != IMAGE_SIZE
            || channels != IMAGE_CHANNELS
        {
            return Err(NetError::ShapeMismatch {
                stage: "input",
                expected: "[B, 24, 137, 137, 4]",
                actual: dims.to_vec(),
            });
        }

        let features = ensure_finite(self.encoder.forward(images), "encoder output")?;

        let view_feature = |t: usize| {
            features
                .clone()
                .slice([0..batch, t..t + 1, 0..FEATURE_DIM])
                .reshape([batch, FEATURE_DIM])
        };

        // Strict sequential fold: step t depends on step t - 1. The first
        // call passes None to select the zero initial state.
        let mut hidden = ensure_finite(
            self.recurrent.step(view_feature(0), None),
            "hidden state at step 0",
        )?;
        for t in 1..SEQ_LEN {
            let next = self.recurrent.step(view_feature(t), Some(hidden));
            hidden = ensure_finite(next, &format!("hidden state at step {t}"))?;
        }

        ensure_finite(self.decoder.forward(hidden), "decoder output")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn test_forward_rejects_wrong_view_count() {
        let device = Default::default();
        let net = VoxelNet::<B>::new(&device);
        let images = Tensor::<B, 5>::zeros([1, 12, IMAGE_SIZE, IMAGE_SIZE, IMAGE_CHANNELS], &device);

        match net.forward(images) {
            Err(NetError::ShapeMismatch { stage, actual, .. }) => {
                assert_eq!(stage, "input");
                assert_eq!(actual, vec![1, 12, IMAGE_SIZE, IMAGE_SIZE, IMAGE_CHANNELS]);
            }
            other => panic!("expected shape mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_forward_rejects_wrong_spatial_size() {
        let device = Default::default();
        let net = VoxelNet::<B>::new(&device);
        let images = Tensor::<B, 5>::zeros([1, SEQ_LEN, 64, 64, IMAGE_CHANNELS], &device);
        assert!(net.forward(images).is_err());
    }
}
