//! Volumetric decoder
//!
//! Upsamples the terminal hidden volume into per-voxel two-class logits at
//! 32x32x32. Upsampling is parameter-free nearest-neighbor unpooling; the
//! convolutions are all 3x3x3 with same padding. The final convolution has
//! no activation since its output feeds the loss directly.

use burn::nn::conv::{Conv3d, Conv3dConfig};
use burn::nn::PaddingConfig3d;
use burn::prelude::*;
use burn::tensor::activation::relu;

use crate::{HIDDEN_CHANNELS, NUM_CLASSES};

/// Channel trace of the five learned stages: 128 -> 128 -> 128 -> 64 -> 2.
const DECONV_FILTERS: [usize; 5] = [128, 128, 128, 64, NUM_CLASSES];

/// Hidden volume to occupancy logits.
///
/// Stage 0 unpools 4^3 to 8^3 with no learned parameters; stages 1-2 each
/// convolve, activate and unpool (8^3 -> 16^3 -> 32^3); stages 3-4 convolve
/// and activate at the target resolution; stage 5 produces raw class logits.
#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    convs: Vec<Conv3d<B>>,
}

impl<B: Backend> Decoder<B> {
    pub fn new(device: &B::Device) -> Self {
        let mut convs = Vec::with_capacity(DECONV_FILTERS.len());
        let mut in_channels = HIDDEN_CHANNELS;
        for &filters in &DECONV_FILTERS {
            convs.push(
                Conv3dConfig::new([in_channels, filters], [3, 3, 3])
                    .with_padding(PaddingConfig3d::Same)
                    .init(device),
            );
            in_channels = filters;
        }
        Self { convs }
    }

    /// Decode a `[B, 128, 4, 4, 4]` hidden volume into `[B, 32, 32, 32, 2]`
    /// logits. The caller finite-checks the result before the loss sees it.
    pub fn forward(&self, hidden: Tensor<B, 5>) -> Tensor<B, 5> {
        let mut x = unpool3d(hidden);
        x = unpool3d(relu(self.convs[0].forward(x)));
        x = unpool3d(relu(self.convs[1].forward(x)));
        x = relu(self.convs[2].forward(x));
        x = relu(self.convs[3].forward(x));
        x = self.convs[4].forward(x);

        // Class axis last: [B, D, H, W, 2].
        x.permute([0, 2, 3, 4, 1])
    }
}

/// Nearest-neighbor 2x unpooling of a `[B, C, D, H, W]` volume.
///
/// Each spatial axis is doubled by duplicating every slice in place, one
/// axis at a time, keeping the intermediate rank at six.
pub fn unpool3d<B: Backend>(x: Tensor<B, 5>) -> Tensor<B, 5> {
    let [b, c, d, h, w] = x.dims();
    let x = x
        .reshape([b, c, d, 1, h, w])
        .repeat_dim(3, 2)
        .reshape([b, c, d * 2, h, w]);
    let x = x
        .reshape([b, c, d * 2, h, 1, w])
        .repeat_dim(4, 2)
        .reshape([b, c, d * 2, h * 2, w]);
    x.reshape([b, c, d * 2, h * 2, w, 1])
        .repeat_dim(5, 2)
        .reshape([b, c, d * 2, h * 2, w * 2])
}
