//! Per-view convolutional encoder
//!
//! Every view of the input sequence runs through the same convolution stack
//! (one parameter set, shared across time). The time axis is folded into the
//! batch axis so all 24 views are processed in one vectorized pass, which
//! also guarantees no cross-view leakage.

use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::{Linear, LinearConfig, PaddingConfig2d};
use burn::prelude::*;
use burn::tensor::activation::relu;

use crate::{FEATURE_DIM, IMAGE_CHANNELS};

/// Filter counts of the six convolution blocks.
const CONV_FILTERS: [usize; 6] = [96, 128, 256, 256, 256, 256];

/// Per-view feature extractor.
///
/// Six blocks of same-padded convolution (7x7 kernel first, 3x3 after),
/// 2x2/stride-2 max pooling and ReLU, spatially 137 -> 68 -> 34 -> 17 ->
/// 8 -> 4 -> 2, followed by flatten and a 1024-unit fully-connected stage.
#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    convs: Vec<Conv2d<B>>,
    pool: MaxPool2d,
    fc: Linear<B>,
}

impl<B: Backend> Encoder<B> {
    pub fn new(device: &B::Device) -> Self {
        let mut convs = Vec::with_capacity(CONV_FILTERS.len());
        let mut in_channels = IMAGE_CHANNELS;
        for (i, &filters) in CONV_FILTERS.iter().enumerate() {
            let kernel = if i == 0 { 7 } else { 3 };
            convs.push(
                Conv2dConfig::new([in_channels, filters], [kernel, kernel])
                    .with_padding(PaddingConfig2d::Same)
                    .init(device),
            );
            in_channels = filters;
        }

        // Final feature map is 256 channels at 2x2, so flatten yields 1024.
        let fc = LinearConfig::new(FEATURE_DIM, FEATURE_DIM).init(device);

        Self {
            convs,
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            fc,
        }
    }

    /// Encode a batch of view sequences.
    ///
    /// Input is `[B, T, H, W, C]`; output is `[B, T, 1024]`. The caller is
    /// responsible for validating the input contract and finite-checking
    /// the result.
    pub fn forward(&self, images: Tensor<B, 5>) -> Tensor<B, 3> {
        let [batch, views, height, width, channels] = images.dims();

        // Channel-first and time folded into batch: [B*T, C, H, W].
        let mut x = images
            .permute([0, 1, 4, 2, 3])
            .reshape([batch * views, channels, height, width]);

        for conv in &self.convs {
            x = relu(self.pool.forward(conv.forward(x)));
        }

        let flat = x.reshape([batch * views, FEATURE_DIM]);
        let features = relu(self.fc.forward(flat));
        features.reshape([batch, views, FEATURE_DIM])
    }
}
