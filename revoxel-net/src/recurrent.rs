//! Gated recurrent fusion over a volumetric hidden state
//!
//! The cell folds the ordered sequence of view features into one hidden
//! 3D volume. Update and reset gates let it selectively overwrite or retain
//! state per voxel cell, which is what makes the fused reconstruction
//! approximately independent of the order the views arrive in, even though
//! the fold itself is strictly sequential.
//!
//! Gate equations (volumetric GRU):
//!
//! ```text
//! u  = sigmoid(Wu x + Uu * h)
//! r  = sigmoid(Wr x + Ur * h)
//! c  = tanh(Wc x + Uc * (r . h))
//! h' = (1 - u) . h + u . c
//! ```
//!
//! where `W` are fully-connected maps from the 1024-dim feature into the
//! hidden grid and `U *` are 3x3x3 same-padded convolutions over it.

use burn::nn::conv::{Conv3d, Conv3dConfig};
use burn::nn::{Linear, LinearConfig, PaddingConfig3d};
use burn::prelude::*;
use burn::tensor::activation::{sigmoid, tanh};

use crate::{FEATURE_DIM, HIDDEN_CHANNELS, HIDDEN_GRID};

/// GRU-style cell whose hidden state is a `[B, 128, 4, 4, 4]` volume.
#[derive(Module, Debug)]
pub struct GruGrid<B: Backend> {
    update_in: Linear<B>,
    update_state: Conv3d<B>,
    reset_in: Linear<B>,
    reset_state: Conv3d<B>,
    candidate_in: Linear<B>,
    candidate_state: Conv3d<B>,
}

impl<B: Backend> GruGrid<B> {
    pub fn new(device: &B::Device) -> Self {
        let grid_units = HIDDEN_CHANNELS * HIDDEN_GRID * HIDDEN_GRID * HIDDEN_GRID;
        let input = |d| LinearConfig::new(FEATURE_DIM, grid_units).init(d);
        let state = |d| {
            Conv3dConfig::new([HIDDEN_CHANNELS, HIDDEN_CHANNELS], [3, 3, 3])
                .with_padding(PaddingConfig3d::Same)
                .init(d)
        };

        Self {
            update_in: input(device),
            update_state: state(device),
            reset_in: input(device),
            reset_state: state(device),
            candidate_in: input(device),
            candidate_state: state(device),
        }
    }

    /// One fold step: fuse a `[B, 1024]` view feature into the hidden volume.
    ///
    /// `prev` is `None` on the first call of a batch, which selects the zero
    /// initial state. The hidden state has no lifetime beyond one batch.
    pub fn step(&self, feature: Tensor<B, 2>, prev: Option<Tensor<B, 5>>) -> Tensor<B, 5> {
        let [batch, _] = feature.dims();
        let device = feature.device();
        let prev = prev.unwrap_or_else(|| Self::initial_state(batch, &device));

        let update = sigmoid(
            self.project(&self.update_in, feature.clone())
                + self.update_state.forward(prev.clone()),
        );
        let reset = sigmoid(
            self.project(&self.reset_in, feature.clone())
                + self.reset_state.forward(prev.clone()),
        );
        let candidate = tanh(
            self.project(&self.candidate_in, feature)
                + self.candidate_state.forward(prev.clone() * reset),
        );

        prev * (update.ones_like() - update.clone()) + candidate * update
    }

    /// The defined initial hidden state: all zeros.
    pub fn initial_state(batch: usize, device: &B::Device) -> Tensor<B, 5> {
        Tensor::zeros(
            [batch, HIDDEN_CHANNELS, HIDDEN_GRID, HIDDEN_GRID, HIDDEN_GRID],
            device,
        )
    }

    fn project(&self, linear: &Linear<B>, feature: Tensor<B, 2>) -> Tensor<B, 5> {
        let [batch, _] = feature.dims();
        linear.forward(feature).reshape([
            batch,
            HIDDEN_CHANNELS,
            HIDDEN_GRID,
            HIDDEN_GRID,
            HIDDEN_GRID,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finite::is_finite;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    const HIDDEN_SHAPE: [usize; 5] = [1, HIDDEN_CHANNELS, HIDDEN_GRID, HIDDEN_GRID, HIDDEN_GRID];

    fn feature(fill: f32) -> Tensor<B, 2> {
        Tensor::full([1, FEATURE_DIM], fill, &Default::default())
    }

    #[test]
    fn test_first_step_uses_zero_initial_state() {
        let device = Default::default();
        let cell = GruGrid::<B>::new(&device);

        let h = cell.step(feature(0.5), None);
        assert_eq!(h.dims(), HIDDEN_SHAPE);
        assert!(is_finite(&h));
    }

    #[test]
    fn test_step_is_deterministic() {
        let device = Default::default();
        let cell = GruGrid::<B>::new(&device);

        let a = cell.step(feature(0.25), None);
        let b = cell.step(feature(0.25), None);
        assert_eq!(a.to_data(), b.to_data());
    }

    #[test]
    fn test_shape_stable_across_fold_steps() {
        let device = Default::default();
        let cell = GruGrid::<B>::new(&device);

        let mut hidden: Option<Tensor<B, 5>> = None;
        for t in 0..crate::SEQ_LEN {
            let h = cell.step(feature(t as f32 / 24.0), hidden);
            assert_eq!(h.dims(), HIDDEN_SHAPE, "hidden shape changed at step {t}");
            hidden = Some(h);
        }
    }

    #[test]
    fn test_reordered_inputs_keep_shape_and_finiteness() {
        let device = Default::default();
        let cell = GruGrid::<B>::new(&device);

        let fills: Vec<f32> = (0..crate::SEQ_LEN)
            .map(|i| (i as f32 - 12.0) / 12.0)
            .collect();
        let fold = |order: &[f32]| {
            let mut hidden: Option<Tensor<B, 5>> = None;
            for &f in order {
                hidden = Some(cell.step(feature(f), hidden));
            }
            hidden.unwrap()
        };

        let forward = fold(&fills);
        let reversed: Vec<f32> = fills.iter().rev().copied().collect();
        let backward = fold(&reversed);

        // The terminal state may differ, but shape and finiteness must hold.
        assert_eq!(forward.dims(), backward.dims());
        assert!(is_finite(&forward));
        assert!(is_finite(&backward));
    }
}
