//! Per-voxel two-class cross-entropy and class prediction

use burn::prelude::*;
use burn::tensor::activation::{log_softmax, softmax};

use crate::{NetError, NUM_CLASSES};

/// One-hot encode an occupancy grid.
///
/// Labels are integers in {0, 1} with shape `[B, D, H, W]`; the result is
/// `[B, D, H, W, 2]` with class 0 = empty, class 1 = occupied. The mass at
/// every voxel partitions exactly into the two classes.
pub fn one_hot_occupancy<B: Backend>(labels: Tensor<B, 4, Int>) -> Tensor<B, 5> {
    let occupied = labels.float();
    let empty = occupied.ones_like() - occupied.clone();
    Tensor::stack(vec![empty, occupied], 4)
}

/// Mean per-voxel cross-entropy of occupancy logits against integer labels.
///
/// Log-softmax over the class axis keeps the computation away from log(0);
/// the per-voxel entropies are averaged over the three spatial axes per
/// example, then over the batch, yielding one scalar tensor.
pub fn cross_entropy<B: Backend>(
    logits: Tensor<B, 5>,
    labels: Tensor<B, 4, Int>,
) -> Result<Tensor<B, 1>, NetError> {
    let dims = logits.dims();
    let [batch, d, h, w, classes] = dims;
    if classes != NUM_CLASSES || labels.dims() != [batch, d, h, w] {
        return Err(NetError::ShapeMismatch {
            stage: "loss",
            expected: "logits [B, D, H, W, 2] with labels [B, D, H, W]",
            actual: dims.to_vec(),
        });
    }

    let label = one_hot_occupancy(labels);
    let log_p = log_softmax(logits, 4);
    let per_voxel = (label * log_p).sum_dim(4).neg();
    let per_example = per_voxel.reshape([batch, d * h * w]).mean_dim(1);
    Ok(per_example.mean())
}

/// Per-voxel predicted class: argmax of the softmax along the class axis.
pub fn predict_classes<B: Backend>(logits: Tensor<B, 5>) -> Tensor<B, 4, Int> {
    let [batch, d, h, w, _] = logits.dims();
    softmax(logits, 4).argmax(4).reshape([batch, d, h, w])
}
