//! Finite-value diagnostics
//!
//! Training divergence shows up as NaN or Inf somewhere in the forward pass
//! or the gradients. Every stage boundary runs its tensor through
//! [`ensure_finite`] so the failure names the stage that produced it.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::NetError;

/// Check that a tensor contains only finite values.
///
/// Returns the tensor unchanged on success so the check can be threaded
/// through a forward pass. The `stage` tag ends up in the error message.
pub fn ensure_finite<B: Backend, const D: usize>(
    tensor: Tensor<B, D>,
    stage: &str,
) -> Result<Tensor<B, D>, NetError> {
    if is_finite(&tensor) {
        Ok(tensor)
    } else {
        Err(NetError::NonFinite {
            stage: stage.to_string(),
        })
    }
}

/// True when no element of the tensor is NaN or Inf.
pub fn is_finite<B: Backend, const D: usize>(tensor: &Tensor<B, D>) -> bool {
    tensor.to_data().iter::<f32>().all(f32::is_finite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn test_ensure_finite_accepts_ordinary_values() {
        let device = Default::default();
        let t = Tensor::<B, 2>::from_floats([[0.0, -1.5], [3.25, 1e20]], &device);
        assert!(ensure_finite(t, "test").is_ok());
    }

    #[test]
    fn test_ensure_finite_rejects_nan() {
        let device = Default::default();
        let t = Tensor::<B, 1>::from_floats([1.0, f32::NAN, 2.0], &device);
        let err = ensure_finite(t, "hidden state at step 3").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("hidden state at step 3"), "message: {msg}");
    }

    #[test]
    fn test_ensure_finite_rejects_infinity() {
        let device = Default::default();
        let t = Tensor::<B, 1>::from_floats([1.0, f32::INFINITY], &device);
        assert!(ensure_finite(t, "logits").is_err());

        let t = Tensor::<B, 1>::from_floats([f32::NEG_INFINITY, 0.0], &device);
        assert!(ensure_finite(t, "logits").is_err());
    }
}
