use ndarray::{Array2, ArrayView2};

use crate::Result;

/// A classification loss over a batch of logits and integer labels.
pub trait LossFn {
    /// Returns the batch-mean loss.
    fn loss(&self, logits: ArrayView2<f32>, labels: &[usize]) -> Result<f32>;

    /// Returns the derivative of `loss` with respect to each logit.
    fn loss_prime(&self, logits: ArrayView2<f32>, labels: &[usize]) -> Result<Array2<f32>>;
}
