use ndarray::{Array2, ArrayView2};

use super::{
    LossFn,
    softmax::{check_batch, log_softmax, one_hot, softmax},
};
use crate::Result;

/// Softmax cross-entropy against integer labels.
#[derive(Default, Clone, Copy)]
pub struct CrossEntropy;

impl CrossEntropy {
    /// Returns a new `CrossEntropy`.
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for CrossEntropy {
    fn loss(&self, logits: ArrayView2<f32>, labels: &[usize]) -> Result<f32> {
        check_batch(logits, labels)?;
        if labels.is_empty() {
            return Ok(0.);
        }

        let targets = one_hot(labels, logits.ncols())?;
        let log_probs = log_softmax(logits, 1.);
        let total = -(&targets * &log_probs).sum();
        Ok(total / labels.len() as f32)
    }

    fn loss_prime(&self, logits: ArrayView2<f32>, labels: &[usize]) -> Result<Array2<f32>> {
        check_batch(logits, labels)?;
        let n = labels.len().max(1) as f32;
        let targets = one_hot(labels, logits.ncols())?;
        Ok((softmax(logits, 1.) - targets) / n)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn uniform_logits_give_log_of_class_count() {
        let loss = CrossEntropy.loss(array![[0.0, 0.0, 0.0]].view(), &[1]).unwrap();
        assert!((loss - 3f32.ln()).abs() < 1e-6);
    }

    #[test]
    fn confident_correct_prediction_has_small_loss() {
        let loss = CrossEntropy.loss(array![[10.0, 0.0, 0.0]].view(), &[0]).unwrap();
        assert!(loss < 1e-3);
    }

    #[test]
    fn rejects_label_count_mismatch() {
        assert!(CrossEntropy.loss(array![[0.0, 1.0]].view(), &[0, 1]).is_err());
    }
}
