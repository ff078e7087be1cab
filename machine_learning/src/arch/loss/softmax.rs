//! Row-wise softmax helpers shared by the classification losses.

use ndarray::{Array2, ArrayView2, Axis};

use crate::{MlErr, Result};

/// Computes the softmax of each row of `logits / temperature`.
pub fn softmax(logits: ArrayView2<f32>, temperature: f32) -> Array2<f32> {
    let mut out = log_softmax(logits, temperature);
    out.mapv_inplace(f32::exp);
    out
}

/// Computes the log-softmax of each row of `logits / temperature`, subtracting the row maximum
/// first so large logits don't overflow.
pub fn log_softmax(logits: ArrayView2<f32>, temperature: f32) -> Array2<f32> {
    let mut out = logits.mapv(|z| z / temperature);

    for mut row in out.axis_iter_mut(Axis(0)) {
        let max = row.fold(f32::NEG_INFINITY, |m, &z| m.max(z));
        let log_sum = row.mapv(|z| (z - max).exp()).sum().ln() + max;
        row.mapv_inplace(|z| z - log_sum);
    }

    out
}

/// Builds the one-hot encoding of `labels` with `num_classes` columns.
pub fn one_hot(labels: &[usize], num_classes: usize) -> Result<Array2<f32>> {
    let mut out = Array2::zeros((labels.len(), num_classes));

    for (i, &label) in labels.iter().enumerate() {
        if label >= num_classes {
            return Err(MlErr::InvalidInput(format!(
                "label {label} is out of range for {num_classes} classes"
            )));
        }

        out[[i, label]] = 1.;
    }

    Ok(out)
}

/// Checks that there is exactly one label per row of logits.
pub fn check_batch(logits: ArrayView2<f32>, labels: &[usize]) -> Result<()> {
    if logits.nrows() != labels.len() {
        return Err(MlErr::SizeMismatch {
            what: "labels",
            got: labels.len(),
            expected: logits.nrows(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn rows_sum_to_one() {
        let probs = softmax(array![[1.0, 2.0, 3.0], [1000.0, 0.0, -1000.0]].view(), 1.0);

        for row in probs.axis_iter(Axis(0)) {
            assert!((row.sum() - 1.0).abs() < 1e-6);
            assert!(row.iter().all(|p| p.is_finite()));
        }
    }

    #[test]
    fn temperature_softens_distribution() {
        let logits = array![[4.0, 1.0, 0.0]];
        let sharp = softmax(logits.view(), 1.0);
        let soft = softmax(logits.view(), 20.0);

        assert!(soft[[0, 0]] < sharp[[0, 0]]);
        assert!(soft[[0, 2]] > sharp[[0, 2]]);
    }

    #[test]
    fn one_hot_rejects_out_of_range_labels() {
        assert!(one_hot(&[0, 3], 3).is_err());
        assert_eq!(one_hot(&[2], 3).unwrap(), array![[0.0, 0.0, 1.0]]);
    }
}
