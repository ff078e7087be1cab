use ndarray::{ArrayView2, Axis};

/// Returns the index of the largest logit of each row, the first one on ties.
pub fn argmax_rows(logits: ArrayView2<f32>) -> Vec<usize> {
    logits
        .axis_iter(Axis(0))
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |(best_i, best), (i, &z)| {
                    if z > best { (i, z) } else { (best_i, best) }
                })
                .0
        })
        .collect()
}

/// Counts the rows whose top-1 prediction matches the label.
pub fn count_correct(logits: ArrayView2<f32>, labels: &[usize]) -> usize {
    argmax_rows(logits)
        .into_iter()
        .zip(labels)
        .filter(|(pred, label)| pred == *label)
        .count()
}
