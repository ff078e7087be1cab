use serde::{Deserialize, Serialize};

/// The best parameters a model has reached so far and the accuracy they scored.
///
/// `accuracy` is `None` until the model is evaluated for the first time, `weights` then holds
/// the parameters the model started with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestSnapshot {
    pub accuracy: Option<f32>,
    pub epoch: usize,
    pub weights: Vec<f32>,
}

impl BestSnapshot {
    pub fn initial(weights: &[f32]) -> Self {
        Self {
            accuracy: None,
            epoch: 0,
            weights: weights.to_vec(),
        }
    }

    /// Records an evaluation, keeping a copy of `weights` if they beat the best so far.
    ///
    /// The first evaluation always wins, afterwards only a strictly greater accuracy does, so
    /// ties keep the earliest epoch.
    ///
    /// # Returns
    /// Whether the snapshot was replaced.
    pub fn observe(&mut self, epoch: usize, accuracy: f32, weights: &[f32]) -> bool {
        let promote = match self.accuracy {
            None => true,
            Some(best) => accuracy > best,
        };

        if promote {
            self.accuracy = Some(accuracy);
            self.epoch = epoch;
            self.weights.clear();
            self.weights.extend_from_slice(weights);
        }

        promote
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_evaluation_always_promotes() {
        let mut best = BestSnapshot::initial(&[0., 0.]);
        assert!(best.observe(1, 0.0, &[1., 1.]));
        assert_eq!(best.accuracy, Some(0.0));
        assert_eq!(best.weights, vec![1., 1.]);
    }

    #[test]
    fn best_is_monotonic_and_keeps_the_first_tie() {
        let mut best = BestSnapshot::initial(&[0.]);
        let accuracies = [0.5, 0.7, 0.7, 0.6, 0.9, 0.9];

        for (i, &acc) in accuracies.iter().enumerate() {
            let epoch = i + 1;
            best.observe(epoch, acc, &[epoch as f32]);

            let max = accuracies[..=i].iter().cloned().fold(f32::MIN, f32::max);
            assert_eq!(best.accuracy, Some(max));
            assert!(best.epoch <= epoch);
        }

        assert_eq!(best.epoch, 5);
        assert_eq!(best.weights, vec![5.]);
    }

    #[test]
    fn snapshot_is_a_copy() {
        let mut weights = vec![1., 2.];
        let mut best = BestSnapshot::initial(&weights);
        best.observe(1, 0.5, &weights);
        weights[0] = 10.;

        assert_eq!(best.weights, vec![1., 2.]);
    }
}
