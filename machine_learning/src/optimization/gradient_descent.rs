use super::{Optimizer, OptimizerState, check_len};
use crate::{MlErr, Result};

/// Gradient descent optimization algorithm.
pub struct GradientDescent {
    learning_rate: f32,
}

impl GradientDescent {
    /// Returns a new `GradientDescent`.
    ///
    /// # Arguments
    /// * `learning_rate` - The *length* of the steps taken on `update_params`.
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for GradientDescent {
    /// Makes a step in the opposite direction of the gradient, with a length of `learning_rate`.
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()> {
        check_len("gradient", grad.len(), params.len())?;
        let lr = self.learning_rate;

        for (w, g) in params.iter_mut().zip(grad) {
            *w -= lr * g;
        }

        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: f32) {
        self.learning_rate = learning_rate;
    }

    fn state(&self) -> OptimizerState {
        OptimizerState::GradientDescent {
            learning_rate: self.learning_rate,
        }
    }

    fn load_state(&mut self, state: OptimizerState) -> Result<()> {
        let got = state.kind();
        let OptimizerState::GradientDescent { learning_rate } = state else {
            return Err(MlErr::StateMismatch {
                expected: "gradient_descent",
                got,
            });
        };

        self.learning_rate = learning_rate;
        Ok(())
    }
}
