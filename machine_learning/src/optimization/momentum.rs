use super::{Optimizer, OptimizerState, check_len};
use crate::{MlErr, Result};

/// Gradient descent with a momentum buffer, `v = momentum * v + g` and `w -= lr * v`.
pub struct GradientDescentWithMomentum {
    learning_rate: f32,
    momentum: f32,
    velocity: Box<[f32]>,
}

impl GradientDescentWithMomentum {
    /// Creates a new `GradientDescentWithMomentum`.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The *length* of the steps taken on `update_params`.
    /// * `momentum` - How much of the previous velocity is kept on each step.
    pub fn new(len: usize, learning_rate: f32, momentum: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            velocity: vec![0.; len].into_boxed_slice(),
        }
    }
}

impl Optimizer for GradientDescentWithMomentum {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()> {
        check_len("gradient", grad.len(), params.len())?;
        check_len("momentum buffer", self.velocity.len(), params.len())?;

        let Self {
            learning_rate: lr,
            momentum: mu,
            ..
        } = *self;

        params
            .iter_mut()
            .zip(grad)
            .zip(self.velocity.iter_mut())
            .for_each(|((p, g), v)| {
                *v = mu * *v + g;
                *p -= lr * *v;
            });

        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: f32) {
        self.learning_rate = learning_rate;
    }

    fn state(&self) -> OptimizerState {
        OptimizerState::GradientDescentWithMomentum {
            learning_rate: self.learning_rate,
            momentum: self.momentum,
            velocity: self.velocity.to_vec(),
        }
    }

    fn load_state(&mut self, state: OptimizerState) -> Result<()> {
        let got = state.kind();
        let OptimizerState::GradientDescentWithMomentum {
            learning_rate,
            momentum,
            velocity,
        } = state
        else {
            return Err(MlErr::StateMismatch {
                expected: "gradient_descent_with_momentum",
                got,
            });
        };

        check_len("momentum buffer", velocity.len(), self.velocity.len())?;
        self.learning_rate = learning_rate;
        self.momentum = momentum;
        self.velocity = velocity.into_boxed_slice();
        Ok(())
    }
}
