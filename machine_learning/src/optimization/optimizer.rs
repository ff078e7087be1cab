use super::OptimizerState;
use crate::Result;

/// An optimization algorithm that updates a flat parameter buffer given its gradient.
pub trait Optimizer: Send {
    /// Updates the parameters according to the algorithm's learning rule.
    ///
    /// # Arguments
    /// * `params` - The parameters that are going to be modified.
    /// * `grad` - The gradient used for taking the step.
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()>;

    /// Returns the current learning rate.
    fn learning_rate(&self) -> f32;

    /// Replaces the learning rate, used by the learning rate schedulers.
    fn set_learning_rate(&mut self, learning_rate: f32);

    /// Returns a snapshot of the optimizer's internal state.
    fn state(&self) -> OptimizerState;

    /// Restores a snapshot taken with `state`.
    ///
    /// # Returns
    /// An error if the snapshot belongs to another algorithm or its buffers have the wrong size.
    fn load_state(&mut self, state: OptimizerState) -> Result<()>;
}

impl<T: Optimizer + ?Sized> Optimizer for Box<T> {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()> {
        (**self).update_params(params, grad)
    }

    fn learning_rate(&self) -> f32 {
        (**self).learning_rate()
    }

    fn set_learning_rate(&mut self, learning_rate: f32) {
        (**self).set_learning_rate(learning_rate)
    }

    fn state(&self) -> OptimizerState {
        (**self).state()
    }

    fn load_state(&mut self, state: OptimizerState) -> Result<()> {
        (**self).load_state(state)
    }
}
