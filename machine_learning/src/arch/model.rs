use ndarray::{Array2, ArrayView2};

use crate::Result;

/// Whether a model caches what backpropagation needs (`Train`) or only runs inference (`Eval`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Train,
    Eval,
}

/// A classifier that owns a flat parameter buffer and maps a batch of inputs to logits.
pub trait Model: Send {
    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize;

    /// Returns the model's parameters as a flat slice.
    fn params(&self) -> &[f32];

    /// Returns the model's parameters as a mutable flat slice, used by the optimizers.
    fn params_mut(&mut self) -> &mut [f32];

    /// Overwrites the model's parameters.
    ///
    /// # Arguments
    /// * `params` - The new parameters, must be exactly `size()` long.
    ///
    /// # Returns
    /// A size mismatch error if `params` has the wrong length.
    fn load_params(&mut self, params: &[f32]) -> Result<()>;

    /// Returns the current mode of the model.
    fn mode(&self) -> Mode;

    /// Switches the model to the given mode.
    fn set_mode(&mut self, mode: Mode);

    /// Makes a forward pass through the model.
    ///
    /// In `Mode::Train` the intermediate values needed by `backward` are kept, in `Mode::Eval`
    /// nothing is cached and the model is left untouched.
    ///
    /// # Arguments
    /// * `x` - A batch of inputs, one row per sample.
    ///
    /// # Returns
    /// The logits, one row per sample.
    fn forward(&mut self, x: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Backpropagates the derivative of the loss with respect to the last forward's logits.
    ///
    /// # Arguments
    /// * `d` - The derivative of the loss with respect to the logits.
    /// * `grad` - A `size()` long buffer where the gradient gets written.
    fn backward(&mut self, d: Array2<f32>, grad: &mut [f32]) -> Result<()>;
}

impl<M: Model + ?Sized> Model for Box<M> {
    fn size(&self) -> usize {
        (**self).size()
    }

    fn params(&self) -> &[f32] {
        (**self).params()
    }

    fn params_mut(&mut self) -> &mut [f32] {
        (**self).params_mut()
    }

    fn load_params(&mut self, params: &[f32]) -> Result<()> {
        (**self).load_params(params)
    }

    fn mode(&self) -> Mode {
        (**self).mode()
    }

    fn set_mode(&mut self, mode: Mode) {
        (**self).set_mode(mode)
    }

    fn forward(&mut self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        (**self).forward(x)
    }

    fn backward(&mut self, d: Array2<f32>, grad: &mut [f32]) -> Result<()> {
        (**self).backward(d, grad)
    }
}
