use ndarray::Array2;

use crate::{
    Result,
    arch::{Mode, activations::ActFn},
};

/// A single stage of a `Sequential` model.
#[derive(Clone)]
pub enum Layer {
    Dense(super::Dense),
    Activation(super::Activation),
}

impl Layer {
    /// Creates a fully connected layer mapping `dim.0` inputs to `dim.1` outputs.
    pub fn dense(dim: (usize, usize)) -> Self {
        Self::Dense(super::Dense::new(dim))
    }

    /// Creates an element-wise activation layer.
    pub fn activation(act_fn: ActFn) -> Self {
        Self::Activation(super::Activation::new(act_fn))
    }

    /// Returns the amount of parameters this layer owns.
    pub fn size(&self) -> usize {
        match self {
            Self::Dense(l) => l.size(),
            Self::Activation(_) => 0,
        }
    }

    pub fn forward(&mut self, params: &[f32], x: Array2<f32>, mode: Mode) -> Result<Array2<f32>> {
        match self {
            Self::Dense(l) => l.forward(params, x, mode),
            Self::Activation(l) => Ok(l.forward(x, mode)),
        }
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        match self {
            Self::Dense(l) => l.backward(params, grad, d),
            Self::Activation(l) => l.backward(d),
        }
    }

    /// Drops whatever the last forward pass cached.
    pub fn clear(&mut self) {
        match self {
            Self::Dense(l) => l.clear(),
            Self::Activation(l) => l.clear(),
        }
    }
}
