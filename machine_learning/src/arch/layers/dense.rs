use ndarray::prelude::*;

use crate::{MlErr, Result, arch::Mode};

/// A fully connected layer, its parameters are laid out as the row-major `dim.0 x dim.1` weight
/// matrix followed by the `dim.1` biases.
#[derive(Clone)]
pub struct Dense {
    dim: (usize, usize),
    size: usize,

    // Forward metadata
    x: Option<Array2<f32>>,
}

impl Dense {
    /// Creates a new `Dense` layer.
    ///
    /// # Arguments
    /// * `dim` - The amount of inputs and outputs of the layer.
    pub fn new(dim: (usize, usize)) -> Self {
        Self {
            dim,
            size: (dim.0 + 1) * dim.1,
            x: None,
        }
    }

    /// Returns the size of this layer.
    ///
    /// # Returns
    /// The amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the amount of inputs and outputs of this layer.
    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    pub fn forward(&mut self, params: &[f32], x: Array2<f32>, mode: Mode) -> Result<Array2<f32>> {
        let (w, b) = self.view_params(params)?;
        let z = x.dot(&w) + &b;

        if mode == Mode::Train {
            self.x = Some(x);
        }

        Ok(z)
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: Array2<f32>,
    ) -> Result<Array2<f32>> {
        let x = self.x.take().ok_or(MlErr::MissingForwardPass)?;

        let (mut dw, mut db) = self.view_grad(grad)?;
        dw.assign(&x.t().dot(&d));
        db.assign(&d.sum_axis(Axis(0)));

        let (w, _) = self.view_params(params)?;
        Ok(d.dot(&w.t()))
    }

    pub fn clear(&mut self) {
        self.x = None;
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    ///
    /// # Arguments
    /// * `grad` - A gradient slice.
    ///
    /// # Returns
    /// A tuple containing the delta weights and delta biases.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        if grad.len() != self.size {
            return Err(self.mismatch("dense gradient", grad.len()));
        }

        let w_size = self.size - self.dim.1;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size);
        let dw = ArrayViewMut2::from_shape(self.dim, dw_raw)
            .map_err(|_| self.mismatch("dense weight gradient", w_size))?;
        let db = ArrayViewMut1::from_shape(self.dim.1, db_raw)
            .map_err(|_| self.mismatch("dense bias gradient", self.dim.1))?;
        Ok((dw, db))
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    ///
    /// # Arguments
    /// * `params` - A slice of parameters.
    ///
    /// # Returns
    /// A tuple containing the weights and biases.
    fn view_params<'a>(
        &self,
        params: &'a [f32],
    ) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        if params.len() != self.size {
            return Err(self.mismatch("dense parameters", params.len()));
        }

        let w_size = self.size - self.dim.1;
        let weights = ArrayView2::from_shape(self.dim, &params[..w_size])
            .map_err(|_| self.mismatch("dense weights", w_size))?;
        let biases = ArrayView1::from_shape(self.dim.1, &params[w_size..])
            .map_err(|_| self.mismatch("dense biases", params.len() - w_size))?;
        Ok((weights, biases))
    }

    fn mismatch(&self, what: &'static str, got: usize) -> MlErr {
        MlErr::SizeMismatch {
            what,
            got,
            expected: self.size,
        }
    }
}
