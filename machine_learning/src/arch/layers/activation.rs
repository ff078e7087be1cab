use ndarray::Array2;

use crate::{MlErr, Result, arch::Mode, arch::activations::ActFn};

/// Applies an activation function element-wise.
#[derive(Clone)]
pub struct Activation {
    act_fn: ActFn,
    z: Option<Array2<f32>>,
}

impl Activation {
    pub fn new(act_fn: ActFn) -> Self {
        Self { act_fn, z: None }
    }

    pub fn forward(&mut self, z: Array2<f32>, mode: Mode) -> Array2<f32> {
        let a = z.mapv(|z| self.act_fn.f(z));

        if mode == Mode::Train {
            self.z = Some(z);
        }

        a
    }

    pub fn backward(&mut self, mut d: Array2<f32>) -> Result<Array2<f32>> {
        let z = self.z.take().ok_or(MlErr::MissingForwardPass)?;
        d.zip_mut_with(&z, |d, &z| *d *= self.act_fn.df(z));
        Ok(d)
    }

    pub fn clear(&mut self) {
        self.z = None;
    }
}
