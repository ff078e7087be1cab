use ndarray::{Array2, ArrayView2};
use rand::Rng;

use super::{Mode, Model, layers::Layer};
use crate::{MlErr, Result, initialization};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
///
/// The parameters of every layer live contiguously in a single flat buffer, in layer order.
#[derive(Clone)]
pub struct Sequential {
    layers: Vec<Layer>,
    params: Vec<f32>,
    mode: Mode,
}

impl Sequential {
    /// Creates a new `Sequential` with every parameter set to zero.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Layer>,
    {
        let layers: Vec<_> = layers.into_iter().collect();
        let size = layers.iter().map(Layer::size).sum();

        Self {
            layers,
            params: vec![0.; size],
            mode: Mode::Train,
        }
    }

    /// Initializes the dense layers' weights with Xavier uniform initialization and their
    /// biases with zeros.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    pub fn init<R: Rng>(&mut self, rng: &mut R) -> Result<()> {
        let mut offset = 0;

        for layer in &self.layers {
            let size = layer.size();

            if let Layer::Dense(dense) = layer {
                let (fan_in, fan_out) = dense.dim();
                let params = &mut self.params[offset..offset + size];
                let (weights, biases) = params.split_at_mut(fan_in * fan_out);
                initialization::xavier_uniform(rng, fan_in, fan_out, weights)?;
                biases.fill(0.);
            }

            offset += size;
        }

        Ok(())
    }

    /// Returns the amount of inputs the first dense layer expects, if any.
    pub fn in_features(&self) -> Option<usize> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Dense(dense) => Some(dense.dim().0),
            _ => None,
        })
    }

    /// Returns the amount of outputs the last dense layer produces, if any.
    pub fn out_features(&self) -> Option<usize> {
        self.layers.iter().rev().find_map(|layer| match layer {
            Layer::Dense(dense) => Some(dense.dim().1),
            _ => None,
        })
    }

    fn offsets(&self) -> Vec<usize> {
        self.layers
            .iter()
            .scan(0, |offset, layer| {
                let start = *offset;
                *offset += layer.size();
                Some(start)
            })
            .collect()
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.params.len()
    }

    fn params(&self) -> &[f32] {
        &self.params
    }

    fn params_mut(&mut self) -> &mut [f32] {
        &mut self.params
    }

    fn load_params(&mut self, params: &[f32]) -> Result<()> {
        if params.len() != self.params.len() {
            return Err(MlErr::SizeMismatch {
                what: "model parameters",
                got: params.len(),
                expected: self.params.len(),
            });
        }

        self.params.copy_from_slice(params);
        Ok(())
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn set_mode(&mut self, mode: Mode) {
        if mode == Mode::Eval {
            self.layers.iter_mut().for_each(Layer::clear);
        }

        self.mode = mode;
    }

    fn forward(&mut self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        if let Some(n) = self.in_features() {
            if x.ncols() != n {
                return Err(MlErr::SizeMismatch {
                    what: "input features",
                    got: x.ncols(),
                    expected: n,
                });
            }
        }

        let mode = self.mode;
        let mut offset = 0;
        let mut a = x.to_owned();

        for layer in &mut self.layers {
            let size = layer.size();
            let params = &self.params[offset..offset + size];
            a = layer.forward(params, a, mode)?;
            offset += size;
        }

        Ok(a)
    }

    fn backward(&mut self, mut d: Array2<f32>, grad: &mut [f32]) -> Result<()> {
        if grad.len() != self.params.len() {
            return Err(MlErr::SizeMismatch {
                what: "gradient",
                got: grad.len(),
                expected: self.params.len(),
            });
        }

        if self.mode == Mode::Eval {
            return Err(MlErr::MissingForwardPass);
        }

        let offsets = self.offsets();

        for (layer, &offset) in self.layers.iter_mut().zip(&offsets).rev() {
            let size = layer.size();
            let params = &self.params[offset..offset + size];
            let grad = &mut grad[offset..offset + size];
            d = layer.backward(params, grad, d)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::arch::{
        activations::ActFn,
        loss::{CrossEntropy, LossFn},
    };

    fn mlp() -> Sequential {
        let mut model = Sequential::new([
            Layer::dense((2, 4)),
            Layer::activation(ActFn::tanh()),
            Layer::dense((4, 3)),
        ]);
        model.init(&mut StdRng::seed_from_u64(7)).unwrap();
        model
    }

    #[test]
    fn reports_size_and_features() {
        let model = mlp();
        assert_eq!(model.size(), (2 + 1) * 4 + (4 + 1) * 3);
        assert_eq!(model.in_features(), Some(2));
        assert_eq!(model.out_features(), Some(3));
    }

    #[test]
    fn eval_forward_does_not_allow_backward() {
        let mut model = mlp();
        model.set_mode(Mode::Eval);
        let logits = model.forward(array![[0.5, -1.0]].view()).unwrap();
        let mut grad = vec![0.; model.size()];

        assert!(matches!(
            model.backward(logits, &mut grad),
            Err(MlErr::MissingForwardPass)
        ));
    }

    #[test]
    fn rejects_wrong_input_width() {
        let mut model = mlp();
        let err = model.forward(array![[1.0, 2.0, 3.0]].view()).unwrap_err();
        assert!(matches!(err, MlErr::SizeMismatch { got: 3, expected: 2, .. }));
    }

    #[test]
    fn backward_matches_numerical_gradient() {
        let mut model = mlp();
        let x = array![[0.3, -0.7], [1.2, 0.4]];
        let labels = [2, 0];
        let loss_fn = CrossEntropy::new();

        let logits = model.forward(x.view()).unwrap();
        let d = loss_fn.loss_prime(logits.view(), &labels).unwrap();
        let mut grad = vec![0.; model.size()];
        model.backward(d, &mut grad).unwrap();

        model.set_mode(Mode::Eval);
        let eps = 1e-2;
        let original = model.params().to_vec();

        for i in 0..model.size() {
            let mut plus = original.clone();
            plus[i] += eps;
            model.load_params(&plus).unwrap();
            let l_plus = loss_fn
                .loss(model.forward(x.view()).unwrap().view(), &labels)
                .unwrap();

            let mut minus = original.clone();
            minus[i] -= eps;
            model.load_params(&minus).unwrap();
            let l_minus = loss_fn
                .loss(model.forward(x.view()).unwrap().view(), &labels)
                .unwrap();

            let numerical = (l_plus - l_minus) / (2. * eps);
            assert!(
                (numerical - grad[i]).abs() < 1e-2,
                "param {i}: numerical {numerical} vs analytical {}",
                grad[i]
            );
        }
    }
}
