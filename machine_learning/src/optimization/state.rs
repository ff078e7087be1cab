use serde::{Deserialize, Serialize};

/// A serializable snapshot of an optimizer, enough to resume training exactly where it stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OptimizerState {
    GradientDescent {
        learning_rate: f32,
    },
    GradientDescentWithMomentum {
        learning_rate: f32,
        momentum: f32,
        velocity: Vec<f32>,
    },
    Adam {
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
        beta1_t: f32,
        beta2_t: f32,
        v: Vec<f32>,
        s: Vec<f32>,
    },
}

impl OptimizerState {
    /// Returns the name of the algorithm this state belongs to.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GradientDescent { .. } => "gradient_descent",
            Self::GradientDescentWithMomentum { .. } => "gradient_descent_with_momentum",
            Self::Adam { .. } => "adam",
        }
    }
}
