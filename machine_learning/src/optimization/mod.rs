mod adam;
mod gradient_descent;
mod momentum;
mod optimizer;
mod state;

pub use adam::Adam;
pub use gradient_descent::GradientDescent;
pub use momentum::GradientDescentWithMomentum;
pub use optimizer::Optimizer;
pub use state::OptimizerState;

use crate::{MlErr, Result};

fn check_len(what: &'static str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(MlErr::SizeMismatch {
            what,
            got,
            expected,
        });
    }

    Ok(())
}
