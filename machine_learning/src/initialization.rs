use rand::Rng;
use rand_distr::Uniform;

use crate::{MlErr, Result};

/// Fills `weights` using Xavier uniform initialization, `U(-r, r)` with `r = sqrt(6 / (fan_in + fan_out))`.
///
/// # Arguments
/// * `rng` - A random number generator.
/// * `fan_in` - The number of input units in the weight tensor.
/// * `fan_out` - The number of output units in the weight tensor.
/// * `weights` - The buffer to fill.
///
/// # Returns
/// An error if the calculated range is invalid.
pub fn xavier_uniform<R: Rng>(
    rng: &mut R,
    fan_in: usize,
    fan_out: usize,
    weights: &mut [f32],
) -> Result<()> {
    let range = (6. / (fan_in + fan_out).max(1) as f32).sqrt();
    let distribution = Uniform::new(-range, range).map_err(|e| {
        MlErr::InvalidInput(format!("invalid xavier range for {fan_in}x{fan_out}: {e}"))
    })?;

    for w in weights.iter_mut() {
        *w = rng.sample(&distribution);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn xavier_stays_within_range_and_is_seeded() {
        let mut a = vec![0.; 64];
        let mut b = vec![0.; 64];
        xavier_uniform(&mut StdRng::seed_from_u64(3), 8, 8, &mut a).unwrap();
        xavier_uniform(&mut StdRng::seed_from_u64(3), 8, 8, &mut b).unwrap();

        let range = (6f32 / 16.).sqrt();
        assert!(a.iter().all(|w| w.abs() <= range));
        assert_eq!(a, b);
    }
}
