use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

/// How the learning rate evolves with the amount of completed epochs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LrPolicy {
    /// Keeps the base learning rate.
    Constant,
    /// Multiplies the learning rate by `gamma` every `step_size` epochs.
    Step { step_size: usize, gamma: f32 },
    /// Anneals from the base learning rate to `eta_min` following half a cosine over `t_max` epochs.
    Cosine { t_max: usize, eta_min: f32 },
}

/// The serializable position of a `LrScheduler`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LrSchedulerState {
    pub last_epoch: usize,
}

/// Computes the learning rate of each epoch in closed form from its position, so restoring the
/// position is enough to resume the schedule.
#[derive(Debug, Clone)]
pub struct LrScheduler {
    base_lr: f32,
    policy: LrPolicy,
    last_epoch: usize,
}

impl LrScheduler {
    /// Creates a new `LrScheduler` at epoch zero.
    ///
    /// # Arguments
    /// * `base_lr` - The learning rate of the first epoch.
    /// * `policy` - How the learning rate decays.
    pub fn new(base_lr: f32, policy: LrPolicy) -> Self {
        Self {
            base_lr,
            policy,
            last_epoch: 0,
        }
    }

    /// Marks one more epoch as completed.
    ///
    /// # Returns
    /// The learning rate for the next epoch.
    pub fn step(&mut self) -> f32 {
        self.last_epoch += 1;
        self.last_lr()
    }

    /// Returns the learning rate for the current position.
    pub fn last_lr(&self) -> f32 {
        let epoch = self.last_epoch;

        match self.policy {
            LrPolicy::Constant => self.base_lr,
            LrPolicy::Step { step_size, gamma } => {
                let decays = epoch / step_size.max(1);
                self.base_lr * gamma.powi(decays as i32)
            }
            LrPolicy::Cosine { t_max, eta_min } => {
                let t_max = t_max.max(1);
                let progress = epoch.min(t_max) as f32 / t_max as f32;
                eta_min + (self.base_lr - eta_min) * (1. + (PI * progress).cos()) / 2.
            }
        }
    }

    pub fn state(&self) -> LrSchedulerState {
        LrSchedulerState {
            last_epoch: self.last_epoch,
        }
    }

    pub fn load_state(&mut self, state: LrSchedulerState) {
        self.last_epoch = state.last_epoch;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_policy_decays_every_step_size_epochs() {
        let mut scheduler = LrScheduler::new(1.0, LrPolicy::Step { step_size: 2, gamma: 0.5 });
        let lrs: Vec<_> = (0..5).map(|_| scheduler.step()).collect();
        assert_eq!(lrs, vec![1.0, 0.5, 0.5, 0.25, 0.25]);
    }

    #[test]
    fn cosine_reaches_eta_min_and_stays() {
        let mut scheduler = LrScheduler::new(0.1, LrPolicy::Cosine { t_max: 4, eta_min: 0.01 });
        for _ in 0..4 {
            scheduler.step();
        }
        assert!((scheduler.last_lr() - 0.01).abs() < 1e-6);
        assert!((scheduler.step() - 0.01).abs() < 1e-6);
    }

    #[test]
    fn restoring_state_restores_learning_rate() {
        let mut a = LrScheduler::new(1.0, LrPolicy::Step { step_size: 1, gamma: 0.1 });
        a.step();
        a.step();

        let mut b = LrScheduler::new(1.0, LrPolicy::Step { step_size: 1, gamma: 0.1 });
        b.load_state(a.state());
        assert_eq!(a.last_lr(), b.last_lr());
    }
}
