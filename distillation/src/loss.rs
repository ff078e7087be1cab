//! Distillation losses: how the student learns from the teacher's logits and the labels.
//!
//! Every loss reduces over the batch with a mean and returns its gradient with respect to the
//! student logits, ready to be backpropagated through the student.

use machine_learning::{
    MlErr,
    arch::loss::{
        CrossEntropy, LossFn,
        softmax::{log_softmax, softmax},
    },
};
use ndarray::{Array2, ArrayView2};

use crate::{Result, config::LossParams};

/// The loss of a batch together with its gradient with respect to the student logits.
#[derive(Debug, Clone)]
pub struct LossOutput {
    pub loss: f32,
    pub grad: Array2<f32>,
}

/// A strategy combining the teacher's soft targets and the ground truth into a student loss.
pub trait DistillLoss: Send {
    /// Computes the loss of a batch.
    ///
    /// # Arguments
    /// * `student` - The student logits, one row per sample.
    /// * `teacher` - The teacher logits for the same samples.
    /// * `labels` - The ground truth class of each sample.
    ///
    /// # Returns
    /// The batch mean loss and its gradient, or a size mismatch if the shapes disagree.
    fn compute(
        &self,
        student: ArrayView2<f32>,
        teacher: ArrayView2<f32>,
        labels: &[usize],
    ) -> Result<LossOutput>;
}

/// `α·τ²·KL(softmax(T/τ) ‖ softmax(S/τ)) + (1 − α)·CE(S, y)`.
#[derive(Debug, Clone, Copy)]
pub struct VanillaKd {
    temperature: f32,
    alpha: f32,
}

impl VanillaKd {
    /// Creates a new `VanillaKd`.
    ///
    /// # Arguments
    /// * `temperature` - Softens both distributions, must be positive.
    /// * `alpha` - The weight of the distillation term, the hard label term gets `1 - alpha`.
    pub fn new(temperature: f32, alpha: f32) -> Self {
        Self { temperature, alpha }
    }
}

impl DistillLoss for VanillaKd {
    fn compute(
        &self,
        student: ArrayView2<f32>,
        teacher: ArrayView2<f32>,
        labels: &[usize],
    ) -> Result<LossOutput> {
        let soft = soft_target_term(student, teacher, self.temperature)?;
        let ce = CrossEntropy::new();
        let hard_loss = ce.loss(student, labels)?;
        let hard_grad = ce.loss_prime(student, labels)?;

        let a = self.alpha;
        Ok(LossOutput {
            loss: a * soft.loss + (1. - a) * hard_loss,
            grad: soft.grad * a + hard_grad * (1. - a),
        })
    }
}

/// The temperature scaled KL term on its own.
#[derive(Debug, Clone, Copy)]
pub struct SoftTarget {
    temperature: f32,
}

impl SoftTarget {
    pub fn new(temperature: f32) -> Self {
        Self { temperature }
    }
}

impl DistillLoss for SoftTarget {
    fn compute(
        &self,
        student: ArrayView2<f32>,
        teacher: ArrayView2<f32>,
        labels: &[usize],
    ) -> Result<LossOutput> {
        if labels.len() != student.nrows() {
            return Err(MlErr::SizeMismatch {
                what: "labels",
                got: labels.len(),
                expected: student.nrows(),
            }
            .into());
        }

        soft_target_term(student, teacher, self.temperature)
    }
}

/// Plain cross-entropy against the labels, the teacher is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct HardLabel;

impl DistillLoss for HardLabel {
    fn compute(
        &self,
        student: ArrayView2<f32>,
        _teacher: ArrayView2<f32>,
        labels: &[usize],
    ) -> Result<LossOutput> {
        let ce = CrossEntropy::new();
        Ok(LossOutput {
            loss: ce.loss(student, labels)?,
            grad: ce.loss_prime(student, labels)?,
        })
    }
}

pub fn vanilla(params: &LossParams) -> Box<dyn DistillLoss> {
    Box::new(VanillaKd::new(params.temperature, params.distillation_weight))
}

pub fn soft_target(params: &LossParams) -> Box<dyn DistillLoss> {
    Box::new(SoftTarget::new(params.temperature))
}

pub fn hard_label(_params: &LossParams) -> Box<dyn DistillLoss> {
    Box::new(HardLabel)
}

/// `τ²·KL(softmax(T/τ) ‖ softmax(S/τ))` averaged over the batch, its gradient is
/// `τ·(softmax(S/τ) − softmax(T/τ)) / n`.
fn soft_target_term(
    student: ArrayView2<f32>,
    teacher: ArrayView2<f32>,
    temperature: f32,
) -> Result<LossOutput> {
    if student.dim() != teacher.dim() {
        let (rows, cols) = student.dim();
        return Err(MlErr::SizeMismatch {
            what: "teacher logits",
            got: teacher.len(),
            expected: rows * cols,
        }
        .into());
    }

    let n = student.nrows().max(1) as f32;
    let t = temperature;

    let log_p_s = log_softmax(student, t);
    let log_p_t = log_softmax(teacher, t);
    let p_t = log_p_t.mapv(f32::exp);

    let kl = (&p_t * &(&log_p_t - &log_p_s)).sum() / n;
    let grad = (softmax(student, t) - &p_t) * (t / n);

    Ok(LossOutput {
        loss: kl * t * t,
        grad,
    })
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::DistillErr;

    fn close(a: &Array2<f32>, b: &Array2<f32>) -> bool {
        a.dim() == b.dim() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-6)
    }

    fn logits() -> (Array2<f32>, Array2<f32>, Vec<usize>) {
        let student = array![[2.0, 1.0, 0.5], [-0.3, 0.8, 0.1]];
        let teacher = array![[1.5, 1.2, 0.8], [0.2, 2.0, -1.0]];
        (student, teacher, vec![0, 2])
    }

    #[test]
    fn alpha_zero_is_plain_cross_entropy() {
        let (s, t, y) = logits();
        let kd = VanillaKd::new(4.0, 0.0).compute(s.view(), t.view(), &y).unwrap();
        let ce = HardLabel.compute(s.view(), t.view(), &y).unwrap();

        assert!((kd.loss - ce.loss).abs() < 1e-6);
        assert!(close(&kd.grad, &ce.grad));
    }

    #[test]
    fn alpha_one_is_the_scaled_kl_alone() {
        let (s, t, y) = logits();
        let kd = VanillaKd::new(4.0, 1.0).compute(s.view(), t.view(), &y).unwrap();
        let soft = SoftTarget::new(4.0).compute(s.view(), t.view(), &y).unwrap();

        assert!((kd.loss - soft.loss).abs() < 1e-6);
        assert!(close(&kd.grad, &soft.grad));
    }

    #[test]
    fn identical_logits_have_no_soft_loss() {
        let (s, _, y) = logits();
        let soft = SoftTarget::new(2.0).compute(s.view(), s.view(), &y).unwrap();

        assert!(soft.loss.abs() < 1e-6);
        assert!(soft.grad.iter().all(|g| g.abs() < 1e-6));
    }

    #[test]
    fn large_logits_stay_finite() {
        let s = array![[1e4, -1e4, 0.0]];
        let t = array![[-1e4, 1e4, 0.0]];
        let out = VanillaKd::new(20.0, 0.5).compute(s.view(), t.view(), &[1]).unwrap();

        assert!(out.loss.is_finite());
        assert!(out.grad.iter().all(|g| g.is_finite()));
    }

    #[test]
    fn vanilla_gradient_matches_finite_differences() {
        let (s, t, y) = logits();
        let kd = VanillaKd::new(3.0, 0.7);
        let analytical = kd.compute(s.view(), t.view(), &y).unwrap().grad;
        let eps = 1e-2;

        for ((i, j), g) in analytical.indexed_iter() {
            let mut plus = s.clone();
            plus[[i, j]] += eps;
            let mut minus = s.clone();
            minus[[i, j]] -= eps;

            let l_plus = kd.compute(plus.view(), t.view(), &y).unwrap().loss;
            let l_minus = kd.compute(minus.view(), t.view(), &y).unwrap().loss;
            let numerical = (l_plus - l_minus) / (2. * eps);

            assert!((numerical - g).abs() < 1e-2, "[{i}, {j}]: {numerical} vs {g}");
        }
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let (s, _, y) = logits();
        let t = array![[1.0, 2.0], [3.0, 4.0]];
        let err = VanillaKd::new(2.0, 0.5).compute(s.view(), t.view(), &y).unwrap_err();

        assert!(matches!(err, DistillErr::Ml(MlErr::SizeMismatch { .. })));
    }
}
