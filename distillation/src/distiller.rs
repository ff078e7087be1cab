//! The co-training scheduler.
//!
//! A `Distiller` owns both models, their optimizers and learning rate schedulers, and walks the
//! epochs of its `Schedule`. Each epoch runs the scheduled phases, evaluates whatever trained,
//! updates the best snapshots, logs metrics and saves a checkpoint every `save_interval` epochs.
//! Restoring a checkpoint puts every piece of that state back, so a resumed run continues
//! exactly as an uninterrupted one would.

use std::num::NonZeroUsize;

use log::{debug, info, warn};
use machine_learning::{
    MlErr,
    arch::{
        Mode, Model,
        loss::{CrossEntropy, LossFn},
    },
    dataloader::DataLoader,
    metrics,
    optimization::Optimizer,
    scheduling::{LrPolicy, LrScheduler},
};
use ndarray::{Array2, ArrayView2};

use crate::{
    DistillErr, Result, Role,
    best::BestSnapshot,
    checkpoint::{CheckpointStore, ModelState, TrainingState},
    data::DataBundle,
    evaluator,
    loss::DistillLoss,
    schedule::{Phase, Schedule},
    tracking::{Metrics, RunLog, Tracker},
};

/// A model together with everything that trains it.
pub struct Trainee {
    model: Box<dyn Model>,
    optimizer: Box<dyn Optimizer>,
    scheduler: LrScheduler,
    best: BestSnapshot,
    grad: Vec<f32>,
}

impl Trainee {
    /// Creates a new `Trainee`, its best snapshot starts as the model's current parameters.
    ///
    /// # Arguments
    /// * `model` - The model to train.
    /// * `optimizer` - Its optimizer, the current learning rate is the scheduler's base.
    /// * `policy` - How the learning rate changes across epochs.
    pub fn new(model: Box<dyn Model>, optimizer: Box<dyn Optimizer>, policy: LrPolicy) -> Self {
        let scheduler = LrScheduler::new(optimizer.learning_rate(), policy);
        let best = BestSnapshot::initial(model.params());
        let grad = vec![0.; model.size()];

        Self {
            model,
            optimizer,
            scheduler,
            best,
            grad,
        }
    }

    pub fn model(&self) -> &dyn Model {
        self.model.as_ref()
    }

    pub fn model_mut(&mut self) -> &mut dyn Model {
        self.model.as_mut()
    }

    pub fn best(&self) -> &BestSnapshot {
        &self.best
    }

    pub fn learning_rate(&self) -> f32 {
        self.optimizer.learning_rate()
    }

    pub fn state(&self) -> ModelState {
        ModelState {
            weights: self.model.params().to_vec(),
            optimizer: self.optimizer.state(),
            scheduler: self.scheduler.state(),
            best: self.best.clone(),
        }
    }

    /// Puts back a state taken with `state`.
    pub fn restore(&mut self, state: ModelState) -> Result<()> {
        if state.best.weights.len() != self.model.size() {
            return Err(MlErr::SizeMismatch {
                what: "best weights",
                got: state.best.weights.len(),
                expected: self.model.size(),
            }
            .into());
        }

        self.model.load_params(&state.weights)?;
        self.optimizer.load_state(state.optimizer)?;
        self.scheduler.load_state(state.scheduler);
        self.best = state.best;
        Ok(())
    }

    fn step(&mut self, d: Array2<f32>) -> Result<()> {
        self.model.backward(d, &mut self.grad)?;
        self.optimizer
            .update_params(self.model.params_mut(), &self.grad)?;
        Ok(())
    }

    fn end_epoch(&mut self) {
        let lr = self.scheduler.step();
        self.optimizer.set_learning_rate(lr);
    }

    fn load_best(&mut self) -> Result<()> {
        self.model.load_params(&self.best.weights)?;
        Ok(())
    }
}

/// What a model did during one epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassReport {
    /// Mean batch loss.
    pub loss: f32,
    pub train_accuracy: f32,
    pub test_accuracy: f32,
    /// The learning rate the pass trained with.
    pub learning_rate: f32,
    /// Whether this epoch became the model's best.
    pub promoted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpochReport {
    pub epoch: usize,
    pub teacher: Option<PassReport>,
    pub student: Option<PassReport>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    pub epochs: usize,
    pub teacher_best_accuracy: Option<f32>,
    pub teacher_best_epoch: usize,
    pub student_best_accuracy: Option<f32>,
    pub student_best_epoch: usize,
    /// The test accuracy of the student once its best weights are loaded.
    pub final_student_accuracy: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct DistillerSettings {
    /// Every epoch's shuffle is derived from it.
    pub seed: u64,
    pub save_interval: NonZeroUsize,
}

pub struct Distiller {
    teacher: Option<Trainee>,
    student: Trainee,
    data: DataBundle,
    loss: Box<dyn DistillLoss>,
    schedule: Schedule,
    store: CheckpointStore,
    settings: DistillerSettings,
    tracker: Option<Box<dyn Tracker>>,
    run_log: Option<RunLog>,
    epoch: usize,
}

impl Distiller {
    /// Creates a new `Distiller` that hasn't trained any epoch.
    ///
    /// A missing teacher is only a warning here, the phases that need it fail later with
    /// `DistillErr::MissingTeacher`.
    pub fn new(
        teacher: Option<Trainee>,
        student: Trainee,
        data: DataBundle,
        loss: Box<dyn DistillLoss>,
        schedule: Schedule,
        store: CheckpointStore,
        settings: DistillerSettings,
    ) -> Self {
        if teacher.is_none() {
            warn!("the distiller has no teacher");
        }

        Self {
            teacher,
            student,
            data,
            loss,
            schedule,
            store,
            settings,
            tracker: None,
            run_log: None,
            epoch: 0,
        }
    }

    pub fn with_tracker(mut self, tracker: Box<dyn Tracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn with_run_log(mut self, run_log: RunLog) -> Self {
        self.run_log = Some(run_log);
        self
    }

    /// Returns the last completed epoch.
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn teacher(&self) -> Option<&Trainee> {
        self.teacher.as_ref()
    }

    pub fn student(&self) -> &Trainee {
        &self.student
    }

    pub fn state(&self) -> TrainingState {
        TrainingState {
            epoch: self.epoch,
            teacher: self.teacher.as_ref().map(Trainee::state),
            student: self.student.state(),
        }
    }

    /// Continues from a saved state, the next epoch to run is `state.epoch + 1`.
    pub fn restore(&mut self, state: TrainingState) -> Result<()> {
        match (self.teacher.as_mut(), state.teacher) {
            (Some(teacher), Some(saved)) => teacher.restore(saved)?,
            (None, None) => {}
            (Some(_), None) => {
                return Err(DistillErr::Config(
                    "the checkpoint has no teacher but the run has one".into(),
                ));
            }
            (None, Some(_)) => {
                return Err(DistillErr::Config(
                    "the checkpoint has a teacher but the run has none".into(),
                ));
            }
        }

        self.student.restore(state.student)?;
        self.epoch = state.epoch;
        info!("restored the state after epoch {}", self.epoch);
        Ok(())
    }

    /// Runs every remaining epoch and then the terminal step: the best weights are loaded back
    /// into both models and exported.
    pub fn train(&mut self) -> Result<TrainingSummary> {
        let total = self.schedule.total_epochs();
        let start = self.epoch + 1;

        if start > total {
            info!("all {total} epochs are already done");
        }

        for epoch in start..=total {
            self.step_epoch(epoch)?;
        }

        self.complete()
    }

    /// Runs the phases of a single epoch.
    pub fn step_epoch(&mut self, epoch: usize) -> Result<EpochReport> {
        let seed = epoch_seed(self.settings.seed, epoch);
        let mut report = EpochReport {
            epoch,
            teacher: None,
            student: None,
        };

        for phase in self.schedule.phases(epoch) {
            debug!("epoch {epoch}: {phase:?}");

            match phase {
                Phase::TeacherOnly => {
                    let teacher = self.teacher.as_mut().ok_or(DistillErr::MissingTeacher)?;
                    let tally = teacher_pass(teacher, &self.data.train, seed, epoch)?;
                    report.teacher = Some(close_pass(teacher, &self.data.test, epoch, tally)?);
                }
                Phase::StudentOnly => {
                    let teacher = self.teacher.as_mut().ok_or(DistillErr::MissingTeacher)?;
                    let tally = student_pass(
                        &mut self.student,
                        teacher,
                        self.loss.as_ref(),
                        &self.data.train,
                        seed,
                        epoch,
                    )?;
                    report.student =
                        Some(close_pass(&mut self.student, &self.data.test, epoch, tally)?);
                }
                Phase::CoTrain => {
                    let teacher = self.teacher.as_mut().ok_or(DistillErr::MissingTeacher)?;
                    let (t, s) = co_train_pass(
                        teacher,
                        &mut self.student,
                        self.loss.as_ref(),
                        &self.data.train,
                        seed,
                        epoch,
                    )?;
                    report.teacher = Some(close_pass(teacher, &self.data.test, epoch, t)?);
                    report.student =
                        Some(close_pass(&mut self.student, &self.data.test, epoch, s)?);
                }
                Phase::Idle => {}
            }
        }

        self.epoch = epoch;
        self.record(&report)?;

        if epoch % self.settings.save_interval.get() == 0 {
            let path = self.store.save(&self.state())?;
            info!("epoch {epoch}: saved {}", path.display());
        }

        Ok(report)
    }

    fn record(&mut self, report: &EpochReport) -> Result<()> {
        let mut metrics = Metrics::new();
        let passes = [(Role::Teacher, report.teacher), (Role::Student, report.student)];

        for (role, pass) in passes {
            let Some(pass) = pass else {
                continue;
            };

            info!(
                "epoch {}: {role} loss {:.4}, train accuracy {:.4}, test accuracy {:.4}{}",
                report.epoch,
                pass.loss,
                pass.train_accuracy,
                pass.test_accuracy,
                if pass.promoted { " (best)" } else { "" }
            );

            metrics.insert(format!("{role}_train_loss"), pass.loss);
            metrics.insert(format!("{role}_train_acc"), pass.train_accuracy);
            metrics.insert(format!("{role}_test_acc"), pass.test_accuracy);
            metrics.insert(format!("{role}_lr"), pass.learning_rate);

            if let Some(run_log) = &self.run_log {
                run_log.line(&format!(
                    "{role} epoch: {}, loss: {}, accuracy: {}, test accuracy: {}",
                    report.epoch, pass.loss, pass.train_accuracy, pass.test_accuracy
                ))?;
            }
        }

        if metrics.is_empty() {
            return Ok(());
        }

        if let Some(tracker) = self.tracker.as_mut() {
            tracker.log(report.epoch, &metrics)?;
        }

        Ok(())
    }

    fn complete(&mut self) -> Result<TrainingSummary> {
        if let Some(teacher) = self.teacher.as_mut() {
            teacher.load_best()?;
            self.store.export(Role::Teacher, &teacher.best)?;
        }

        self.student.load_best()?;
        self.store.export(Role::Student, &self.student.best)?;

        let final_student_accuracy = evaluator::evaluate(self.student.model_mut(), &self.data.test)?;
        info!("final student test accuracy {final_student_accuracy:.4}");

        if let Some(run_log) = &self.run_log {
            run_log.line(&format!("final student test accuracy: {final_student_accuracy}"))?;
        }

        if let Some(tracker) = self.tracker.as_mut() {
            let metrics = Metrics::from([("final_student_test_acc".to_string(), final_student_accuracy)]);
            tracker.log(self.epoch, &metrics)?;
            tracker.finish()?;
        }

        let teacher_best = self.teacher.as_ref().map(|t| &t.best);
        Ok(TrainingSummary {
            epochs: self.epoch,
            teacher_best_accuracy: teacher_best.and_then(|b| b.accuracy),
            teacher_best_epoch: teacher_best.map_or(0, |b| b.epoch),
            student_best_accuracy: self.student.best.accuracy,
            student_best_epoch: self.student.best.epoch,
            final_student_accuracy,
        })
    }
}

/// Derives the shuffle seed of an epoch so it doesn't depend on how many epochs ran before in
/// this process.
pub fn epoch_seed(seed: u64, epoch: usize) -> u64 {
    seed.wrapping_add((epoch as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Running totals of a training pass.
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    loss: f32,
    batches: usize,
    correct: usize,
    seen: usize,
}

impl Tally {
    fn add(&mut self, loss: f32, logits: ArrayView2<f32>, labels: &[usize]) {
        self.loss += loss;
        self.batches += 1;
        self.correct += metrics::count_correct(logits, labels);
        self.seen += labels.len();
    }

    fn mean_loss(&self) -> f32 {
        self.loss / self.batches.max(1) as f32
    }

    fn accuracy(&self) -> f32 {
        self.correct as f32 / self.seen.max(1) as f32
    }
}

fn check_finite(role: Role, epoch: usize, loss: f32) -> Result<f32> {
    if loss.is_finite() {
        return Ok(loss);
    }

    Err(DistillErr::NumericInstability { role, epoch, loss })
}

/// One pass of the teacher over the hard labels.
fn teacher_pass(teacher: &mut Trainee, data: &DataLoader, seed: u64, epoch: usize) -> Result<Tally> {
    let ce = CrossEntropy::new();
    let mut tally = Tally::default();
    teacher.model.set_mode(Mode::Train);

    for batch in data.batches(seed) {
        let logits = teacher.model.forward(batch.x.view())?;
        let loss = check_finite(Role::Teacher, epoch, ce.loss(logits.view(), &batch.labels)?)?;
        tally.add(loss, logits.view(), &batch.labels);
        teacher.step(ce.loss_prime(logits.view(), &batch.labels)?)?;
    }

    Ok(tally)
}

/// One pass of the student against a frozen teacher.
fn student_pass(
    student: &mut Trainee,
    teacher: &mut Trainee,
    loss_fn: &dyn DistillLoss,
    data: &DataLoader,
    seed: u64,
    epoch: usize,
) -> Result<Tally> {
    let mut tally = Tally::default();
    teacher.model.set_mode(Mode::Eval);
    student.model.set_mode(Mode::Train);

    for batch in data.batches(seed) {
        let soft_targets = teacher.model.forward(batch.x.view())?;
        let logits = student.model.forward(batch.x.view())?;
        let out = loss_fn.compute(logits.view(), soft_targets.view(), &batch.labels)?;
        let loss = check_finite(Role::Student, epoch, out.loss)?;
        tally.add(loss, logits.view(), &batch.labels);
        student.step(out.grad)?;
    }

    Ok(tally)
}

/// One pass where, on every batch, the teacher takes its step and the student then learns from
/// the logits the teacher produced for that batch.
fn co_train_pass(
    teacher: &mut Trainee,
    student: &mut Trainee,
    loss_fn: &dyn DistillLoss,
    data: &DataLoader,
    seed: u64,
    epoch: usize,
) -> Result<(Tally, Tally)> {
    let ce = CrossEntropy::new();
    let mut teacher_tally = Tally::default();
    let mut student_tally = Tally::default();
    teacher.model.set_mode(Mode::Train);
    student.model.set_mode(Mode::Train);

    for batch in data.batches(seed) {
        let soft_targets = teacher.model.forward(batch.x.view())?;
        let loss = check_finite(
            Role::Teacher,
            epoch,
            ce.loss(soft_targets.view(), &batch.labels)?,
        )?;
        teacher_tally.add(loss, soft_targets.view(), &batch.labels);
        teacher.step(ce.loss_prime(soft_targets.view(), &batch.labels)?)?;

        let logits = student.model.forward(batch.x.view())?;
        let out = loss_fn.compute(logits.view(), soft_targets.view(), &batch.labels)?;
        let loss = check_finite(Role::Student, epoch, out.loss)?;
        student_tally.add(loss, logits.view(), &batch.labels);
        student.step(out.grad)?;
    }

    Ok((teacher_tally, student_tally))
}

/// Steps the learning rate, evaluates and updates the best snapshot after a pass.
fn close_pass(
    trainee: &mut Trainee,
    test: &DataLoader,
    epoch: usize,
    tally: Tally,
) -> Result<PassReport> {
    let learning_rate = trainee.learning_rate();
    trainee.end_epoch();
    let test_accuracy = evaluator::evaluate(trainee.model.as_mut(), test)?;
    let promoted = trainee
        .best
        .observe(epoch, test_accuracy, trainee.model.params());

    Ok(PassReport {
        loss: tally.mean_loss(),
        train_accuracy: tally.accuracy(),
        test_accuracy,
        learning_rate,
        promoted,
    })
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};
    use serde_yaml::Value;

    use super::*;
    use crate::{
        config::{DatasetSpec, ScheduleParams},
        data::make_dataloaders,
        loss::{LossOutput, VanillaKd},
        registry::{ModelShape, Registries},
        tracking::{LocalTracker, Record},
    };

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    fn bundle() -> DataBundle {
        let spec = DatasetSpec {
            kind: "blobs".into(),
            args: yaml("{train_per_class: 20, test_per_class: 5}"),
            shuffle: true,
        };
        make_dataloaders(&spec, NonZeroUsize::new(8).unwrap(), 3, &Registries::default().datasets)
            .unwrap()
    }

    fn trainee(kind: &str, seed: u64) -> Trainee {
        let registries = Registries::default();
        let shape = ModelShape {
            in_features: 2,
            num_classes: 3,
        };
        let model = registries.models.get(kind).unwrap()(
            &yaml("{hidden: [8]}"),
            shape,
            &mut StdRng::seed_from_u64(seed),
        )
        .unwrap();
        let optimizer = registries.optimizers.get("sgd").unwrap()(
            &yaml("{lr: 0.1, momentum: 0.5}"),
            model.size(),
        )
        .unwrap();

        Trainee::new(model, optimizer, LrPolicy::Step { step_size: 2, gamma: 0.5 })
    }

    fn distiller(dir: &std::path::Path, params: ScheduleParams, teacher: bool) -> Distiller {
        Distiller::new(
            teacher.then(|| trainee("mlp", 1)),
            trainee("linear", 2),
            bundle(),
            Box::new(VanillaKd::new(4., 0.5)),
            Schedule::new(params).unwrap(),
            CheckpointStore::new(dir),
            DistillerSettings {
                seed: 5,
                save_interval: NonZeroUsize::new(2).unwrap(),
            },
        )
    }

    const SEQUENTIAL: ScheduleParams = ScheduleParams::Sequential {
        teacher_epochs: 4,
        student_epochs: 2,
    };

    #[test]
    fn sequential_epochs_follow_the_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let mut d = distiller(dir.path(), SEQUENTIAL, true);

        let first = d.step_epoch(1).unwrap();
        assert!(first.teacher.is_some() && first.student.is_none());
        assert!(!dir.path().join("checkpoints/epoch_1.json").exists());

        let second = d.step_epoch(2).unwrap();
        assert!(second.teacher.is_some() && second.student.is_some());
        assert!(dir.path().join("checkpoints/epoch_2.json").exists());
        assert_eq!(d.epoch(), 2);
    }

    #[test]
    fn accuracies_are_fractions() {
        let dir = tempfile::tempdir().unwrap();
        let mut d = distiller(dir.path(), SEQUENTIAL, true);
        let report = d.step_epoch(2).unwrap();

        for pass in [report.teacher.unwrap(), report.student.unwrap()] {
            assert!((0.0..=1.0).contains(&pass.train_accuracy));
            assert!((0.0..=1.0).contains(&pass.test_accuracy));
            assert!(pass.promoted);
        }
    }

    #[test]
    fn learning_rate_follows_the_scheduler() {
        let dir = tempfile::tempdir().unwrap();
        let mut d = distiller(dir.path(), SEQUENTIAL, true);

        d.step_epoch(1).unwrap();
        assert_eq!(d.teacher().unwrap().learning_rate(), 0.1);
        d.step_epoch(2).unwrap();
        assert_eq!(d.teacher().unwrap().learning_rate(), 0.05);
        assert_eq!(d.student().learning_rate(), 0.1);
    }

    #[test]
    fn logged_learning_rate_is_the_one_the_epoch_trained_with() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = LocalTracker::new(dir.path());
        tracker.create_run("blobs", "blobs-lr").unwrap();
        let mut d = distiller(dir.path(), SEQUENTIAL, true).with_tracker(Box::new(tracker));

        d.step_epoch(1).unwrap();
        let used = d.teacher().unwrap().learning_rate();
        let report = d.step_epoch(2).unwrap();
        assert_eq!(report.teacher.unwrap().learning_rate, used);
        assert_eq!(report.student.unwrap().learning_rate, 0.1);

        let logged: Vec<_> = LocalTracker::new(dir.path())
            .records()
            .unwrap()
            .into_iter()
            .filter_map(|record| match record {
                Record::Metrics { step, metrics, .. } => Some((step, metrics["teacher_lr"])),
                _ => None,
            })
            .collect();
        assert_eq!(logged, [(1, 0.1), (2, 0.1)]);
    }

    #[test]
    fn teacher_phases_without_a_teacher_fail() {
        let dir = tempfile::tempdir().unwrap();
        let mut d = distiller(dir.path(), SEQUENTIAL, false);

        assert!(matches!(d.step_epoch(1), Err(DistillErr::MissingTeacher)));
    }

    #[test]
    fn co_train_trains_both_on_scheduled_epochs() {
        let dir = tempfile::tempdir().unwrap();
        let params = ScheduleParams::CoTrain {
            epochs: 3,
            student_start: 2,
            student_step: 1,
            freeze_teacher: false,
        };
        let mut d = distiller(dir.path(), params, true);

        assert!(d.step_epoch(1).unwrap().student.is_none());
        let report = d.step_epoch(2).unwrap();
        assert!(report.teacher.is_some() && report.student.is_some());
    }

    #[test]
    fn frozen_teacher_is_never_updated() {
        let dir = tempfile::tempdir().unwrap();
        let params = ScheduleParams::CoTrain {
            epochs: 2,
            student_start: 1,
            student_step: 1,
            freeze_teacher: true,
        };
        let mut d = distiller(dir.path(), params, true);
        let before = d.teacher().unwrap().model().params().to_vec();
        let student_before = d.student().model().params().to_vec();

        let report = d.step_epoch(1).unwrap();
        assert!(report.teacher.is_none() && report.student.is_some());
        assert_eq!(d.teacher().unwrap().model().params(), &before[..]);
        assert_ne!(d.student().model().params(), &student_before[..]);
    }

    struct Exploding;

    impl DistillLoss for Exploding {
        fn compute(
            &self,
            student: ArrayView2<f32>,
            _teacher: ArrayView2<f32>,
            _labels: &[usize],
        ) -> Result<LossOutput> {
            Ok(LossOutput {
                loss: f32::INFINITY,
                grad: Array2::zeros(student.dim()),
            })
        }
    }

    #[test]
    fn non_finite_loss_aborts_the_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let mut d = distiller(dir.path(), SEQUENTIAL, true);
        d.loss = Box::new(Exploding);

        d.step_epoch(1).unwrap();
        let err = d.step_epoch(2).unwrap_err();
        assert!(matches!(
            err,
            DistillErr::NumericInstability {
                role: Role::Student,
                epoch: 2,
                ..
            }
        ));
    }

    #[test]
    fn restore_puts_back_the_whole_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut trained = distiller(dir.path(), SEQUENTIAL, true);
        trained.step_epoch(1).unwrap();
        trained.step_epoch(2).unwrap();
        let state = trained.state();

        let mut fresh = distiller(dir.path(), SEQUENTIAL, true);
        fresh.restore(state.clone()).unwrap();
        assert_eq!(fresh.state(), state);
        assert_eq!(fresh.epoch(), 2);
    }

    #[test]
    fn restore_rejects_a_missing_teacher_state() {
        let dir = tempfile::tempdir().unwrap();
        let without = distiller(dir.path(), SEQUENTIAL, false).state();

        let mut with = distiller(dir.path(), SEQUENTIAL, true);
        assert!(with.restore(without).is_err());
    }

    #[test]
    fn train_loads_and_exports_the_best_weights() {
        let dir = tempfile::tempdir().unwrap();
        let mut d = distiller(dir.path(), SEQUENTIAL, true);
        let summary = d.train().unwrap();

        assert_eq!(summary.epochs, 4);
        assert!(summary.student_best_accuracy.is_some());
        assert!([2, 4].contains(&summary.student_best_epoch));
        assert!((0.0..=1.0).contains(&summary.final_student_accuracy));
        assert_eq!(Some(summary.final_student_accuracy), summary.student_best_accuracy);

        let student = d.student();
        assert_eq!(student.model().params(), &student.best().weights[..]);
        assert!(dir.path().join("teacher.json").exists());
        assert!(dir.path().join("student.json").exists());
    }

    #[test]
    fn epoch_seeds_differ() {
        assert_ne!(epoch_seed(1, 1), epoch_seed(1, 2));
        assert_eq!(epoch_seed(1, 3), epoch_seed(1, 3));
    }
}
