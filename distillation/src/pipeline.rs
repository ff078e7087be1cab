//! Wiring a `Config` into a running distillation.

use std::fs;

use log::{info, warn};
use machine_learning::scheduling::LrPolicy;
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    Config, DistillErr, Distiller, Result, Role, TrainingSummary,
    checkpoint::CheckpointStore,
    config::{ModelSpec, OptimizerSpec},
    data::make_dataloaders,
    device::{Device, HostProbe},
    distiller::{DistillerSettings, Trainee},
    identity::RunIdentityManager,
    registry::{ModelShape, Registries},
    schedule::Schedule,
    tracking::{LocalTracker, RunLog},
};

/// Options that come from the command line rather than the config files.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub gpus: Vec<usize>,
    pub mixed: bool,
}

/// Makes sure the run directory exists, clearing a previous run with the same name first.
///
/// Resumed runs keep their directory. Otherwise an existing directory is only removed if
/// `force` is set or `confirm` accepts the experiment name.
///
/// # Returns
/// `false` if the user declined to overwrite the previous run.
pub fn prepare_run_dir<F>(config: &Config, force: bool, confirm: F) -> Result<bool>
where
    F: FnOnce(&str) -> bool,
{
    let run_dir = config.run_dir();

    if run_dir.exists() && !config.is_resume() {
        if !force && !confirm(&config.experiment) {
            return Ok(false);
        }

        info!("removing the previous run in {}", run_dir.display());
        fs::remove_dir_all(&run_dir)?;
    }

    fs::create_dir_all(CheckpointStore::new(&run_dir).dir())?;
    Ok(true)
}

/// Builds the models, optimizers, schedulers and data of a run, restoring the checkpoint the
/// config asks to resume from.
pub fn prepare(config: &Config, registries: &Registries) -> Result<Distiller> {
    registries.validate(config)?;

    let schedule = Schedule::new(config.schedule)?;
    let data = make_dataloaders(
        &config.dataset,
        config.batch_size,
        config.seed,
        &registries.datasets,
    )?;
    let shape = ModelShape {
        in_features: data.in_features,
        num_classes: data.num_classes,
    };

    let teacher = match (&config.teacher_model, &config.teacher_optimizer) {
        (Some(model), Some(optimizer)) => Some(build_trainee(
            Role::Teacher,
            model,
            optimizer,
            shape,
            config.seed,
            registries,
        )?),
        _ => None,
    };

    let student = build_trainee(
        Role::Student,
        &config.student_model,
        &config.student_optimizer,
        shape,
        config.seed.wrapping_add(1),
        registries,
    )?;

    let loss = registries.losses.get(&config.distillation.kind)?(&config.distillation);
    let store = CheckpointStore::new(config.run_dir());
    let resumed = if config.is_resume() {
        Some((store.path(config.resume), store.load(config.resume)?))
    } else {
        None
    };

    let mut distiller = Distiller::new(
        teacher,
        student,
        data,
        loss,
        schedule,
        store,
        DistillerSettings {
            seed: config.seed,
            save_interval: config.save_interval,
        },
    );

    if let Some((path, state)) = resumed {
        distiller
            .restore(state)
            .map_err(|e| DistillErr::CorruptState {
                path,
                reason: e.to_string(),
            })?;
    }

    Ok(distiller)
}

fn build_trainee(
    role: Role,
    model_spec: &ModelSpec,
    optimizer_spec: &OptimizerSpec,
    shape: ModelShape,
    seed: u64,
    registries: &Registries,
) -> Result<Trainee> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut model = registries.models.get(&model_spec.kind)?(&model_spec.args, shape, &mut rng)?;

    if let Some(path) = &model_spec.weights {
        let exported = CheckpointStore::load_exported(path)?;
        model
            .load_params(&exported.weights)
            .map_err(|e| DistillErr::CorruptState {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        info!("loaded the {role} weights from {}", path.display());
    }

    let optimizer =
        registries.optimizers.get(&optimizer_spec.kind)?(&optimizer_spec.args, model.size())?;
    let policy = match &optimizer_spec.scheduler {
        Some(scheduler) => registries.schedulers.get(&scheduler.kind)?(&scheduler.args)?,
        None => LrPolicy::Constant,
    };

    Ok(Trainee::new(model, optimizer, policy))
}

/// Runs a whole experiment: binds the run identity, trains and evaluates the final student.
///
/// The run directory must already exist, see `prepare_run_dir`.
pub fn run(config: &Config, options: &RunOptions) -> Result<TrainingSummary> {
    let registries = Registries::default();
    registries.validate(config)?;

    let device = Device::resolve(&options.gpus, &HostProbe);
    info!("resolved device {device}");
    if options.mixed {
        warn!("mixed precision is not supported, training in f32");
    }

    let run_dir = config.run_dir();
    let mut tracker = LocalTracker::new(&run_dir);
    let identity = RunIdentityManager::new(&run_dir).get_or_create(
        config.project(),
        &config.experiment,
        config.is_resume(),
        &mut tracker,
        config.snapshot(),
    )?;

    let distiller = prepare(config, &registries)?;

    if !distiller.schedule().trains_teacher() {
        info!("the teacher is frozen, only the student trains");
    }

    let run_log = RunLog::new(&run_dir);
    if let Some(teacher) = distiller.teacher() {
        run_log.line(&format!("teacher parameters: {}", teacher.model().size()))?;
    }
    run_log.line(&format!("student parameters: {}", distiller.student().model().size()))?;
    run_log.line(&format!(
        "student epochs: {:?}",
        distiller.schedule().student_epochs()
    ))?;

    let summary = distiller
        .with_tracker(Box::new(tracker))
        .with_run_log(run_log)
        .train()?;

    info!("run {} finished after {} epochs", identity.run_id, summary.epochs);
    Ok(summary)
}
