//! Name to constructor registries for everything a config can pick by `type`.

use std::collections::BTreeMap;

use machine_learning::{
    arch::{Model, Sequential, activations::ActFn, layers::Layer},
    optimization::{Adam, GradientDescent, GradientDescentWithMomentum, Optimizer},
    scheduling::LrPolicy,
};
use rand::rngs::StdRng;
use serde::{Deserialize, de::DeserializeOwned};
use serde_yaml::{Mapping, Value};

use crate::{
    DistillErr, Result,
    config::{Config, LossParams, OptimizerSpec},
    data::{self, Splits},
    loss::{self, DistillLoss},
};

/// The input and output widths a model has to be built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelShape {
    pub in_features: usize,
    pub num_classes: usize,
}

pub type ModelCtor = fn(&Value, ModelShape, &mut StdRng) -> Result<Box<dyn Model>>;
pub type OptimizerCtor = fn(&Value, usize) -> Result<Box<dyn Optimizer>>;
pub type SchedulerCtor = fn(&Value) -> Result<LrPolicy>;
pub type DatasetCtor = fn(&Value, u64) -> Result<Splits>;
pub type LossCtor = fn(&LossParams) -> Box<dyn DistillLoss>;

/// Maps names to constructors of one kind of component.
#[derive(Clone)]
pub struct Registry<C> {
    kind: &'static str,
    entries: BTreeMap<&'static str, C>,
}

impl<C: Copy> Registry<C> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: &'static str, ctor: C) -> Self {
        self.register(name, ctor);
        self
    }

    pub fn register(&mut self, name: &'static str, ctor: C) {
        self.entries.insert(name, ctor);
    }

    /// Looks up a constructor.
    ///
    /// # Returns
    /// A config error listing the known names if `name` isn't registered.
    pub fn get(&self, name: &str) -> Result<C> {
        self.entries.get(name).copied().ok_or_else(|| {
            DistillErr::Config(format!(
                "unknown {} `{name}`, expected one of: {}",
                self.kind,
                self.names().join(", ")
            ))
        })
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }
}

pub type ModelRegistry = Registry<ModelCtor>;
pub type OptimizerRegistry = Registry<OptimizerCtor>;
pub type LrSchedulerRegistry = Registry<SchedulerCtor>;
pub type DatasetRegistry = Registry<DatasetCtor>;
pub type LossRegistry = Registry<LossCtor>;

/// Every registry a run resolves names against.
#[derive(Clone)]
pub struct Registries {
    pub models: ModelRegistry,
    pub optimizers: OptimizerRegistry,
    pub schedulers: LrSchedulerRegistry,
    pub datasets: DatasetRegistry,
    pub losses: LossRegistry,
}

impl Default for Registries {
    fn default() -> Self {
        Self {
            models: Registry::new("model")
                .with("linear", linear as ModelCtor)
                .with("mlp", mlp),
            optimizers: Registry::new("optimizer")
                .with("sgd", sgd as OptimizerCtor)
                .with("adam", adam),
            schedulers: Registry::new("lr scheduler")
                .with("constant", constant as SchedulerCtor)
                .with("step", step)
                .with("cosine", cosine),
            datasets: Registry::new("dataset")
                .with("blobs", data::blobs as DatasetCtor)
                .with("csv", data::csv),
            losses: Registry::new("distillation loss")
                .with("vanilla", loss::vanilla as LossCtor)
                .with("soft_target", loss::soft_target)
                .with("hard_label", loss::hard_label),
        }
    }
}

impl Registries {
    /// Checks that every name the config refers to is registered.
    pub fn validate(&self, config: &Config) -> Result<()> {
        self.datasets.get(&config.dataset.kind)?;
        self.losses.get(&config.distillation.kind)?;
        self.models.get(&config.student_model.kind)?;
        self.check_optimizer(&config.student_optimizer)?;

        if let Some(teacher) = &config.teacher_model {
            self.models.get(&teacher.kind)?;
        }

        if let Some(optimizer) = &config.teacher_optimizer {
            self.check_optimizer(optimizer)?;
        }

        Ok(())
    }

    fn check_optimizer(&self, spec: &OptimizerSpec) -> Result<()> {
        self.optimizers.get(&spec.kind)?;
        if let Some(scheduler) = &spec.scheduler {
            self.schedulers.get(&scheduler.kind)?;
        }

        Ok(())
    }
}

/// Deserializes constructor arguments, a missing `args` behaves like an empty mapping.
pub fn parse_args<T: DeserializeOwned>(kind: &str, args: &Value) -> Result<T> {
    let args = match args {
        Value::Null => Value::Mapping(Mapping::new()),
        args => args.clone(),
    };

    serde_yaml::from_value(args).map_err(|e| DistillErr::Config(format!("{kind} args: {e}")))
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ActivationArg {
    Relu,
    Sigmoid,
    Tanh,
}

impl From<ActivationArg> for ActFn {
    fn from(arg: ActivationArg) -> Self {
        match arg {
            ActivationArg::Relu => ActFn::relu(),
            ActivationArg::Sigmoid => ActFn::sigmoid(1.),
            ActivationArg::Tanh => ActFn::tanh(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MlpArgs {
    #[serde(default = "default_hidden")]
    hidden: Vec<usize>,
    #[serde(default = "default_activation")]
    activation: ActivationArg,
}

fn default_hidden() -> Vec<usize> {
    vec![64]
}

fn default_activation() -> ActivationArg {
    ActivationArg::Relu
}

fn linear(_args: &Value, shape: ModelShape, rng: &mut StdRng) -> Result<Box<dyn Model>> {
    build(&[shape.in_features, shape.num_classes], None, rng)
}

fn mlp(args: &Value, shape: ModelShape, rng: &mut StdRng) -> Result<Box<dyn Model>> {
    let args: MlpArgs = parse_args("mlp", args)?;
    if args.hidden.contains(&0) {
        return Err(DistillErr::Config("mlp hidden sizes must be positive".into()));
    }

    let mut dims = vec![shape.in_features];
    dims.extend(&args.hidden);
    dims.push(shape.num_classes);

    build(&dims, Some(args.activation.into()), rng)
}

/// Builds dense layers between consecutive widths, with `act_fn` between every pair of them.
fn build(dims: &[usize], act_fn: Option<ActFn>, rng: &mut StdRng) -> Result<Box<dyn Model>> {
    let mut layers = Vec::new();

    for (i, pair) in dims.windows(2).enumerate() {
        if i > 0 {
            if let Some(act_fn) = &act_fn {
                layers.push(Layer::activation(act_fn.clone()));
            }
        }

        layers.push(Layer::dense((pair[0], pair[1])));
    }

    let mut model = Sequential::new(layers);
    model.init(rng)?;
    Ok(Box::new(model))
}

#[derive(Debug, Deserialize)]
struct SgdArgs {
    #[serde(default = "default_sgd_lr")]
    lr: f32,
    #[serde(default)]
    momentum: f32,
}

fn default_sgd_lr() -> f32 {
    0.01
}

#[derive(Debug, Deserialize)]
struct AdamArgs {
    #[serde(default = "default_adam_lr")]
    lr: f32,
    #[serde(default = "default_beta1")]
    beta1: f32,
    #[serde(default = "default_beta2")]
    beta2: f32,
    #[serde(default = "default_epsilon")]
    epsilon: f32,
}

fn default_adam_lr() -> f32 {
    0.001
}

fn default_beta1() -> f32 {
    0.9
}

fn default_beta2() -> f32 {
    0.999
}

fn default_epsilon() -> f32 {
    1e-8
}

fn check_lr(kind: &str, lr: f32) -> Result<()> {
    if !(lr.is_finite() && lr > 0.) {
        return Err(DistillErr::Config(format!(
            "{kind} learning rate must be positive, got {lr}"
        )));
    }

    Ok(())
}

fn sgd(args: &Value, len: usize) -> Result<Box<dyn Optimizer>> {
    let args: SgdArgs = parse_args("sgd", args)?;
    check_lr("sgd", args.lr)?;

    if !(0.0..1.0).contains(&args.momentum) {
        return Err(DistillErr::Config(format!(
            "sgd momentum must be in [0, 1), got {}",
            args.momentum
        )));
    }

    if args.momentum > 0. {
        Ok(Box::new(GradientDescentWithMomentum::new(len, args.lr, args.momentum)))
    } else {
        Ok(Box::new(GradientDescent::new(args.lr)))
    }
}

fn adam(args: &Value, len: usize) -> Result<Box<dyn Optimizer>> {
    let args: AdamArgs = parse_args("adam", args)?;
    check_lr("adam", args.lr)?;

    Ok(Box::new(Adam::new(
        len,
        args.lr,
        args.beta1,
        args.beta2,
        args.epsilon,
    )))
}

#[derive(Debug, Deserialize)]
struct StepArgs {
    step_size: usize,
    #[serde(default = "default_gamma")]
    gamma: f32,
}

fn default_gamma() -> f32 {
    0.1
}

#[derive(Debug, Deserialize)]
struct CosineArgs {
    t_max: usize,
    #[serde(default)]
    eta_min: f32,
}

fn constant(_args: &Value) -> Result<LrPolicy> {
    Ok(LrPolicy::Constant)
}

fn step(args: &Value) -> Result<LrPolicy> {
    let StepArgs { step_size, gamma } = parse_args("step", args)?;
    if step_size == 0 {
        return Err(DistillErr::Config("step_size must be at least 1".into()));
    }

    Ok(LrPolicy::Step { step_size, gamma })
}

fn cosine(args: &Value) -> Result<LrPolicy> {
    let CosineArgs { t_max, eta_min } = parse_args("cosine", args)?;
    if t_max == 0 {
        return Err(DistillErr::Config("t_max must be at least 1".into()));
    }

    Ok(LrPolicy::Cosine { t_max, eta_min })
}
