//! Run configuration.
//!
//! A run is described by two YAML files, one for the distillation itself and one for the
//! dataset. They are merged into a `ConfigDocument`, patched with `key=value` overrides from the
//! command line and finally resolved into a typed, immutable `Config`.

use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::{DistillErr, Result, schedule::Schedule};

/// An untyped configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument(Value);

impl ConfigDocument {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(yaml)?;
        if !value.is_mapping() {
            return Err(DistillErr::Config(
                "a config file must be a mapping at the top level".into(),
            ));
        }

        Ok(Self(value))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path).map_err(|e| {
            DistillErr::Config(format!("couldn't read {}: {e}", path.display()))
        })?;

        Self::from_yaml_str(&yaml)
    }

    /// Merges the distillation and dataset documents, top-level keys of `data` win.
    pub fn merge(kd: Self, data: Self) -> Self {
        let mut merged = match kd.0 {
            Value::Mapping(m) => m,
            _ => Mapping::new(),
        };

        if let Value::Mapping(data) = data.0 {
            merged.extend(data);
        }

        Self(Value::Mapping(merged))
    }

    /// Applies `dotted.key=value` overrides in order.
    ///
    /// Values are parsed as an integer, then a float, then a boolean, falling back to a string.
    pub fn apply_overrides<S: AsRef<str>>(&mut self, overrides: &[S]) -> Result<()> {
        for entry in overrides {
            let entry = entry.as_ref();
            let Some((key, raw)) = entry.split_once('=') else {
                return Err(DistillErr::Config(format!("invalid override `{entry}`, expected key=value")));
            };

            let keys: Vec<&str> = key.split('.').collect();
            let (last, parents) = keys
                .split_last()
                .ok_or_else(|| DistillErr::Config(format!("invalid override `{entry}`")))?;

            let mut current = &mut self.0;
            for parent in parents {
                current = current
                    .as_mapping_mut()
                    .and_then(|m| m.get_mut(*parent))
                    .filter(|v| v.is_mapping())
                    .ok_or_else(|| {
                        DistillErr::Config(format!("`{parent}` in `{key}` is not a mapping"))
                    })?;
            }

            let mapping = current
                .as_mapping_mut()
                .ok_or_else(|| DistillErr::Config(format!("can't set `{key}`")))?;
            mapping.insert(Value::String((*last).to_string()), parse_scalar(raw));
        }

        Ok(())
    }

    /// Replaces every `{dotted.path}` in `experiment` by the value it points to and prefixes the
    /// result with the dataset type.
    pub fn expand_experiment(&mut self) -> Result<()> {
        let template = self
            .lookup("experiment")
            .and_then(Value::as_str)
            .ok_or_else(|| DistillErr::Config("`experiment` must be a string".into()))?
            .to_string();

        let mut name = String::new();
        for (i, word) in template.split(['{', '}']).enumerate() {
            if i % 2 == 0 {
                name.push_str(word);
            } else {
                let value = self
                    .lookup(word)
                    .ok_or_else(|| DistillErr::Config(format!("unknown key `{word}` in experiment")))?;
                name.push_str(&scalar_to_string(word, value)?);
            }
        }

        let dataset = self
            .lookup("dataset.type")
            .and_then(Value::as_str)
            .ok_or_else(|| DistillErr::Config("`dataset.type` must be a string".into()))?;
        let name = format!("{dataset}-{name}");

        if let Some(m) = self.0.as_mapping_mut() {
            m.insert(Value::String("experiment".into()), Value::String(name));
        }

        Ok(())
    }

    /// Follows a dotted path through nested mappings.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.0, |value, key| value.as_mapping()?.get(key))
    }
}

fn parse_scalar(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }

    if let Ok(f) = raw.parse::<f64>() {
        return Value::from(f);
    }

    if let Ok(b) = raw.parse::<bool>() {
        return Value::Bool(b);
    }

    Value::String(raw.to_string())
}

fn scalar_to_string(key: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(DistillErr::Config(format!(
            "`{key}` can't be used in the experiment name, it's not a scalar"
        ))),
    }
}

/// A model entry: registry name, constructor arguments and optional pretrained weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub args: Value,
    /// A weights file exported by a previous run.
    #[serde(default)]
    pub weights: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub args: Value,
    #[serde(default)]
    pub scheduler: Option<SchedulerSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub args: Value,
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,
}

/// Which distillation loss to use and how.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LossParams {
    #[serde(rename = "type", default = "default_loss")]
    pub kind: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_distillation_weight")]
    pub distillation_weight: f32,
}

impl Default for LossParams {
    fn default() -> Self {
        Self {
            kind: default_loss(),
            temperature: default_temperature(),
            distillation_weight: default_distillation_weight(),
        }
    }
}

/// When each network trains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScheduleParams {
    /// The teacher trains every epoch, the student every `teacher_epochs / student_epochs`.
    Sequential {
        teacher_epochs: usize,
        student_epochs: usize,
    },
    /// Both networks train on the same batches once the student has started.
    CoTrain {
        epochs: usize,
        student_start: usize,
        #[serde(default = "default_student_step")]
        student_step: usize,
        #[serde(default)]
        freeze_teacher: bool,
    },
}

/// The resolved configuration of a run.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub experiment: String,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub project: Option<String>,
    /// The epoch of the checkpoint to resume from, zero starts a new run.
    #[serde(default)]
    pub resume: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    pub batch_size: NonZeroUsize,
    #[serde(default = "default_save_interval")]
    pub save_interval: NonZeroUsize,
    pub schedule: ScheduleParams,
    #[serde(default)]
    pub distillation: LossParams,
    #[serde(default)]
    pub teacher_model: Option<ModelSpec>,
    pub student_model: ModelSpec,
    #[serde(default)]
    pub teacher_optimizer: Option<OptimizerSpec>,
    pub student_optimizer: OptimizerSpec,
    pub dataset: DatasetSpec,
    #[serde(skip)]
    document: Value,
}

impl Config {
    /// Resolves a document into a typed `Config`, checking every value that doesn't depend on
    /// the registries.
    pub fn from_document(doc: ConfigDocument) -> Result<Self> {
        let mut config: Config = serde_yaml::from_value(doc.0.clone())
            .map_err(|e| DistillErr::Config(e.to_string()))?;
        config.document = doc.0;
        config.validate()?;
        Ok(config)
    }

    /// Returns the directory holding everything this run writes.
    pub fn run_dir(&self) -> PathBuf {
        self.output_dir.join(&self.experiment)
    }

    /// Returns the tracking project, the dataset type unless set explicitly.
    pub fn project(&self) -> &str {
        self.project.as_deref().unwrap_or(&self.dataset.kind)
    }

    pub fn is_resume(&self) -> bool {
        self.resume > 0
    }

    /// Returns the document this config was resolved from.
    pub fn snapshot(&self) -> &Value {
        &self.document
    }

    fn validate(&self) -> Result<()> {
        if self.experiment.is_empty() {
            return Err(DistillErr::Config("`experiment` can't be empty".into()));
        }

        let LossParams {
            temperature,
            distillation_weight,
            ..
        } = self.distillation;

        if !(temperature.is_finite() && temperature > 0.) {
            return Err(DistillErr::Config(format!(
                "temperature must be positive, got {temperature}"
            )));
        }

        if !(0.0..=1.0).contains(&distillation_weight) {
            return Err(DistillErr::Config(format!(
                "distillation_weight must be in [0, 1], got {distillation_weight}"
            )));
        }

        if self.teacher_model.is_some() && self.teacher_optimizer.is_none() {
            return Err(DistillErr::Config(
                "a teacher_model needs a teacher_optimizer".into(),
            ));
        }

        Schedule::new(self.schedule)?;
        Ok(())
    }
}

fn default_shuffle() -> bool {
    true
}

fn default_loss() -> String {
    "vanilla".into()
}

fn default_temperature() -> f32 {
    20.
}

fn default_distillation_weight() -> f32 {
    0.5
}

fn default_student_step() -> usize {
    1
}

fn default_seed() -> u64 {
    42
}

fn default_save_interval() -> NonZeroUsize {
    NonZeroUsize::MIN
}
