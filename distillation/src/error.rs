use std::{fmt, io, path::PathBuf};

use machine_learning::MlErr;

use crate::Role;

/// The result type used in the entire distillation crate.
pub type Result<T> = std::result::Result<T, DistillErr>;

/// All errors that can occur while configuring, running or resuming a distillation run.
#[derive(Debug)]
pub enum DistillErr {
    /// Invalid configuration, caught before any training happens.
    Config(String),
    /// A checkpoint that was asked for doesn't exist.
    CheckpointNotFound { path: PathBuf },
    /// A checkpoint or run identity file exists but can't be used.
    CorruptState { path: PathBuf, reason: String },
    /// A batch produced a non-finite loss, the run is aborted.
    NumericInstability { role: Role, epoch: usize, loss: f32 },
    /// A phase needs the teacher but the run was built without one.
    MissingTeacher,
    /// The tracker was asked to log without an active run.
    NoActiveRun,
    Ml(MlErr),
    Io(io::Error),
    Json(serde_json::Error),
    Yaml(serde_yaml::Error),
    Csv(csv::Error),
}

impl DistillErr {
    /// Whether the error comes from the persisted state a resume depends on.
    pub fn is_resume_state(&self) -> bool {
        matches!(
            self,
            Self::CheckpointNotFound { .. } | Self::CorruptState { .. }
        )
    }
}

impl fmt::Display for DistillErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "invalid config: {msg}"),
            Self::CheckpointNotFound { path } => {
                write!(f, "checkpoint not found at {}", path.display())
            }
            Self::CorruptState { path, reason } => {
                write!(f, "corrupt state in {}: {reason}", path.display())
            }
            Self::NumericInstability { role, epoch, loss } => {
                write!(f, "{role} loss became {loss} at epoch {epoch}")
            }
            Self::MissingTeacher => write!(f, "this phase needs a teacher but none was built"),
            Self::NoActiveRun => write!(f, "the tracker has no active run"),
            Self::Ml(e) => write!(f, "machine learning error: {e}"),
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Json(e) => write!(f, "json error: {e}"),
            Self::Yaml(e) => write!(f, "yaml error: {e}"),
            Self::Csv(e) => write!(f, "csv error: {e}"),
        }
    }
}

impl std::error::Error for DistillErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Ml(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Yaml(e) => Some(e),
            Self::Csv(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MlErr> for DistillErr {
    fn from(e: MlErr) -> Self {
        Self::Ml(e)
    }
}

impl From<io::Error> for DistillErr {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for DistillErr {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<serde_yaml::Error> for DistillErr {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml(e)
    }
}

impl From<csv::Error> for DistillErr {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}
