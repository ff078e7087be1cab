//! Persistence of the training state.
//!
//! Layout under the run directory:
//! * `checkpoints/epoch_<N>.json` - the state after epoch `N`.
//! * `checkpoints/epoch_latest.json` - a copy of the newest `epoch_<N>.json`.
//! * `teacher.json`, `student.json` - the best weights exported when a run completes.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use log::debug;
use machine_learning::{optimization::OptimizerState, scheduling::LrSchedulerState};
use serde::{Deserialize, Serialize};

use crate::{DistillErr, Result, Role, best::BestSnapshot};

const CHECKPOINTS_DIR: &str = "checkpoints";
const LATEST: &str = "epoch_latest.json";

/// Everything needed to resume one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelState {
    pub weights: Vec<f32>,
    pub optimizer: OptimizerState,
    pub scheduler: LrSchedulerState,
    pub best: BestSnapshot,
}

/// The unit of persistence: the state of both models after `epoch` completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingState {
    pub epoch: usize,
    pub teacher: Option<ModelState>,
    pub student: ModelState,
}

/// Best weights exported when a run completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedWeights {
    pub role: Role,
    pub epoch: usize,
    pub accuracy: Option<f32>,
    pub weights: Vec<f32>,
}

pub struct CheckpointStore {
    run_dir: PathBuf,
}

impl CheckpointStore {
    pub fn new<P: Into<PathBuf>>(run_dir: P) -> Self {
        Self {
            run_dir: run_dir.into(),
        }
    }

    pub fn dir(&self) -> PathBuf {
        self.run_dir.join(CHECKPOINTS_DIR)
    }

    pub fn path(&self, epoch: usize) -> PathBuf {
        self.dir().join(format!("epoch_{epoch}.json"))
    }

    pub fn latest_path(&self) -> PathBuf {
        self.dir().join(LATEST)
    }

    pub fn export_path(&self, role: Role) -> PathBuf {
        self.run_dir.join(format!("{role}.json"))
    }

    /// Persists `state` as `epoch_<N>.json` and replaces `epoch_latest.json` with the same content.
    ///
    /// # Returns
    /// The path of the epoch file.
    pub fn save(&self, state: &TrainingState) -> Result<PathBuf> {
        fs::create_dir_all(self.dir())?;

        let bytes = serde_json::to_vec(state)?;
        let path = self.path(state.epoch);
        write_atomic(&path, &bytes)?;
        write_atomic(&self.latest_path(), &bytes)?;

        debug!("saved checkpoint {}", path.display());
        Ok(path)
    }

    /// Loads the state saved after `epoch`.
    pub fn load(&self, epoch: usize) -> Result<TrainingState> {
        read_json(&self.path(epoch))
    }

    pub fn load_latest(&self) -> Result<TrainingState> {
        read_json(&self.latest_path())
    }

    /// Writes the best weights of `role` next to the checkpoints directory.
    pub fn export(&self, role: Role, best: &BestSnapshot) -> Result<PathBuf> {
        fs::create_dir_all(&self.run_dir)?;

        let exported = ExportedWeights {
            role,
            epoch: best.epoch,
            accuracy: best.accuracy,
            weights: best.weights.clone(),
        };

        let path = self.export_path(role);
        write_atomic(&path, &serde_json::to_vec(&exported)?)?;
        Ok(path)
    }

    /// Reads weights written by `export`, possibly by another run.
    pub fn load_exported<P: AsRef<Path>>(path: P) -> Result<ExportedWeights> {
        read_json(path.as_ref())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(DistillErr::CheckpointNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    serde_json::from_slice(&bytes).map_err(|e| DistillErr::CorruptState {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
