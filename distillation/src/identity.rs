use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use log::{info, warn};
use serde_yaml::Value;

use crate::{DistillErr, Result, tracking::Tracker};

pub const RUN_ID_FILE: &str = "run_id.txt";
pub const CONFIG_FILE: &str = "config.yaml";

/// The stable identity of an experiment across interruptions.
#[derive(Debug, Clone, PartialEq)]
pub struct RunIdentity {
    pub run_id: String,
    pub config_snapshot: Value,
}

/// Binds a run directory to a single tracking run.
pub struct RunIdentityManager {
    run_dir: PathBuf,
}

impl RunIdentityManager {
    pub fn new<P: Into<PathBuf>>(run_dir: P) -> Self {
        Self {
            run_dir: run_dir.into(),
        }
    }

    pub fn run_id_path(&self) -> PathBuf {
        self.run_dir.join(RUN_ID_FILE)
    }

    pub fn config_path(&self) -> PathBuf {
        self.run_dir.join(CONFIG_FILE)
    }

    /// Creates the identity of a new run, or reads back the one of the run being resumed.
    ///
    /// A fresh run gets a new tracking run whose id is persisted before anything is logged. A
    /// resumed run reattaches the tracker to the persisted id. The config snapshot is written
    /// once, a resume never replaces it.
    ///
    /// # Arguments
    /// * `project` - The tracking project.
    /// * `experiment` - The experiment name, used as the run name.
    /// * `resume` - Whether an existing run is being continued.
    /// * `tracker` - The tracking service.
    /// * `config` - The resolved config of this invocation.
    ///
    /// # Returns
    /// `DistillErr::CorruptState` when resuming and the run id file is missing or invalid.
    pub fn get_or_create(
        &self,
        project: &str,
        experiment: &str,
        resume: bool,
        tracker: &mut dyn Tracker,
        config: &Value,
    ) -> Result<RunIdentity> {
        fs::create_dir_all(&self.run_dir)?;

        let run_id = if resume {
            let run_id = self.read_run_id()?;
            tracker.resume_run(&run_id)?;
            run_id
        } else {
            let run_id = tracker.create_run(project, experiment)?;
            fs::write(self.run_id_path(), &run_id)?;
            run_id
        };

        let config_snapshot = self.snapshot_config(config)?;
        info!("run {experiment} has id {run_id}");

        Ok(RunIdentity {
            run_id,
            config_snapshot,
        })
    }

    fn read_run_id(&self) -> Result<String> {
        let path = self.run_id_path();
        let corrupt = |reason: String| DistillErr::CorruptState {
            path: path.clone(),
            reason,
        };

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(corrupt("the run id file is missing".into()));
            }
            Err(e) => return Err(e.into()),
        };

        let run_id = content.trim();
        if run_id.is_empty() {
            return Err(corrupt("the run id file is empty".into()));
        }

        if !is_valid_run_id(run_id) {
            return Err(corrupt(format!("`{run_id}` is not a valid run id")));
        }

        Ok(run_id.to_string())
    }

    fn snapshot_config(&self, config: &Value) -> Result<Value> {
        let path = self.config_path();

        if path.exists() {
            let existing: Value = serde_yaml::from_str(&fs::read_to_string(&path)?)?;
            if !same_run_config(&existing, config) {
                warn!(
                    "the config differs from the one in {}, keeping the original",
                    path.display()
                );
            }

            return Ok(existing);
        }

        write_config(&path, config)?;
        Ok(config.clone())
    }
}

/// Compares two config snapshots ignoring `resume`, which changes between the first run and
/// every resumption of it.
fn same_run_config(a: &Value, b: &Value) -> bool {
    fn without_resume(config: &Value) -> Value {
        let mut config = config.clone();
        if let Value::Mapping(mapping) = &mut config {
            mapping.remove("resume");
        }
        config
    }

    without_resume(a) == without_resume(b)
}

fn write_config(path: &Path, config: &Value) -> Result<()> {
    fs::write(path, serde_yaml::to_string(config)?)?;
    Ok(())
}

fn is_valid_run_id(run_id: &str) -> bool {
    run_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::{LocalTracker, Record};

    fn config(seed: u64) -> Value {
        serde_yaml::from_str(&format!("experiment: blobs-vkd\nseed: {seed}")).unwrap()
    }

    #[test]
    fn fresh_run_persists_its_id_and_config() {
        let dir = tempfile::tempdir().unwrap();
        let manager = RunIdentityManager::new(dir.path());
        let mut tracker = LocalTracker::new(dir.path());

        let identity = manager
            .get_or_create("blobs", "blobs-vkd", false, &mut tracker, &config(1))
            .unwrap();

        let persisted = fs::read_to_string(manager.run_id_path()).unwrap();
        assert_eq!(persisted, identity.run_id);
        assert_eq!(tracker.active_run(), Some(identity.run_id.as_str()));
        assert!(manager.config_path().exists());
    }

    #[test]
    fn resume_key_is_ignored_when_comparing_snapshots() {
        let first: Value = serde_yaml::from_str("experiment: e\nresume: 0\nseed: 1").unwrap();
        let resumed: Value = serde_yaml::from_str("experiment: e\nresume: 2\nseed: 1").unwrap();
        let changed: Value = serde_yaml::from_str("experiment: e\nresume: 2\nseed: 3").unwrap();

        assert!(same_run_config(&first, &resumed));
        assert!(!same_run_config(&first, &changed));
    }

    #[test]
    fn resume_reuses_the_persisted_id() {
        let dir = tempfile::tempdir().unwrap();
        let manager = RunIdentityManager::new(dir.path());

        let first = manager
            .get_or_create("blobs", "e", false, &mut LocalTracker::new(dir.path()), &config(1))
            .unwrap();

        let mut tracker = LocalTracker::new(dir.path());
        let resumed = manager
            .get_or_create("blobs", "e", true, &mut tracker, &config(2))
            .unwrap();

        assert_eq!(resumed.run_id, first.run_id);
        assert_eq!(resumed.config_snapshot, config(1));

        let records = tracker.records().unwrap();
        assert_eq!(
            records.last(),
            Some(&Record::Resume {
                run_id: first.run_id
            })
        );
    }

    #[test]
    fn resume_without_identity_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let manager = RunIdentityManager::new(dir.path());
        let mut tracker = LocalTracker::new(dir.path());

        let err = manager
            .get_or_create("p", "e", true, &mut tracker, &config(1))
            .unwrap_err();
        assert!(matches!(err, DistillErr::CorruptState { .. }));
    }

    #[test]
    fn resume_with_invalid_identity_is_corrupt() {
        for content in ["", "  \n", "not a/valid id"] {
            let dir = tempfile::tempdir().unwrap();
            let manager = RunIdentityManager::new(dir.path());
            fs::write(manager.run_id_path(), content).unwrap();

            let err = manager
                .get_or_create("p", "e", true, &mut LocalTracker::new(dir.path()), &config(1))
                .unwrap_err();
            assert!(err.is_resume_state(), "{content:?}");
        }
    }
}
