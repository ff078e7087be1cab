//! Experiment tracking.
//!
//! `Tracker` is the seam to a tracking service. `LocalTracker` keeps everything under the run
//! directory as an append-only `metrics.jsonl`, and `RunLog` appends human readable lines to
//! `log.txt`.

use std::{
    collections::BTreeMap,
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DistillErr, Result};

pub const METRICS_FILE: &str = "metrics.jsonl";
pub const RUN_LOG_FILE: &str = "log.txt";

pub type Metrics = BTreeMap<String, f32>;

pub trait Tracker {
    /// Starts a new run and returns its id.
    fn create_run(&mut self, project: &str, name: &str) -> Result<String>;

    /// Continues logging into an existing run.
    fn resume_run(&mut self, run_id: &str) -> Result<()>;

    /// Records the metrics of a step.
    ///
    /// # Returns
    /// `DistillErr::NoActiveRun` if no run was created or resumed.
    fn log(&mut self, step: usize, metrics: &Metrics) -> Result<()>;

    fn finish(&mut self) -> Result<()>;
}

/// A line of `metrics.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Record {
    Start {
        run_id: String,
        project: String,
        name: String,
    },
    Resume {
        run_id: String,
    },
    Metrics {
        run_id: String,
        step: usize,
        metrics: Metrics,
    },
    Finish {
        run_id: String,
    },
}

/// A tracker writing to a local `metrics.jsonl`.
pub struct LocalTracker {
    path: PathBuf,
    active: Option<String>,
}

impl LocalTracker {
    pub fn new<P: AsRef<Path>>(run_dir: P) -> Self {
        Self {
            path: run_dir.as_ref().join(METRICS_FILE),
            active: None,
        }
    }

    pub fn active_run(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Reads every record written so far.
    pub fn records(&self) -> Result<Vec<Record>> {
        let content = std::fs::read_to_string(&self.path)?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(DistillErr::from))
            .collect()
    }

    fn append(&self, record: &Record) -> Result<()> {
        let mut file = append_to(&self.path)?;
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        file.write_all(&line)?;
        Ok(())
    }

    fn active_id(&self) -> Result<String> {
        self.active.clone().ok_or(DistillErr::NoActiveRun)
    }
}

impl Tracker for LocalTracker {
    fn create_run(&mut self, project: &str, name: &str) -> Result<String> {
        let run_id = Uuid::new_v4().simple().to_string();
        self.append(&Record::Start {
            run_id: run_id.clone(),
            project: project.to_string(),
            name: name.to_string(),
        })?;

        info!("created tracking run {run_id} in project {project}");
        self.active = Some(run_id.clone());
        Ok(run_id)
    }

    fn resume_run(&mut self, run_id: &str) -> Result<()> {
        self.append(&Record::Resume {
            run_id: run_id.to_string(),
        })?;

        info!("resumed tracking run {run_id}");
        self.active = Some(run_id.to_string());
        Ok(())
    }

    fn log(&mut self, step: usize, metrics: &Metrics) -> Result<()> {
        let run_id = self.active_id()?;
        self.append(&Record::Metrics {
            run_id,
            step,
            metrics: metrics.clone(),
        })
    }

    fn finish(&mut self) -> Result<()> {
        let run_id = self.active_id()?;
        self.append(&Record::Finish { run_id })?;
        self.active = None;
        Ok(())
    }
}

/// Appends human readable lines to the run's `log.txt`.
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new<P: AsRef<Path>>(run_dir: P) -> Self {
        Self {
            path: run_dir.as_ref().join(RUN_LOG_FILE),
        }
    }

    pub fn line(&self, line: &str) -> Result<()> {
        let mut file = append_to(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

fn append_to(path: &Path) -> Result<File> {
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(loss: f32) -> Metrics {
        Metrics::from([("student/loss".to_string(), loss)])
    }

    #[test]
    fn logging_without_a_run_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = LocalTracker::new(dir.path());

        assert!(matches!(
            tracker.log(1, &metrics(0.5)),
            Err(DistillErr::NoActiveRun)
        ));
    }

    #[test]
    fn records_are_appended_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = LocalTracker::new(dir.path());

        let run_id = tracker.create_run("blobs", "blobs-vkd").unwrap();
        tracker.log(1, &metrics(0.5)).unwrap();
        tracker.finish().unwrap();
        assert_eq!(tracker.active_run(), None);

        tracker.resume_run(&run_id).unwrap();
        tracker.log(2, &metrics(0.25)).unwrap();

        let records = tracker.records().unwrap();
        assert_eq!(records.len(), 5);
        assert!(matches!(&records[0], Record::Start { project, .. } if project == "blobs"));
        assert_eq!(
            records[4],
            Record::Metrics {
                run_id,
                step: 2,
                metrics: metrics(0.25)
            }
        );
    }

    #[test]
    fn run_ids_are_unique_and_plain() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = LocalTracker::new(dir.path());
        let a = tracker.create_run("p", "a").unwrap();
        let b = tracker.create_run("p", "b").unwrap();

        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn run_log_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path());
        log.line("first").unwrap();
        log.line("second").unwrap();

        let content = std::fs::read_to_string(dir.path().join(RUN_LOG_FILE)).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }
}
