use std::{fs, path::Path};

use distillation::{
    Config, ConfigDocument,
    checkpoint::CheckpointStore,
    identity::{CONFIG_FILE, RUN_ID_FILE},
    pipeline::{self, RunOptions},
    tracking::{LocalTracker, Record, RUN_LOG_FILE},
};

const KD: &str = r#"
experiment: "kd-{schedule.mode}-{student_model.type}"
output_dir: unused
seed: 11
batch_size: 16
save_interval: 2
schedule:
  mode: sequential
  teacher_epochs: 4
  student_epochs: 2
distillation:
  type: vanilla
  temperature: 4.0
  distillation_weight: 0.7
teacher_model:
  type: mlp
  args:
    hidden: [16]
    activation: relu
student_model:
  type: linear
teacher_optimizer:
  type: adam
  args:
    lr: 0.01
student_optimizer:
  type: sgd
  args:
    lr: 0.1
    momentum: 0.9
  scheduler:
    type: step
    args:
      step_size: 2
      gamma: 0.5
"#;

const DATA: &str = r#"
dataset:
  type: blobs
  args:
    classes: 3
    features: 2
    train_per_class: 40
    test_per_class: 10
"#;

fn config(output_dir: &Path, overrides: &[&str]) -> Config {
    let mut doc = ConfigDocument::merge(
        ConfigDocument::from_yaml_str(KD).unwrap(),
        ConfigDocument::from_yaml_str(DATA).unwrap(),
    );
    let output = format!("output_dir={}", output_dir.display());
    doc.apply_overrides(&[output.as_str()]).unwrap();
    doc.apply_overrides(overrides).unwrap();
    doc.expand_experiment().unwrap();
    Config::from_document(doc).unwrap()
}

#[test]
fn sequential_run_trains_saves_and_exports() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &[]);
    assert_eq!(config.experiment, "blobs-kd-sequential-linear");

    assert!(pipeline::prepare_run_dir(&config, false, |_| false).unwrap());
    let summary = pipeline::run(&config, &RunOptions::default()).unwrap();

    assert_eq!(summary.epochs, 4);
    assert!((0.0..=1.0).contains(&summary.final_student_accuracy));
    assert!([2, 4].contains(&summary.student_best_epoch));
    assert!((1..=4).contains(&summary.teacher_best_epoch));

    let run_dir = config.run_dir();
    let store = CheckpointStore::new(&run_dir);
    for epoch in [1, 3] {
        assert!(!store.path(epoch).exists(), "epoch {epoch}");
    }

    let second = store.load(2).unwrap();
    assert_eq!(second.student.best.epoch, 2);
    assert!(second.student.best.accuracy.is_some());
    assert_eq!(store.load_latest().unwrap(), store.load(4).unwrap());

    for file in ["teacher.json", "student.json", RUN_ID_FILE, CONFIG_FILE, RUN_LOG_FILE] {
        assert!(run_dir.join(file).exists(), "{file}");
    }
}

#[test]
fn student_metrics_are_logged_on_student_epochs_only() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &[]);
    pipeline::prepare_run_dir(&config, false, |_| false).unwrap();
    pipeline::run(&config, &RunOptions::default()).unwrap();

    let records = LocalTracker::new(config.run_dir()).records().unwrap();
    let steps_with = |key: &str| -> Vec<usize> {
        records
            .iter()
            .filter_map(|record| match record {
                Record::Metrics { step, metrics, .. } if metrics.contains_key(key) => Some(*step),
                _ => None,
            })
            .collect()
    };

    assert_eq!(steps_with("teacher_test_acc"), vec![1, 2, 3, 4]);
    assert_eq!(steps_with("student_test_acc"), vec![2, 4]);
    assert!(matches!(records.last(), Some(Record::Finish { .. })));

    let log = fs::read_to_string(config.run_dir().join(RUN_LOG_FILE)).unwrap();
    assert!(log.contains("student parameters: 9"));
    assert!(log.contains("student epochs: [2, 4]"));
}

#[test]
fn co_train_run_completes() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(
        dir.path(),
        &[
            "schedule.mode=co_train",
            "schedule.epochs=3",
            "schedule.student_start=2",
            "distillation.type=soft_target",
        ],
    );

    // the leftover sequential keys are ignored by the co_train variant
    pipeline::prepare_run_dir(&config, false, |_| false).unwrap();
    let summary = pipeline::run(&config, &RunOptions::default()).unwrap();

    assert_eq!(summary.epochs, 3);
    assert!([2, 3].contains(&summary.student_best_epoch));
    assert!(CheckpointStore::new(config.run_dir()).path(2).exists());
}

#[test]
fn declining_the_overwrite_keeps_the_previous_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &[]);
    pipeline::prepare_run_dir(&config, false, |_| false).unwrap();
    pipeline::run(&config, &RunOptions::default()).unwrap();

    let run_id = fs::read_to_string(config.run_dir().join(RUN_ID_FILE)).unwrap();
    assert!(!pipeline::prepare_run_dir(&config, false, |_| false).unwrap());
    assert_eq!(
        fs::read_to_string(config.run_dir().join(RUN_ID_FILE)).unwrap(),
        run_id
    );
}
