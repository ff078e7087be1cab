use std::{
    io::{self, BufRead},
    path::PathBuf,
};

use anyhow::Context;
use clap::Parser;
use log::info;

use distillation::{
    Config, ConfigDocument,
    pipeline::{self, RunOptions},
};

/// Trains a teacher and a student network with knowledge distillation.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// The distillation config.
    #[arg(long, default_value = "configs/kd/vkd.yaml")]
    config: PathBuf,

    /// The dataset config.
    #[arg(long, default_value = "configs/dataset/blobs.yaml")]
    data: PathBuf,

    /// Overrides a config value, e.g. `--set distillation.temperature=4.0`.
    #[arg(long, num_args = 1..)]
    set: Vec<String>,

    /// The gpus to use, comma separated.
    #[arg(long, value_delimiter = ',', default_value = "0")]
    gpus: Vec<usize>,

    /// Overwrites an existing experiment without asking.
    #[arg(long)]
    force: bool,

    /// Requests mixed precision training.
    #[arg(long)]
    mixed: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let kd = ConfigDocument::load(&args.config)?;
    let data = ConfigDocument::load(&args.data)?;
    let mut doc = ConfigDocument::merge(kd, data);
    doc.apply_overrides(args.set.as_slice())?;
    doc.expand_experiment()?;
    let config = Config::from_document(doc)?;

    if !pipeline::prepare_run_dir(&config, args.force, confirm_overwrite)? {
        info!("keeping the existing experiment {}", config.experiment);
        return Ok(());
    }

    let options = RunOptions {
        gpus: args.gpus,
        mixed: args.mixed,
    };

    let summary = pipeline::run(&config, &options)
        .with_context(|| format!("experiment {} failed", config.experiment))?;

    println!(
        "{}: best student accuracy {:.4} at epoch {}, final student accuracy {:.4}",
        config.experiment,
        summary.student_best_accuracy.unwrap_or_default(),
        summary.student_best_epoch,
        summary.final_student_accuracy
    );

    Ok(())
}

fn confirm_overwrite(experiment: &str) -> bool {
    println!("Experiment {experiment} already exists. Enter y to overwrite.");

    let mut choice = String::new();
    match io::stdin().lock().read_line(&mut choice) {
        Ok(_) => choice.trim() == "y",
        Err(_) => false,
    }
}
