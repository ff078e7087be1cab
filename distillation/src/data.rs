use std::{
    f32::consts::PI,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use machine_learning::{dataloader::DataLoader, dataset::Dataset};
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal};
use serde::Deserialize;
use serde_yaml::Value;

use crate::{
    DistillErr, Result,
    config::DatasetSpec,
    registry::{DatasetRegistry, parse_args},
};

/// The train and test sets produced by a dataset constructor.
pub struct Splits {
    pub train: Dataset,
    pub test: Dataset,
}

/// The loaders of a run and the shape of its samples.
pub struct DataBundle {
    pub train: DataLoader,
    pub test: DataLoader,
    pub num_classes: usize,
    pub in_features: usize,
}

/// Builds the train and test loaders described by `spec`.
///
/// # Arguments
/// * `spec` - The dataset section of the config.
/// * `batch_size` - The size of the batches of both loaders.
/// * `seed` - Seeds synthetic datasets.
/// * `registry` - Where the dataset constructors are looked up.
///
/// # Returns
/// The loaders. Only the train one shuffles, and only when `spec.shuffle` is set.
pub fn make_dataloaders(
    spec: &DatasetSpec,
    batch_size: NonZeroUsize,
    seed: u64,
    registry: &DatasetRegistry,
) -> Result<DataBundle> {
    let ctor = registry.get(&spec.kind)?;
    let Splits { train, test } = ctor(&spec.args, seed)?;

    if train.is_empty() {
        return Err(DistillErr::Config(format!(
            "the {} train set is empty",
            spec.kind
        )));
    }

    if train.in_features() != test.in_features() || train.num_classes() != test.num_classes() {
        return Err(DistillErr::Config(format!(
            "the {} train and test sets have different shapes",
            spec.kind
        )));
    }

    Ok(DataBundle {
        num_classes: train.num_classes(),
        in_features: train.in_features(),
        train: DataLoader::new(train, batch_size, spec.shuffle),
        test: DataLoader::new(test, batch_size, false),
    })
}

#[derive(Debug, Deserialize)]
struct BlobsArgs {
    #[serde(default = "default_classes")]
    classes: usize,
    #[serde(default = "default_features")]
    features: usize,
    #[serde(default = "default_train_per_class")]
    train_per_class: usize,
    #[serde(default = "default_test_per_class")]
    test_per_class: usize,
    #[serde(default = "default_radius")]
    radius: f32,
    #[serde(default = "default_spread")]
    spread: f32,
}

fn default_classes() -> usize {
    3
}

fn default_features() -> usize {
    2
}

fn default_train_per_class() -> usize {
    100
}

fn default_test_per_class() -> usize {
    30
}

fn default_radius() -> f32 {
    3.
}

fn default_spread() -> f32 {
    0.5
}

/// Gaussian clusters whose centers sit evenly on a circle in the first two features.
pub fn blobs(args: &Value, seed: u64) -> Result<Splits> {
    let args: BlobsArgs = parse_args("blobs", args)?;

    if args.classes < 2 || args.features < 2 {
        return Err(DistillErr::Config(
            "blobs needs at least 2 classes and 2 features".into(),
        ));
    }

    let noise = Normal::new(0., args.spread)
        .map_err(|e| DistillErr::Config(format!("blobs spread: {e}")))?;
    let mut rng = StdRng::seed_from_u64(seed);

    let centers: Vec<Vec<f32>> = (0..args.classes)
        .map(|k| {
            let angle = 2. * PI * k as f32 / args.classes as f32;
            let mut center = vec![0.; args.features];
            center[0] = args.radius * angle.cos();
            center[1] = args.radius * angle.sin();
            center
        })
        .collect();

    let mut sample = |per_class: usize| -> Result<Dataset> {
        let mut data = Vec::with_capacity(per_class * args.classes * args.features);
        let mut labels = Vec::with_capacity(per_class * args.classes);

        for (class, center) in centers.iter().enumerate() {
            for _ in 0..per_class {
                data.extend(center.iter().map(|c| c + noise.sample(&mut rng)));
                labels.push(class);
            }
        }

        Ok(Dataset::from_flat(data, args.features, labels, args.classes)?)
    };

    let train = sample(args.train_per_class)?;
    let test = sample(args.test_per_class)?;
    Ok(Splits { train, test })
}

#[derive(Debug, Deserialize)]
struct CsvArgs {
    train: PathBuf,
    test: PathBuf,
    #[serde(default)]
    has_headers: bool,
    #[serde(default)]
    classes: Option<usize>,
}

/// Numeric CSV files, one sample per record with the integer class in the last column.
pub fn csv(args: &Value, _seed: u64) -> Result<Splits> {
    let args: CsvArgs = parse_args("csv", args)?;

    let (train_x, train_y, width) = read_csv(&args.train, args.has_headers)?;
    let (test_x, test_y, test_width) = read_csv(&args.test, args.has_headers)?;

    if !test_y.is_empty() && test_width != width {
        return Err(DistillErr::Config(format!(
            "{} has {test_width} features but {} has {width}",
            args.test.display(),
            args.train.display()
        )));
    }

    let seen = train_y.iter().chain(&test_y).max().map_or(0, |&max| max + 1);
    let classes = args.classes.unwrap_or(seen);

    Ok(Splits {
        train: Dataset::from_flat(train_x, width, train_y, classes)?,
        test: Dataset::from_flat(test_x, width, test_y, classes)?,
    })
}

fn read_csv(path: &Path, has_headers: bool) -> Result<(Vec<f32>, Vec<usize>, usize)> {
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(has_headers)
        .trim(::csv::Trim::All)
        .from_path(path)?;

    let mut data = Vec::new();
    let mut labels = Vec::new();
    let mut width = 0;

    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let invalid = |what: &str| {
            DistillErr::Config(format!("{} record {}: {what}", path.display(), i + 1))
        };

        let (label, features) = match record.len() {
            0 | 1 => return Err(invalid("expected features followed by a label")),
            n => (&record[n - 1], n - 1),
        };

        if i == 0 {
            width = features;
        } else if features != width {
            return Err(invalid("inconsistent amount of columns"));
        }

        for field in record.iter().take(features) {
            data.push(field.parse::<f32>().map_err(|_| invalid("non numeric feature"))?);
        }

        labels.push(label.parse::<usize>().map_err(|_| invalid("the label must be a class index"))?);
    }

    Ok((data, labels, width))
}
