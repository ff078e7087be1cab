use ndarray::{Array2, Axis};

use crate::{MlErr, Result};

/// An in-memory labelled classification dataset, one sample per row.
#[derive(Debug, Clone)]
pub struct Dataset {
    x: Array2<f32>,
    labels: Vec<usize>,
    num_classes: usize,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `x` - The features, one row per sample.
    /// * `labels` - The class of each sample.
    /// * `num_classes` - The amount of classes, every label must be lower than it.
    ///
    /// # Returns
    /// An error if the amount of rows and labels differ or a label is out of range.
    pub fn new(x: Array2<f32>, labels: Vec<usize>, num_classes: usize) -> Result<Self> {
        if x.nrows() != labels.len() {
            return Err(MlErr::SizeMismatch {
                what: "dataset labels",
                got: labels.len(),
                expected: x.nrows(),
            });
        }

        if let Some(&label) = labels.iter().find(|&&label| label >= num_classes) {
            return Err(MlErr::InvalidInput(format!(
                "label {label} is out of range for {num_classes} classes"
            )));
        }

        Ok(Self {
            x,
            labels,
            num_classes,
        })
    }

    /// Creates a new `Dataset` from a flat row-major buffer of `x_size` features per sample.
    pub fn from_flat(
        data: Vec<f32>,
        x_size: usize,
        labels: Vec<usize>,
        num_classes: usize,
    ) -> Result<Self> {
        let rows = labels.len();
        let len = data.len();
        let x = Array2::from_shape_vec((rows, x_size), data).map_err(|_| MlErr::SizeMismatch {
            what: "dataset features",
            got: len,
            expected: rows * x_size,
        })?;

        Self::new(x, labels, num_classes)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Returns the amount of features per sample.
    pub fn in_features(&self) -> usize {
        self.x.ncols()
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn x(&self) -> &Array2<f32> {
        &self.x
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Copies the given rows into a new feature matrix and label vector.
    pub fn select(&self, indices: &[usize]) -> (Array2<f32>, Vec<usize>) {
        let x = self.x.select(Axis(0), indices);
        let labels = indices.iter().map(|&i| self.labels[i]).collect();
        (x, labels)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn dataset_basic() {
        let ds = Dataset::new(array![[1.0, 2.0], [3.0, 4.0]], vec![0, 1], 2).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.in_features(), 2);

        let (x, labels) = ds.select(&[1]);
        assert_eq!(x, array![[3.0, 4.0]]);
        assert_eq!(labels, vec![1]);
    }

    #[test]
    fn rejects_out_of_range_labels() {
        assert!(Dataset::new(array![[1.0]], vec![2], 2).is_err());
    }

    #[test]
    fn from_flat_checks_shape() {
        assert!(Dataset::from_flat(vec![1.0, 2.0, 3.0], 2, vec![0, 1], 2).is_err());
        assert!(Dataset::from_flat(vec![1.0, 2.0, 3.0, 4.0], 2, vec![0, 1], 2).is_ok());
    }
}
