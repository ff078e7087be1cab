use std::num::NonZeroUsize;

use ndarray::Array2;
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use crate::dataset::Dataset;

/// A batch of samples copied out of a `Dataset`.
#[derive(Debug, Clone)]
pub struct Batch {
    pub x: Array2<f32>,
    pub labels: Vec<usize>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Splits a `Dataset` into batches, optionally shuffled.
///
/// The order of a pass only depends on the seed handed to `batches`, so the same seed always
/// yields the same batches. A finite, restartable sequence: every call starts a new pass.
#[derive(Debug, Clone)]
pub struct DataLoader {
    dataset: Dataset,
    batch_size: NonZeroUsize,
    shuffle: bool,
}

impl DataLoader {
    pub fn new(dataset: Dataset, batch_size: NonZeroUsize, shuffle: bool) -> Self {
        Self {
            dataset,
            batch_size,
            shuffle,
        }
    }

    /// Returns the amount of samples in the underlying dataset.
    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    /// Starts a new pass over the dataset.
    ///
    /// # Arguments
    /// * `seed` - The seed of the shuffle, ignored when the loader doesn't shuffle.
    pub fn batches(&self, seed: u64) -> Batches<'_> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();

        if self.shuffle {
            order.shuffle(&mut StdRng::seed_from_u64(seed));
        }

        Batches {
            dataset: &self.dataset,
            order,
            batch_size: self.batch_size.get(),
            cursor: 0,
        }
    }
}

/// An iterator over the batches of a single pass.
pub struct Batches<'a> {
    dataset: &'a Dataset,
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl Iterator for Batches<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.order.len() {
            return None;
        }

        let end = (self.cursor + self.batch_size).min(self.order.len());
        let (x, labels) = self.dataset.select(&self.order[self.cursor..end]);
        self.cursor = end;

        Some(Batch { x, labels })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader(shuffle: bool) -> DataLoader {
        let dataset = Dataset::from_flat(
            (0..10).map(|i| i as f32).collect(),
            1,
            (0..10).map(|i| i % 2).collect(),
            2,
        )
        .unwrap();

        DataLoader::new(dataset, NonZeroUsize::new(4).unwrap(), shuffle)
    }

    #[test]
    fn batches_cover_the_dataset_once() {
        let sizes: Vec<_> = loader(false).batches(0).map(|b| b.len()).collect();
        assert_eq!(sizes, vec![4, 4, 2]);

        let first = loader(false).batches(0).next().unwrap();
        assert_eq!(first.x.column(0).to_vec(), vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(first.labels, vec![0, 1, 0, 1]);
    }

    #[test]
    fn shuffle_is_a_function_of_the_seed() {
        let dl = loader(true);
        let order = |seed| -> Vec<f32> { dl.batches(seed).flat_map(|b| b.x.column(0).to_vec()).collect() };

        assert_eq!(order(5), order(5));
        assert_ne!(order(5), order(6));

        let mut seen = order(5);
        seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(seen, (0..10).map(|i| i as f32).collect::<Vec<_>>());
    }
}
