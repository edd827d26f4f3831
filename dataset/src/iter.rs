use std::iter::FusedIterator;

use crate::dataset::Dataset;
use crate::error::Result;

/// Sequential cursor over a dataset.
///
/// Yields `dataset.get(i)` for every index in order and then `None`. A new
/// iterator starts again from the first sample.
pub struct DatasetIter<'a, D: Dataset> {
    dataset: &'a D,
    index: usize,
}

impl<'a, D: Dataset> DatasetIter<'a, D> {
    pub fn new(dataset: &'a D) -> Self {
        Self { dataset, index: 0 }
    }

    /// Index of the next sample to be produced.
    pub fn position(&self) -> usize {
        self.index
    }
}

impl<D: Dataset> Iterator for DatasetIter<'_, D> {
    type Item = Result<D::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.dataset.len() {
            return None;
        }

        let item = self.dataset.get(self.index);
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.dataset.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl<D: Dataset> ExactSizeIterator for DatasetIter<'_, D> {}

impl<D: Dataset> FusedIterator for DatasetIter<'_, D> {}
