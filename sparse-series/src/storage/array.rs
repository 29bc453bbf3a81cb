//! Flat sorted array storage.

use std::cmp::Ordering;
use std::fmt;

use log::trace;

use super::{DataStorage, StorageFactory};
use crate::errors::SeriesResult;
use crate::{CmpFn, IndexFn};

/// Builds [`ArrayStorage`] instances.
#[derive(Clone, Copy, Debug, Default)]
pub struct ArrayStorageFactory;

impl<D: Clone, I> StorageFactory<D, I> for ArrayStorageFactory {
    type Storage = ArrayStorage<D, I>;

    fn build(
        &self,
        index_of: IndexFn<D, I>,
        idx_cmp: CmpFn<I>,
        _period_start: &I,
        _period_end: &I,
        batch: &[D],
    ) -> SeriesResult<Self::Storage, I> {
        Ok(ArrayStorage {
            index_of,
            idx_cmp,
            data: batch.to_vec(),
        })
    }
}

/// Storage keeping its elements in one flat vector, sorted by index.
///
/// Reads binary-search both ends of the requested range. Merges splice the
/// incoming batch over the covered middle, so a batch overwrites any
/// pre-existing elements whose index falls within its span.
#[derive(Clone)]
pub struct ArrayStorage<D, I> {
    index_of: IndexFn<D, I>,
    idx_cmp: CmpFn<I>,
    data: Vec<D>,
}

impl<D, I> ArrayStorage<D, I> {
    /// First position whose index is `>= idx`.
    fn lower_bound(&self, idx: &I) -> usize {
        self.data
            .partition_point(|element| (self.idx_cmp)(&(self.index_of)(element), idx) == Ordering::Less)
    }

    /// First position whose index is `> idx`.
    fn upper_bound(&self, idx: &I) -> usize {
        self.data
            .partition_point(|element| (self.idx_cmp)(&(self.index_of)(element), idx) != Ordering::Greater)
    }
}

impl<D: Clone, I> ArrayStorage<D, I> {
    fn get_range(&self, period_start: &I, period_end: &I, end_open: bool) -> Vec<D> {
        let lower = self.lower_bound(period_start);
        let upper = if end_open {
            self.lower_bound(period_end)
        } else {
            self.upper_bound(period_end)
        };

        if lower >= upper {
            return Vec::new();
        }

        self.data[lower..upper].to_vec()
    }
}

impl<D: Clone, I> DataStorage<D, I> for ArrayStorage<D, I> {
    fn get(&self, period_start: &I, period_end: &I) -> SeriesResult<Vec<D>, I> {
        Ok(self.get_range(period_start, period_end, false))
    }

    fn get_end_open(&self, period_start: &I, period_end: &I) -> SeriesResult<Vec<D>, I> {
        Ok(self.get_range(period_start, period_end, true))
    }

    fn merge(&mut self, batch: &[D]) -> SeriesResult<(), I> {
        let (Some(batch_first), Some(batch_last)) = (batch.first(), batch.last()) else {
            return Ok(());
        };

        // Everything strictly before the batch's first index survives as the
        // prefix, everything strictly after its last index as the suffix; the
        // batch replaces the covered middle, duplicates included.
        let prefix_end = self.lower_bound(&(self.index_of)(batch_first));
        let suffix_start = self.upper_bound(&(self.index_of)(batch_last));
        trace!(
            "splicing {} elements over {}..{} of {}",
            batch.len(),
            prefix_end,
            suffix_start,
            self.data.len(),
        );

        self.data.splice(prefix_end..suffix_start, batch.iter().cloned());

        Ok(())
    }

    fn first(&self, _idx: &I) -> Option<D> {
        self.data.first().cloned()
    }

    fn last(&self, _idx: &I) -> Option<D> {
        self.data.last().cloned()
    }
}

impl<D: fmt::Debug, I> fmt::Debug for ArrayStorage<D, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.data.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(data: &[i64]) -> ArrayStorage<i64, i64> {
        let (start, end) = (data.first().copied().unwrap_or(0), data.last().copied().unwrap_or(0));
        ArrayStorageFactory
            .build(|d| *d, |a, b| a.cmp(b), &start, &end, data)
            .unwrap()
    }

    #[test]
    fn gets_inclusive_range() {
        let storage = storage(&[10, 20, 30, 40]);
        assert_eq!(storage.get(&10, &40).unwrap(), vec![10, 20, 30, 40]);
        assert_eq!(storage.get(&15, &35).unwrap(), vec![20, 30]);
        assert_eq!(storage.get(&20, &20).unwrap(), vec![20]);
        assert_eq!(storage.get(&31, &39).unwrap(), Vec::<i64>::new());
    }

    #[test]
    fn gets_end_open_range() {
        let storage = storage(&[10, 20, 30, 40]);
        assert_eq!(storage.get_end_open(&10, &40).unwrap(), vec![10, 20, 30]);
        assert_eq!(storage.get_end_open(&10, &10).unwrap(), Vec::<i64>::new());
        assert_eq!(storage.get_end_open(&10, &11).unwrap(), vec![10]);
    }

    #[test]
    fn merge_into_empty_clones_batch() {
        let mut storage = storage(&[]);
        storage.merge(&[10, 20]).unwrap();
        assert_eq!(storage.get(&10, &20).unwrap(), vec![10, 20]);
    }

    #[test]
    fn merge_extends_both_ends() {
        let mut storage = storage(&[20, 30]);
        storage.merge(&[10, 20]).unwrap();
        storage.merge(&[30, 40]).unwrap();
        assert_eq!(storage.get(&10, &40).unwrap(), vec![10, 20, 30, 40]);
    }

    #[test]
    fn merge_overwrites_covered_middle() {
        let mut storage = storage(&[10, 20, 30, 40]);
        storage.merge(&[15, 25, 35]).unwrap();
        assert_eq!(storage.get(&10, &40).unwrap(), vec![10, 15, 25, 35, 40]);
    }

    #[test]
    fn merge_keeps_duplicates_from_batch() {
        let mut storage = storage(&[10, 20, 30]);
        storage.merge(&[20, 20, 20]).unwrap();
        assert_eq!(storage.get(&10, &30).unwrap(), vec![10, 20, 20, 20, 30]);
    }

    #[test]
    fn merge_covering_everything_replaces_storage() {
        let mut storage = storage(&[20, 30]);
        storage.merge(&[10, 20, 30, 40]).unwrap();
        assert_eq!(storage.get(&10, &40).unwrap(), vec![10, 20, 30, 40]);
    }

    #[test]
    fn first_and_last() {
        let populated = storage(&[10, 20, 30]);
        assert_eq!(populated.first(&10), Some(10));
        assert_eq!(populated.last(&30), Some(30));

        let empty = storage(&[]);
        assert_eq!(empty.first(&0), None);
        assert_eq!(empty.last(&0), None);
    }
}
