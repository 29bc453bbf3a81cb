//! The per-segment element store boundary.
//!
//! Each segment of a series owns one [`DataStorage`]: a sorted sequence of
//! elements covering the segment's period. The series and segment layers are
//! generic over the storage strategy and see it only through this contract,
//! so the flat-array strategy that ships can later be replaced (a B-tree, a
//! database-backed store) without touching the layout engine.
//!
//! Storages are created through a [`StorageFactory`] handed to the series at
//! construction; the same factory value serves every segment the series ever
//! creates.

pub mod array;

pub use self::array::{ArrayStorage, ArrayStorageFactory};

use crate::errors::SeriesResult;
use crate::{CmpFn, IndexFn};

/// A sorted sequence of elements owned by one segment.
///
/// Implementations maintain the elements in non-decreasing index order. The
/// declared bounds of the owning segment are not known to the storage; range
/// arguments passed in are already clamped by the caller.
pub trait DataStorage<D, I> {
    /// Elements with `period_start <= index_of(e) <= period_end`, in order.
    fn get(&self, period_start: &I, period_end: &I) -> SeriesResult<Vec<D>, I>;

    /// Elements with `period_start <= index_of(e) < period_end`, in order.
    fn get_end_open(&self, period_start: &I, period_end: &I) -> SeriesResult<Vec<D>, I>;

    /// Splices a sorted batch into the storage.
    ///
    /// Pre-existing elements whose index falls within the batch's index span
    /// are overwritten by the batch, duplicates included.
    fn merge(&mut self, batch: &[D]) -> SeriesResult<(), I>;

    /// The first element ever stored. The index argument is informational
    /// (a remote storage may use it to address the lookup).
    fn first(&self, idx: &I) -> Option<D>;

    /// The last element ever stored. The index argument is informational.
    fn last(&self, idx: &I) -> Option<D>;
}

/// Builds the storage for a newly created segment.
pub trait StorageFactory<D, I> {
    /// The storage strategy this factory builds.
    type Storage: DataStorage<D, I>;

    /// Builds a storage over the initial batch of a segment covering
    /// `[period_start, period_end]`. The batch may be empty.
    fn build(
        &self,
        index_of: IndexFn<D, I>,
        idx_cmp: CmpFn<I>,
        period_start: &I,
        period_end: &I,
        batch: &[D],
    ) -> SeriesResult<Self::Storage, I>;
}
