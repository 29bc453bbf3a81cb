//! One contiguous covered period of a series.

use std::cmp::Ordering;
use std::fmt;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::errors::{SeriesError, SeriesResult};
use crate::storage::{DataStorage, StorageFactory};
use crate::{CmpFn, ContinuityFn, IndexFn};

/// An inclusive `[period_start, period_end]` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodBounds<I> {
    /// Inclusive start of the period.
    pub period_start: I,
    /// Inclusive end of the period.
    pub period_end: I,
}

/// The restorable state of a segment: its bounds, its storage payload, and
/// whether the segment has ever been populated with real elements.
#[derive(Debug, Clone)]
pub struct SegmentFields<I, S> {
    /// The covered period.
    pub bounds: PeriodBounds<I>,
    /// The element store. Opaque to the series.
    pub data: S,
    /// Set until the first non-empty batch is merged in.
    pub empty: bool,
}

/// One contiguous covered period plus the storage holding its elements.
///
/// A segment knows how to grow its bounds, how to decide whether a foreign
/// period can be merged into it (overlap, or adjacency under the continuity
/// predicate), and how to validate a candidate period. The period is
/// inclusive at both ends, and the stored elements always lie within it.
///
/// A segment with `empty() == true` records a range that has been checked
/// and found empty: it participates fully in the layout but holds no
/// elements. Once a non-empty batch lands, the segment is non-empty forever.
pub struct Segment<D, I, S> {
    index_of: IndexFn<D, I>,
    idx_cmp: CmpFn<I>,
    are_continuous: ContinuityFn<I>,
    fields: SegmentFields<I, S>,
}

impl<D, I, S> Segment<D, I, S> {
    /// Rebuilds a segment from an external snapshot. The snapshot's bounds
    /// are trusted; see [`Series::restore`](crate::Series::restore).
    pub fn from_fields(
        index_of: IndexFn<D, I>,
        idx_cmp: CmpFn<I>,
        are_continuous: ContinuityFn<I>,
        fields: SegmentFields<I, S>,
    ) -> Self {
        Segment { index_of, idx_cmp, are_continuous, fields }
    }

    /// Overwrites the segment's state from an external snapshot.
    pub fn restore(&mut self, fields: SegmentFields<I, S>) {
        self.fields = fields;
    }

    /// Inclusive start of the covered period.
    pub fn period_start(&self) -> &I {
        &self.fields.bounds.period_start
    }

    /// Inclusive end of the covered period.
    pub fn period_end(&self) -> &I {
        &self.fields.bounds.period_end
    }

    /// The covered period.
    pub fn bounds(&self) -> &PeriodBounds<I> {
        &self.fields.bounds
    }

    /// Whether the segment has never been populated with real elements.
    pub fn empty(&self) -> bool {
        self.fields.empty
    }

    /// The segment's element store.
    pub fn data(&self) -> &S {
        &self.fields.data
    }

    /// The segment's state, suitable for snapshotting.
    pub fn fields(&self) -> &SegmentFields<I, S> {
        &self.fields
    }

    /// Whether `t` lies within the covered period, endpoints included.
    pub fn contains_point(&self, t: &I) -> bool {
        (self.idx_cmp)(t, self.period_start()) != Ordering::Less
            && (self.idx_cmp)(t, self.period_end()) != Ordering::Greater
    }

    /// Whether a period reaching `t` can be merged into this segment:
    /// `t` overlaps the covered period, or touches one of its bounds under
    /// the continuity predicate.
    pub fn can_be_merged_with(&self, t: &I) -> bool {
        self.contains_point(t)
            || (self.are_continuous)(t, self.period_start())
            || (self.are_continuous)(self.period_end(), t)
    }
}

impl<D, I, S> Segment<D, I, S>
where
    I: Clone + fmt::Debug,
    S: DataStorage<D, I>,
{
    /// Builds a segment covering `[period_start, period_end]` over `batch`,
    /// creating the storage through `factory`.
    ///
    /// The batch may be empty; the segment then records a known-empty range.
    /// Fails with [`SeriesError::InvalidArgument`] if the period is inverted,
    /// the batch is unsorted, or the batch lies outside the period.
    pub fn build<F>(
        factory: &F,
        index_of: IndexFn<D, I>,
        idx_cmp: CmpFn<I>,
        are_continuous: ContinuityFn<I>,
        period_start: &I,
        period_end: &I,
        batch: &[D],
    ) -> SeriesResult<Self, I>
    where
        F: StorageFactory<D, I, Storage = S>,
    {
        validate_data_bounds(index_of, idx_cmp, period_start, period_end, batch)?;

        let data = factory.build(index_of, idx_cmp, period_start, period_end, batch)?;
        trace!(
            "built segment [{:?}; {:?}] over {} elements",
            period_start,
            period_end,
            batch.len(),
        );

        Ok(Segment {
            index_of,
            idx_cmp,
            are_continuous,
            fields: SegmentFields {
                bounds: PeriodBounds {
                    period_start: period_start.clone(),
                    period_end: period_end.clone(),
                },
                data,
                empty: batch.is_empty(),
            },
        })
    }

    /// Merges a batch whose period is inferred from its first and last
    /// elements. An empty batch is a no-op.
    pub fn merge_data(&mut self, batch: &[D]) -> SeriesResult<(), I> {
        let (Some(first), Some(last)) = (batch.first(), batch.last()) else {
            return Ok(());
        };

        let period_start = (self.index_of)(first);
        let period_end = (self.index_of)(last);

        self.merge_period(&period_start, &period_end, batch)
    }

    /// Merges `batch` covering `[period_start, period_end]` into the segment.
    ///
    /// The new period must overlap the existing bounds or be continuous with
    /// one of them; otherwise the merge fails with
    /// [`SeriesError::NoIntersection`] and nothing is mutated. On success the
    /// bounds widen to the union of the two periods and the batch overwrites
    /// any stored elements whose index falls within its span.
    pub fn merge_period(
        &mut self,
        period_start: &I,
        period_end: &I,
        batch: &[D],
    ) -> SeriesResult<(), I> {
        validate_data_bounds(self.index_of, self.idx_cmp, period_start, period_end, batch)?;
        self.check_intersects(period_start, period_end)?;

        self.fields.data.merge(batch)?;

        if (self.idx_cmp)(period_start, self.period_start()) == Ordering::Less {
            self.fields.bounds.period_start = period_start.clone();
        }
        if (self.idx_cmp)(period_end, self.period_end()) == Ordering::Greater {
            self.fields.bounds.period_end = period_end.clone();
        }
        self.fields.empty = self.fields.empty && batch.is_empty();

        Ok(())
    }

    /// All elements of the covered period.
    pub fn get_all(&self) -> SeriesResult<Vec<D>, I> {
        self.fields.data.get(self.period_start(), self.period_end())
    }

    /// The elements of the covered period clamped to
    /// `[min_period_start, max_period_end]`, together with the clamped
    /// bounds actually fetched.
    ///
    /// Fails with [`SeriesError::OutOfRange`] if the range is disjoint from
    /// the covered period.
    pub fn get_all_in_range(
        &self,
        min_period_start: &I,
        max_period_end: &I,
    ) -> SeriesResult<(PeriodBounds<I>, Vec<D>), I> {
        if (self.idx_cmp)(self.period_end(), min_period_start) == Ordering::Less
            || (self.idx_cmp)(self.period_start(), max_period_end) == Ordering::Greater
        {
            return Err(SeriesError::OutOfRange {
                segment: self.fields.bounds.clone(),
                range: PeriodBounds {
                    period_start: min_period_start.clone(),
                    period_end: max_period_end.clone(),
                },
            });
        }

        let period_start = if (self.idx_cmp)(self.period_start(), min_period_start) == Ordering::Greater {
            self.period_start().clone()
        } else {
            min_period_start.clone()
        };
        let period_end = if (self.idx_cmp)(self.period_end(), max_period_end) == Ordering::Less {
            self.period_end().clone()
        } else {
            max_period_end.clone()
        };

        let data = self.fields.data.get(&period_start, &period_end)?;

        Ok((PeriodBounds { period_start, period_end }, data))
    }

    /// The first element ever stored in the segment.
    pub fn first(&self) -> Option<D> {
        self.fields.data.first(self.period_start())
    }

    /// The last element ever stored in the segment.
    pub fn last(&self) -> Option<D> {
        self.fields.data.last(self.period_end())
    }

    fn check_intersects(&self, period_start: &I, period_end: &I) -> SeriesResult<(), I> {
        let starts_past_end = (self.idx_cmp)(period_start, self.period_end()) == Ordering::Greater
            && !(self.are_continuous)(self.period_end(), period_start);
        let ends_before_start = (self.idx_cmp)(period_end, self.period_start()) == Ordering::Less
            && !(self.are_continuous)(period_end, self.period_start());

        if starts_past_end || ends_before_start {
            return Err(SeriesError::NoIntersection {
                merged: PeriodBounds {
                    period_start: period_start.clone(),
                    period_end: period_end.clone(),
                },
                current: self.fields.bounds.clone(),
            });
        }

        Ok(())
    }
}

impl<D, I: fmt::Debug, S> fmt::Debug for Segment<D, I, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("period_start", &self.fields.bounds.period_start)
            .field("period_end", &self.fields.bounds.period_end)
            .field("empty", &self.fields.empty)
            .finish_non_exhaustive()
    }
}

fn validate_data_bounds<D, I>(
    index_of: IndexFn<D, I>,
    idx_cmp: CmpFn<I>,
    period_start: &I,
    period_end: &I,
    batch: &[D],
) -> SeriesResult<(), I>
where
    I: fmt::Debug,
{
    if idx_cmp(period_start, period_end) == Ordering::Greater {
        return Err(SeriesError::InvalidArgument(format!(
            "incorrect period provided: {period_start:?} > {period_end:?}",
        )));
    }

    let (Some(first), Some(last)) = (batch.first(), batch.last()) else {
        return Ok(());
    };

    let batch_start = index_of(first);
    let batch_end = index_of(last);

    if idx_cmp(&batch_start, &batch_end) == Ordering::Greater {
        return Err(SeriesError::InvalidArgument(format!(
            "data is not sorted: {batch_start:?} - {batch_end:?}",
        )));
    }
    if idx_cmp(period_start, &batch_start) == Ordering::Greater {
        return Err(SeriesError::InvalidArgument(format!(
            "incorrect period start: {period_start:?} > {batch_start:?}",
        )));
    }
    if idx_cmp(period_end, &batch_end) == Ordering::Less {
        return Err(SeriesError::InvalidArgument(format!(
            "incorrect period end: {period_end:?} < {batch_end:?}",
        )));
    }

    Ok(())
}
