//! The sparse layout engine.
//!
//! A [`Series`] maintains an index-ordered vector of disjoint [`Segment`]s.
//! Ingesting a period binary-searches the insertion point, classifies the
//! incoming period against the existing layout, and dispatches to one of five
//! merge strategies; reads either return the data inside a single covered
//! period or refuse with the precise missing sub-range.

use std::cmp::Ordering;
use std::fmt;

use log::debug;
use smallvec::SmallVec;

use crate::compare::IndexOrd;
use crate::errors::{SeriesError, SeriesResult};
use crate::segment::{Segment, SegmentFields};
use crate::storage::{DataStorage, StorageFactory};
use crate::{CmpFn, ContinuityFn, IndexFn};

/// A layout snapshot: the restorable state of every segment, in index order.
pub struct SeriesState<I, S> {
    /// Segment snapshots, sorted and disjoint.
    pub segments: Vec<SegmentFields<I, S>>,
}

/// A sparse ordered series: disjoint covered periods over a totally ordered
/// index, with merge and precise-gap-reporting semantics.
///
/// See the [crate docs](crate) for the data model and an example.
pub struct Series<D, I, F: StorageFactory<D, I>> {
    factory: F,
    index_of: IndexFn<D, I>,
    idx_cmp: CmpFn<I>,
    are_continuous: ContinuityFn<I>,
    segments: SmallVec<[Segment<D, I, F::Storage>; 4]>,
}

fn never_continuous<I>(_smaller: &I, _bigger: &I) -> bool {
    false
}

impl<D, I, F> Series<D, I, F>
where
    D: Clone,
    I: Clone + fmt::Debug,
    F: StorageFactory<D, I>,
{
    /// A series with the default comparator for the index type and pure
    /// overlap semantics (no continuity).
    pub fn new(factory: F, index_of: IndexFn<D, I>) -> Self
    where
        I: IndexOrd,
    {
        Self::with_parts(factory, index_of, I::index_cmp, None)
    }

    /// A series with the default comparator and a continuity predicate.
    pub fn with_continuity(
        factory: F,
        index_of: IndexFn<D, I>,
        are_continuous: ContinuityFn<I>,
    ) -> Self
    where
        I: IndexOrd,
    {
        Self::with_parts(factory, index_of, I::index_cmp, Some(are_continuous))
    }

    /// A series from all its parts. Without a continuity predicate, two
    /// covered periods are mergeable only when they overlap.
    pub fn with_parts(
        factory: F,
        index_of: IndexFn<D, I>,
        idx_cmp: CmpFn<I>,
        are_continuous: Option<ContinuityFn<I>>,
    ) -> Self {
        Series {
            factory,
            index_of,
            idx_cmp,
            are_continuous: are_continuous.unwrap_or(never_continuous::<I>),
            segments: SmallVec::new(),
        }
    }

    /// The segments of the layout, in index order.
    pub fn segments(&self) -> &[Segment<D, I, F::Storage>] {
        &self.segments
    }

    /// The segments of the layout, or `None` if nothing has been added.
    pub fn get_all_segments(&self) -> Option<&[Segment<D, I, F::Storage>]> {
        if self.segments.is_empty() {
            None
        } else {
            Some(&self.segments)
        }
    }

    /// The segment whose covered period contains `t`, or `None`.
    pub fn get_segment(&self, t: &I) -> Option<&Segment<D, I, F::Storage>> {
        let (index, contains) = self.find_segment_starting_before_or_at(t, false)?;
        contains.then(|| &self.segments[index])
    }

    /// The data inside `[period_start, period_end]`.
    ///
    /// Succeeds only when the range lies entirely inside a single covered
    /// period; otherwise fails with [`SeriesError::MissingPeriod`] carrying
    /// the maximal missing sub-range, clamped against existing coverage.
    /// When an endpoint of the request lies inside a covered period, the
    /// corresponding bound of the reported gap is that period's own inclusive
    /// boundary index (its `period_end` for the gap's start, its
    /// `period_start` for the gap's end).
    pub fn get(&self, period_start: &I, period_end: &I) -> SeriesResult<Vec<D>, I> {
        if (self.idx_cmp)(period_start, period_end) == Ordering::Greater {
            return Err(SeriesError::InvalidArgument(format!(
                "requested period start is greater than period end: {period_start:?} > {period_end:?}",
            )));
        }
        if self.segments.is_empty() {
            return Err(missing(period_start.clone(), period_end.clone()));
        }

        let Some((last_index, last_contains)) =
            self.find_segment_starting_before_or_at(period_end, false)
        else {
            // The whole request ends before the first covered period.
            return Err(missing(period_start.clone(), period_end.clone()));
        };
        let Some((first_index, first_contains)) =
            self.find_segment_starting_before_or_at(period_start, false)
        else {
            // The request starts before the layout; everything up to the
            // first covered period is missing.
            return Err(missing(
                period_start.clone(),
                self.segments[0].period_start().clone(),
            ));
        };

        if first_index != last_index || !first_contains || !last_contains {
            let gap_start = if first_contains {
                self.segments[first_index].period_end().clone()
            } else {
                period_start.clone()
            };
            let gap_end = if last_contains {
                self.segments[last_index].period_start().clone()
            } else {
                period_end.clone()
            };
            return Err(missing(gap_start, gap_end));
        }

        let segment = &self.segments[first_index];
        let data = segment.data().get(period_start, period_end)?;

        let (Some(first), Some(last)) = (data.first(), data.last()) else {
            return Ok(data);
        };

        let first_idx = (self.index_of)(first);
        if (self.idx_cmp)(&first_idx, period_start) == Ordering::Less {
            return Err(SeriesError::StorageIntegrity(format!(
                "returned data starts before the requested period: {first_idx:?} < {period_start:?}",
            )));
        }
        let last_idx = (self.index_of)(last);
        if (self.idx_cmp)(&last_idx, period_end) == Ordering::Greater {
            return Err(SeriesError::StorageIntegrity(format!(
                "returned data ends after the requested period: {last_idx:?} > {period_end:?}",
            )));
        }

        Ok(data)
    }

    /// The segment containing both `period_start` and `period_end`, or
    /// `None` when the two endpoints do not fall within one segment.
    pub fn get_period(
        &self,
        period_start: &I,
        period_end: &I,
    ) -> Option<&Segment<D, I, F::Storage>> {
        let (first_index, contains) =
            self.find_segment_starting_before_or_at(period_start, false)?;
        if !contains {
            return None;
        }

        if (self.idx_cmp)(period_start, period_end) == Ordering::Equal {
            return Some(&self.segments[first_index]);
        }

        let (last_index, contains) = self.find_segment_starting_before_or_at(period_end, false)?;
        if !contains || first_index != last_index {
            return None;
        }

        Some(&self.segments[first_index])
    }

    /// The highest-indexed segment whose start is `<= t`. With `non_empty`,
    /// segments that were never populated are skipped backwards.
    pub fn get_period_closest_from_start(
        &self,
        t: &I,
        non_empty: bool,
    ) -> Option<&Segment<D, I, F::Storage>> {
        let (mut index, _) = self.find_segment_starting_before_or_at(t, false)?;

        if non_empty {
            // Linear skip; empty segments are expected to stay rare.
            while self.segments[index].empty() {
                index = index.checked_sub(1)?;
            }
        }

        Some(&self.segments[index])
    }

    /// The lowest-indexed segment whose end is `>= t`. With `non_empty`,
    /// segments that were never populated are skipped forwards.
    pub fn get_period_closest_from_end(
        &self,
        t: &I,
        non_empty: bool,
    ) -> Option<&Segment<D, I, F::Storage>> {
        if self.segments.is_empty() {
            return None;
        }

        let mut index = match self.find_segment_starting_before_or_at(t, false) {
            None => 0,
            Some((index, true)) => index,
            Some((index, false)) => {
                if index == self.segments.len() - 1 {
                    return None;
                }
                index + 1
            }
        };

        if non_empty {
            // Linear skip; empty segments are expected to stay rare.
            while self.segments[index].empty() {
                index += 1;
                if index == self.segments.len() {
                    return None;
                }
            }
        }

        Some(&self.segments[index])
    }

    /// Adds a batch whose coverage period is inferred from its first and
    /// last elements. An empty batch is a no-op.
    pub fn add_data(&mut self, batch: &[D]) -> SeriesResult<(), I> {
        let (Some(first), Some(last)) = (batch.first(), batch.last()) else {
            return Ok(());
        };

        let period_start = (self.index_of)(first);
        let period_end = (self.index_of)(last);

        self.add_period(&period_start, &period_end, batch)
    }

    /// Absorbs `batch` covering `[period_start, period_end]` into the layout.
    ///
    /// An empty batch with an explicit period records the range as known
    /// empty. The incoming period may overlap or touch any number of existing
    /// segments: the layout grows, coalesces, and overwrites as needed, and
    /// stays sorted, disjoint, and non-mergeable afterwards.
    pub fn add_period(&mut self, period_start: &I, period_end: &I, batch: &[D]) -> SeriesResult<(), I> {
        if self.segments.is_empty() {
            let segment = self.build_segment(period_start, period_end, batch)?;
            self.segments.push(segment);
            return Ok(());
        }

        let first = self.find_segment_starting_before_or_at(period_start, true);
        let last = self.find_segment_starting_before_or_at(period_end, true);

        let Some((last_index, last_contains)) = last else {
            // Ends strictly before the first covered period, without touching.
            debug!("insert before start: [{period_start:?}; {period_end:?}]");
            let segment = self.build_segment(period_start, period_end, batch)?;
            self.segments.insert(0, segment);
            return Ok(());
        };

        let Some((first_index, first_contains)) = first else {
            debug!(
                "merge with start: [{period_start:?}; {period_end:?}] reaching segment {last_index}",
            );
            return self.merge_with_start(period_start, period_end, batch, last_index);
        };

        let tail_index = self.segments.len() - 1;

        if first_index == tail_index && !first_contains {
            // Starts strictly after the last covered period, without touching.
            debug!("insert after end: [{period_start:?}; {period_end:?}]");
            let segment = self.build_segment(period_start, period_end, batch)?;
            self.segments.push(segment);
            return Ok(());
        }

        if last_index == tail_index && !last_contains {
            debug!(
                "merge with end: [{period_start:?}; {period_end:?}] from segment {first_index}",
            );
            return self.merge_with_end(period_start, period_end, batch, first_index);
        }

        debug!(
            "merge within range: [{period_start:?}; {period_end:?}] spanning segments {first_index}..={last_index}",
        );
        self.merge_within_range(period_start, period_end, batch, first_index, last_index)
    }

    /// Rebuilds the layout from a snapshot.
    ///
    /// Validates `period_start <= period_end` for every incoming segment and
    /// fails without mutating otherwise. No cross-segment validation is
    /// performed: the caller is responsible for supplying a sorted, disjoint,
    /// coalesced layout.
    pub fn restore(&mut self, state: SeriesState<I, F::Storage>) -> SeriesResult<(), I> {
        for fields in &state.segments {
            if (self.idx_cmp)(&fields.bounds.period_start, &fields.bounds.period_end)
                == Ordering::Greater
            {
                return Err(SeriesError::InvalidArgument(format!(
                    "segment period start is greater than period end: {:?} > {:?}",
                    fields.bounds.period_start, fields.bounds.period_end,
                )));
            }
        }

        self.segments = state
            .segments
            .into_iter()
            .map(|fields| {
                Segment::from_fields(self.index_of, self.idx_cmp, self.are_continuous, fields)
            })
            .collect();

        Ok(())
    }

    /// New coverage reaching into the layout from the left, up to the segment
    /// at `last_index`. Everything the new range swallowed is deleted; the
    /// left-most segment afterwards is either the grown segment or a fresh
    /// one built over the batch.
    fn merge_with_start(
        &mut self,
        period_start: &I,
        period_end: &I,
        batch: &[D],
        last_index: usize,
    ) -> SeriesResult<(), I> {
        if self.segments[last_index].can_be_merged_with(period_end) {
            self.segments[last_index].merge_period(period_start, period_end, batch)?;
            self.segments.drain(..last_index);
        } else {
            let segment = self.build_segment(period_start, period_end, batch)?;
            self.segments.drain(..last_index);
            self.segments[0] = segment;
        }

        Ok(())
    }

    /// New coverage extending past the tail of the layout, starting inside it
    /// at the segment at `first_index`. Swallowed segments after the landing
    /// point are deleted.
    fn merge_with_end(
        &mut self,
        period_start: &I,
        period_end: &I,
        batch: &[D],
        first_index: usize,
    ) -> SeriesResult<(), I> {
        if self.segments[first_index].can_be_merged_with(period_start) {
            self.segments[first_index].merge_period(period_start, period_end, batch)?;
            self.segments.truncate(first_index + 1);
        } else {
            let segment = self.build_segment(period_start, period_end, batch)?;
            self.segments[first_index + 1] = segment;
            self.segments.truncate(first_index + 2);
        }

        Ok(())
    }

    /// New coverage sitting between the start of the segment at `first_index`
    /// and the end of the segment at `last_index`, possibly spanning several
    /// segments.
    fn merge_within_range(
        &mut self,
        period_start: &I,
        period_end: &I,
        batch: &[D],
        first_index: usize,
        last_index: usize,
    ) -> SeriesResult<(), I> {
        let merge_with_first = self.segments[first_index].can_be_merged_with(period_start);

        if first_index == last_index && merge_with_first {
            return self.segments[first_index].merge_period(period_start, period_end, batch);
        }

        let merge_with_last = self.segments[last_index].can_be_merged_with(period_end);

        if merge_with_first && merge_with_last {
            // Pull the part of the first segment strictly before the new
            // period, prepend it to the batch, and land everything in the
            // last segment, which then replaces the whole spanned run.
            let first_start = self.segments[first_index].period_start().clone();
            let mut combined = self.segments[first_index]
                .data()
                .get_end_open(&first_start, period_start)?;
            combined.extend_from_slice(batch);

            let merged_start = if (self.idx_cmp)(&first_start, period_start) == Ordering::Less {
                first_start
            } else {
                period_start.clone()
            };

            self.segments[last_index].merge_period(&merged_start, period_end, &combined)?;
            self.segments.swap(first_index, last_index);
            self.segments.drain(first_index + 1..=last_index);
            return Ok(());
        }

        if merge_with_first {
            // The new range extended into and past the trailing segments
            // without touching the last one; their leftovers are discarded.
            self.segments[first_index].merge_period(period_start, period_end, batch)?;
            self.segments.drain(first_index + 1..=last_index);
            return Ok(());
        }

        if merge_with_last {
            self.segments[last_index].merge_period(period_start, period_end, batch)?;
            self.segments.drain(first_index + 1..last_index);
            return Ok(());
        }

        let segment = self.build_segment(period_start, period_end, batch)?;
        if first_index == last_index {
            // A new island strictly between two existing segments.
            self.segments.insert(first_index + 1, segment);
            return Ok(());
        }

        self.segments[first_index + 1] = segment;
        self.segments.drain(first_index + 2..=last_index);

        Ok(())
    }

    fn build_segment(
        &self,
        period_start: &I,
        period_end: &I,
        batch: &[D],
    ) -> SeriesResult<Segment<D, I, F::Storage>, I> {
        Segment::build(
            &self.factory,
            self.index_of,
            self.idx_cmp,
            self.are_continuous,
            period_start,
            period_end,
            batch,
        )
    }

    /// Locates the segment whose start is closest before or at `t`.
    ///
    /// Returns `None` when `t` lies strictly before the whole layout, and
    /// `(index, contains)` otherwise; `contains` means `t` lies inside the
    /// segment at `index` (touching an endpoint included, and touching under
    /// the continuity predicate when `include_continuous` is set).
    fn find_segment_starting_before_or_at(
        &self,
        t: &I,
        include_continuous: bool,
    ) -> Option<(usize, bool)> {
        if self.segments.is_empty() {
            return None;
        }

        // First segment whose start is >= t.
        let later_or_at = self
            .segments
            .partition_point(|segment| (self.idx_cmp)(segment.period_start(), t) == Ordering::Less);

        if later_or_at == self.segments.len() {
            // Every segment starts strictly before t; t may still fall inside
            // the last one.
            let index = later_or_at - 1;
            return Some((index, self.end_covers(index, t, include_continuous)));
        }

        let candidate_start = self.segments[later_or_at].period_start();
        let starts_at = (self.idx_cmp)(candidate_start, t) != Ordering::Greater
            || (include_continuous && (self.are_continuous)(t, candidate_start));
        if starts_at {
            return Some((later_or_at, true));
        }
        if later_or_at == 0 {
            return None;
        }

        let index = later_or_at - 1;
        Some((index, self.end_covers(index, t, include_continuous)))
    }

    /// Whether `t` is at or before the end of the segment at `index`, or
    /// touches it under the continuity predicate.
    fn end_covers(&self, index: usize, t: &I, include_continuous: bool) -> bool {
        let end = self.segments[index].period_end();
        (self.idx_cmp)(t, end) != Ordering::Greater
            || (include_continuous && (self.are_continuous)(end, t))
    }
}

impl<D, I, F> fmt::Debug for Series<D, I, F>
where
    I: fmt::Debug,
    F: StorageFactory<D, I>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for segment in &self.segments {
            list.entry(&format_args!(
                "[{:?}; {:?}]{}",
                segment.bounds().period_start,
                segment.bounds().period_end,
                if segment.empty() { " (empty)" } else { "" },
            ));
        }
        list.finish()
    }
}

fn missing<I>(period_start: I, period_end: I) -> SeriesError<I> {
    SeriesError::MissingPeriod { period_start, period_end }
}
