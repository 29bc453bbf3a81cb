//! Errors surfaced by the series, its segments, and their storages.
//!
//! The taxonomy follows the split between usage errors (the caller violated a
//! precondition; nothing was mutated) and contract errors between the series
//! and a storage (the layout may be trusted, the storage is suspect).
//! Internal impossibilities are not represented here: a storage observing a
//! state that bounds say cannot exist panics instead of reporting.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::segment::PeriodBounds;

/// The result type of fallible series operations.
pub type SeriesResult<T, I> = Result<T, SeriesError<I>>;

/// An error reported by a series, segment, or storage operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum SeriesError<I> {
    /// A read could not be fully satisfied.
    ///
    /// The embedded interval is the maximal missing sub-range within the
    /// request, clamped against existing coverage where possible. The bounds
    /// are the inclusive frontier of known coverage: when an endpoint of the
    /// request lies inside a covered period, the corresponding bound names
    /// that period's own boundary index.
    #[error("series missing period: {period_start:?} - {period_end:?}")]
    MissingPeriod {
        /// Inclusive start of the missing sub-range.
        period_start: I,
        /// Inclusive end of the missing sub-range.
        period_end: I,
    },

    /// A caller-supplied period or batch violated a precondition: period
    /// start greater than end, unsorted data, or data outside the declared
    /// period.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A period was merged into a segment it neither overlaps nor touches.
    ///
    /// Never surfaced through [`Series::add_period`](crate::Series::add_period);
    /// the series dispatch guarantees intersection before delegating.
    #[error("merged period has no intersection with segment: merged = {merged:?}, current = {current:?}")]
    NoIntersection {
        /// The period that was being merged.
        merged: PeriodBounds<I>,
        /// The bounds of the segment it was merged into.
        current: PeriodBounds<I>,
    },

    /// A clamped segment read was given a range disjoint from the segment.
    #[error("period is out of range: segment = {segment:?}, range = {range:?}")]
    OutOfRange {
        /// The bounds of the segment that was read.
        segment: PeriodBounds<I>,
        /// The requested range.
        range: PeriodBounds<I>,
    },

    /// A storage post-condition failed: returned elements lie outside the
    /// declared bounds. The layout may still be trusted but this storage is
    /// suspect; callers should treat this as fatal.
    #[error("storage integrity violated: {0}")]
    StorageIntegrity(String),
}
