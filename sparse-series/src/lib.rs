//! An in-memory sparse ordered series container.
//!
//! A [`Series`] holds a value sequence indexed by a totally ordered key, where
//! only certain disjoint index intervals ("covered periods") are known to be
//! present. Data is ingested as batches tagged with an explicit coverage
//! period, and arbitrary ranges can be queried later: a read succeeds when the
//! requested range lies entirely inside a single covered period, and otherwise
//! reports *which* sub-range is missing.
//!
//! This makes the series a building block for caches of time-series or
//! index-keyed records pulled from a slow upstream (a database, a remote API),
//! where the cache must know not only what data it holds but also which empty
//! ranges it has explicitly observed as empty.
//!
//! # Examples
//!
//! ```
//! use sparse_series::{ArrayStorageFactory, Series, SeriesError};
//!
//! // Elements are their own indexes; adjacent integers count as touching.
//! let mut series = Series::with_continuity(
//!     ArrayStorageFactory,
//!     |value: &i64| *value,
//!     |smaller: &i64, bigger: &i64| bigger - smaller == 1,
//! );
//!
//! series.add_data(&[10, 20, 30]).unwrap();
//! series.add_data(&[40, 50, 60]).unwrap();
//!
//! // The hole between the two covered periods is reported precisely.
//! assert_eq!(
//!     series.get(&10, &60),
//!     Err(SeriesError::MissingPeriod { period_start: 30, period_end: 40 }),
//! );
//!
//! // Bridging the hole coalesces the layout into one covered period.
//! series.add_data(&[31, 35, 39]).unwrap();
//! assert_eq!(
//!     series.get(&10, &60).unwrap(),
//!     vec![10, 20, 30, 31, 35, 39, 40, 50, 60],
//! );
//! ```
//!
//! # Structure
//!
//! Three layers, each exclusively owning the one below: the [`Series`] owns an
//! index-ordered vector of disjoint [`Segment`]s; each segment owns one
//! contiguous covered period and a [`DataStorage`] holding its elements. The
//! storage strategy is chosen by the [`StorageFactory`] handed to the series
//! at construction; [`ArrayStorage`] (a flat sorted array) is the strategy
//! that ships.
//!
//! The container performs no concurrency control and never blocks; callers
//! serialize mutations externally.

pub mod compare;
pub mod errors;
pub mod segment;
pub mod series;
pub mod storage;

pub use compare::IndexOrd;
pub use errors::{SeriesError, SeriesResult};
pub use segment::{PeriodBounds, Segment, SegmentFields};
pub use series::{Series, SeriesState};
pub use storage::{ArrayStorage, ArrayStorageFactory, DataStorage, StorageFactory};

/// Extracts the index of an element.
///
/// The projection must be pure and stable: the same element always maps to
/// the same index.
pub type IndexFn<D, I> = fn(&D) -> I;

/// Three-way comparator defining the total order of an index type.
pub type CmpFn<I> = fn(&I, &I) -> std::cmp::Ordering;

/// Decides whether two disjoint indexes are touching.
///
/// Arguments are `(smaller, bigger)` with `smaller < bigger` under the
/// series comparator; e.g. `|s, b| *b == *s + 1` for integer keys. Two
/// covered periods whose facing bounds are continuous are coalesced into
/// one segment.
pub type ContinuityFn<I> = fn(&I, &I) -> bool;
