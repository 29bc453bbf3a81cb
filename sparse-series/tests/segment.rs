//! Segment-level merge and read behavior.

use std::cmp::Ordering;

use sparse_series::{ArrayStorage, ArrayStorageFactory, Segment, SeriesError};

type IntSegment = Segment<i64, i64, ArrayStorage<i64, i64>>;

fn ident(value: &i64) -> i64 {
    *value
}

fn cmp(a: &i64, b: &i64) -> Ordering {
    a.cmp(b)
}

fn never(_smaller: &i64, _bigger: &i64) -> bool {
    false
}

fn adjacent(smaller: &i64, bigger: &i64) -> bool {
    bigger - smaller == 1
}

fn segment(period_start: i64, period_end: i64, batch: &[i64]) -> IntSegment {
    Segment::build(&ArrayStorageFactory, ident, cmp, never, &period_start, &period_end, batch)
        .unwrap()
}

fn segment_over(batch: &[i64]) -> IntSegment {
    segment(batch[0], batch[batch.len() - 1], batch)
}

fn continuous_segment_over(batch: &[i64]) -> IntSegment {
    Segment::build(
        &ArrayStorageFactory,
        ident,
        cmp,
        adjacent,
        &batch[0],
        &batch[batch.len() - 1],
        batch,
    )
    .unwrap()
}

#[test]
fn grows_from_known_empty() {
    let mut segment = segment(31, 33, &[]);
    assert!(segment.empty());
    assert!(segment.contains_point(&31));
    assert!(segment.contains_point(&32));
    assert!(segment.contains_point(&33));
    assert!(!segment.contains_point(&30));

    segment.merge_period(&10, &32, &[10, 20, 30]).unwrap();
    assert!(!segment.empty());
    assert_eq!(segment.get_all().unwrap(), vec![10, 20, 30]);
    assert_eq!(*segment.period_start(), 10);
    assert_eq!(*segment.period_end(), 33);

    for t in [10, 15, 20, 31, 32, 33] {
        assert!(segment.contains_point(&t), "expected {t} inside the period");
    }
    for t in [8, 9, 34] {
        assert!(!segment.contains_point(&t), "expected {t} outside the period");
    }

    // Widening the period without new data keeps the elements intact.
    segment.merge_period(&8, &12, &[10]).unwrap();
    assert_eq!(segment.get_all().unwrap(), vec![10, 20, 30]);
    assert!(segment.contains_point(&8));
    assert!(segment.contains_point(&9));
}

#[test]
fn merge_chain_grows_both_ends() {
    let mut segment = segment_over(&[10, 20, 30]);

    segment.merge_data(&[30, 40, 50]).unwrap();
    assert_eq!(segment.get_all().unwrap(), vec![10, 20, 30, 40, 50]);

    segment.merge_data(&[-10, 0, 10]).unwrap();
    assert_eq!(segment.get_all().unwrap(), vec![-10, 0, 10, 20, 30, 40, 50]);

    // Fully covered batch with identical elements changes nothing.
    segment.merge_data(&[10, 20]).unwrap();
    assert_eq!(segment.get_all().unwrap(), vec![-10, 0, 10, 20, 30, 40, 50]);

    segment.merge_data(&[30, 40, 50, 60]).unwrap();
    assert_eq!(segment.get_all().unwrap(), vec![-10, 0, 10, 20, 30, 40, 50, 60]);

    // A batch covering everything replaces everything.
    let full: Vec<i64> = (-5..=9).map(|v| v * 10).collect();
    segment.merge_data(&full).unwrap();
    assert_eq!(segment.get_all().unwrap(), full);
    assert_eq!(*segment.period_start(), -50);
    assert_eq!(*segment.period_end(), 90);
}

#[test]
fn merge_bigger_replaces() {
    let mut segment = segment_over(&[10, 20]);
    segment.merge_data(&[5, 15, 25]).unwrap();
    assert_eq!(segment.get_all().unwrap(), vec![5, 15, 25]);
    assert_eq!(*segment.period_start(), 5);
    assert_eq!(*segment.period_end(), 25);
}

#[test]
fn merge_smaller_splices_interior() {
    let mut segment = segment_over(&[10, 20, 30]);
    segment.merge_data(&[15, 25]).unwrap();
    assert_eq!(segment.get_all().unwrap(), vec![10, 15, 25, 30]);
    assert_eq!(*segment.period_start(), 10);
    assert_eq!(*segment.period_end(), 30);
}

#[test]
fn merge_at_start() {
    let mut segment = segment_over(&[10, 20, 30]);
    segment.merge_data(&[5, 15]).unwrap();
    assert_eq!(segment.get_all().unwrap(), vec![5, 15, 20, 30]);
    assert_eq!(*segment.period_start(), 5);
}

#[test]
fn merge_at_start_matching_end() {
    let mut segment = segment_over(&[10, 20, 30]);
    segment.merge_data(&[5, 15, 30]).unwrap();
    assert_eq!(segment.get_all().unwrap(), vec![5, 15, 30]);
}

#[test]
fn merge_at_start_matching_start() {
    let mut segment = segment_over(&[10, 20, 30]);
    segment.merge_data(&[5, 10]).unwrap();
    assert_eq!(segment.get_all().unwrap(), vec![5, 10, 20, 30]);
}

#[test]
fn merge_touching_start() {
    let mut segment = continuous_segment_over(&[10, 20, 30]);
    segment.merge_data(&[5, 9]).unwrap();
    assert_eq!(segment.get_all().unwrap(), vec![5, 9, 10, 20, 30]);
    assert_eq!(*segment.period_start(), 5);
    assert_eq!(*segment.period_end(), 30);
}

#[test]
fn merge_at_end() {
    let mut segment = segment_over(&[10, 20, 30]);
    segment.merge_data(&[25, 35]).unwrap();
    assert_eq!(segment.get_all().unwrap(), vec![10, 20, 25, 35]);
    assert_eq!(*segment.period_end(), 35);
}

#[test]
fn merge_at_end_matching_start() {
    let mut segment = segment_over(&[10, 20, 30]);
    segment.merge_data(&[10, 15, 35]).unwrap();
    assert_eq!(segment.get_all().unwrap(), vec![10, 15, 35]);
}

#[test]
fn merge_at_end_matching_end() {
    let mut segment = segment_over(&[10, 20, 30]);
    segment.merge_data(&[30, 35]).unwrap();
    assert_eq!(segment.get_all().unwrap(), vec![10, 20, 30, 35]);
}

#[test]
fn merge_touching_end() {
    let mut segment = continuous_segment_over(&[10, 20, 30]);
    segment.merge_data(&[31, 35]).unwrap();
    assert_eq!(segment.get_all().unwrap(), vec![10, 20, 30, 31, 35]);
    assert_eq!(*segment.period_end(), 35);
}

#[test]
fn merge_keeps_batch_duplicates() {
    #[derive(Debug, Clone, PartialEq)]
    struct Reading {
        key: i64,
    }

    fn key_of(reading: &Reading) -> i64 {
        reading.key
    }

    let quadrupled = |keys: &[i64]| -> Vec<Reading> {
        keys.iter()
            .flat_map(|&key| std::iter::repeat_with(move || Reading { key }).take(4))
            .collect()
    };

    let mut segment: Segment<Reading, i64, ArrayStorage<Reading, i64>> = Segment::build(
        &ArrayStorageFactory,
        key_of,
        cmp,
        never,
        &9,
        &31,
        &quadrupled(&[10, 20, 30]),
    )
    .unwrap();

    segment.merge_period(&29, &41, &quadrupled(&[30, 40])).unwrap();
    assert_eq!(segment.get_all().unwrap(), quadrupled(&[10, 20, 30, 40]));

    segment.merge_period(&-1, &11, &quadrupled(&[0, 10])).unwrap();
    assert_eq!(segment.get_all().unwrap(), quadrupled(&[0, 10, 20, 30, 40]));
}

#[test]
fn rejects_disjoint_period() {
    let mut segment = segment_over(&[10, 20, 30]);
    assert!(matches!(
        segment.merge_period(&50, &60, &[50, 60]),
        Err(SeriesError::NoIntersection { .. }),
    ));
    // Nothing was mutated by the failed merge.
    assert_eq!(segment.get_all().unwrap(), vec![10, 20, 30]);
    assert_eq!(*segment.period_end(), 30);

    // Touching under the continuity predicate is enough.
    let mut segment = continuous_segment_over(&[10, 20, 30]);
    segment.merge_period(&31, &40, &[35, 40]).unwrap();
    assert_eq!(segment.get_all().unwrap(), vec![10, 20, 30, 35, 40]);
}

#[test]
fn rejects_invalid_arguments() {
    let mut segment = segment_over(&[10, 20, 30]);

    assert!(matches!(
        segment.merge_period(&40, &20, &[]),
        Err(SeriesError::InvalidArgument(_)),
    ));
    assert!(matches!(
        segment.merge_period(&10, &30, &[30, 20, 10]),
        Err(SeriesError::InvalidArgument(_)),
    ));
    assert!(matches!(
        segment.merge_period(&15, &30, &[10, 20]),
        Err(SeriesError::InvalidArgument(_)),
    ));
    assert!(matches!(
        segment.merge_period(&10, &25, &[10, 30]),
        Err(SeriesError::InvalidArgument(_)),
    ));

    assert_eq!(segment.get_all().unwrap(), vec![10, 20, 30]);
}

#[test]
fn clamped_range_reads() {
    let mut segment = segment(31, 33, &[]);
    segment.merge_period(&10, &32, &[10, 20, 30]).unwrap();

    let (bounds, data) = segment.get_all_in_range(&-100, &100).unwrap();
    assert_eq!(data, vec![10, 20, 30]);
    assert_eq!(bounds.period_start, 10);
    assert_eq!(bounds.period_end, 33);

    let (bounds, data) = segment.get_all_in_range(&15, &100).unwrap();
    assert_eq!(data, vec![20, 30]);
    assert_eq!(bounds.period_start, 15);
    assert_eq!(bounds.period_end, 33);

    assert!(matches!(
        segment.get_all_in_range(&-100, &-70),
        Err(SeriesError::OutOfRange { .. }),
    ));
    assert!(matches!(
        segment.get_all_in_range(&70, &100),
        Err(SeriesError::OutOfRange { .. }),
    ));
}

#[test]
fn empty_flag_latches_once_populated() {
    let mut segment = segment(10, 20, &[]);
    assert!(segment.empty());

    segment.merge_period(&15, &25, &[]).unwrap();
    assert!(segment.empty());
    assert_eq!(*segment.period_end(), 25);

    segment.merge_period(&20, &30, &[20, 30]).unwrap();
    assert!(!segment.empty());

    segment.merge_period(&25, &35, &[]).unwrap();
    assert!(!segment.empty());
}

#[test]
fn first_and_last_elements() {
    let segment = segment_over(&[10, 20, 30]);
    assert_eq!(segment.first(), Some(10));
    assert_eq!(segment.last(), Some(30));

    let empty = segment_over_empty();
    assert_eq!(empty.first(), None);
    assert_eq!(empty.last(), None);
}

fn segment_over_empty() -> IntSegment {
    segment(10, 20, &[])
}
