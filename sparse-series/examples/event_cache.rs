//! Caching timestamped events pulled from a slow upstream.
//!
//! The series tracks which time ranges have been fetched, answers reads that
//! fall inside fetched coverage, and names the exact missing range when a
//! read cannot be satisfied yet.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sparse_series::{ArrayStorageFactory, Series, SeriesError};

#[derive(Debug, Clone, PartialEq)]
struct Event {
    at: SystemTime,
    payload: u32,
}

fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

fn event(secs: u64, payload: u32) -> Event {
    Event { at: at(secs), payload }
}

fn main() {
    // Timestamps one nanosecond apart count as touching, so back-to-back
    // fetches coalesce into one covered range.
    let mut cache = Series::with_continuity(
        ArrayStorageFactory,
        |event: &Event| event.at,
        |smaller: &SystemTime, bigger: &SystemTime| {
            *bigger == *smaller + Duration::from_nanos(1)
        },
    );

    // Two fetches land: seconds 1-3 and 5-6.
    cache.add_data(&[event(1, 10), event(2, 20), event(3, 30)]).unwrap();
    cache.add_data(&[event(5, 50), event(6, 60)]).unwrap();

    // A read inside the first fetch succeeds.
    let events = cache.get(&at(1), &at(2)).unwrap();
    println!("cached [1s; 2s]: {events:?}");

    // A read across the hole is refused. The reported bounds are the
    // inclusive frontier of what is already covered: fetching the open
    // interval between them fills the gap.
    let (gap_start, gap_end) = match cache.get(&at(2), &at(6)) {
        Err(SeriesError::MissingPeriod { period_start, period_end }) => {
            println!("must fetch ({period_start:?}; {period_end:?}) first");
            (period_start, period_end)
        }
        other => panic!("expected a missing period, got {other:?}"),
    };
    assert_eq!(gap_start, at(3));
    assert_eq!(gap_end, at(5));

    // The upstream reports nothing between those instants; record the
    // interior as explicitly empty. It touches both fetched ranges, so the
    // whole layout collapses into one covered period.
    cache
        .add_period(
            &(gap_start + Duration::from_nanos(1)),
            &(gap_end - Duration::from_nanos(1)),
            &[],
        )
        .unwrap();

    let events = cache.get(&at(1), &at(6)).unwrap();
    println!("cached [1s; 6s]: {events:?}");
    assert_eq!(events.len(), 5);
}
