// src/schedule.rs
use crate::calendar::{compare, DayToken, CANONICAL_ORDER};
use crate::exercise::ExerciseRecord;
use std::collections::BTreeMap;

/// Records scheduled on `day`, in insertion order.
#[must_use]
pub fn for_day(all: &[ExerciseRecord], day: DayToken) -> Vec<&ExerciseRecord> {
    all.iter().filter(|record| record.is_scheduled_on(day)).collect()
}

/// Position in `all` of the `index`-th record of `for_day(all, day)`.
/// Walks the same filter as [`for_day`], so indices shown from that view resolve
/// to the record the user saw.
#[must_use]
pub fn global_index_for_day(all: &[ExerciseRecord], day: DayToken, index: usize) -> Option<usize> {
    all.iter()
        .enumerate()
        .filter(|(_, record)| record.is_scheduled_on(day))
        .nth(index)
        .map(|(position, _)| position)
}

/// Weekly view: every day of the week, each with its scheduled records.
/// A record with three days shows up in three groups.
#[must_use]
pub fn group_by_day(all: &[ExerciseRecord]) -> BTreeMap<DayToken, Vec<&ExerciseRecord>> {
    CANONICAL_ORDER
        .iter()
        .map(|day| (*day, for_day(all, *day)))
        .collect()
}

#[must_use]
pub fn sort_days_for_display<I>(days: I) -> Vec<DayToken>
where
    I: IntoIterator<Item = DayToken>,
{
    let mut sorted: Vec<DayToken> = days.into_iter().collect();
    sorted.sort_by(|a, b| compare(*a, *b));
    sorted.dedup();
    sorted
}
