//! # Score Diff
//!
//! Compares two piano-rolls measure by measure.
//!
//! ## Scoring
//! For one measure with event sets `A` (left) and `B` (right):
//!
//! ```text
//! score = |A ∩ B| - |A − B| - |B − A|
//! ```
//!
//! An exact match earns a point; an omission or an insertion costs one. The
//! formula is symmetric, so neither side is privileged as "truth". There is
//! no partial credit: a note a sixteenth early counts as one omission plus
//! one insertion.
//!
//! ## Alignment
//! Measures are paired by number. A measure found on only one side is
//! compared against the empty set and contributes `-|events|`.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::roll::{EventSet, PianoRoll};

/// Per-measure breakdown of a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MeasureDiff {
    pub measure: u32,
    pub common: usize,
    pub left_only: usize,
    pub right_only: usize,
}

impl MeasureDiff {
    pub fn score(&self) -> i64 {
        self.common as i64 - self.left_only as i64 - self.right_only as i64
    }

    pub fn is_exact(&self) -> bool {
        self.left_only == 0 && self.right_only == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RollDiff {
    /// In ascending measure order
    pub measures: Vec<MeasureDiff>,
}

impl RollDiff {
    pub fn score(&self) -> i64 {
        self.measures.iter().map(MeasureDiff::score).sum()
    }
}

fn count_measure(measure: u32, left: &EventSet, right: &EventSet) -> MeasureDiff {
    let common = left.intersection(right).count();
    MeasureDiff {
        measure,
        common,
        left_only: left.len() - common,
        right_only: right.len() - common,
    }
}

/// Score one measure's event sets.
///
/// # Example
/// ```
/// use omreval::{diff_measure, Beats, Event, EventSet, Pitch};
///
/// let beat = Beats::from_integer;
/// let c4 = Event::note(Pitch::parse("C4").unwrap(), beat(0), beat(1));
/// let d4 = Event::note(Pitch::parse("D4").unwrap(), beat(1), beat(1));
/// let left: EventSet = [c4, d4].into_iter().collect();
/// let right: EventSet = [c4].into_iter().collect();
/// assert_eq!(diff_measure(&left, &right), 0);
/// ```
pub fn diff_measure(left: &EventSet, right: &EventSet) -> i64 {
    count_measure(0, left, right).score()
}

/// Pair up measures by number and count matches in each.
pub fn compare_rolls(left: &PianoRoll, right: &PianoRoll) -> RollDiff {
    let empty = EventSet::new();
    let numbers: BTreeSet<u32> = left.measure_numbers().chain(right.measure_numbers()).collect();

    let measures = numbers
        .into_iter()
        .map(|n| {
            count_measure(
                n,
                left.get(n).unwrap_or(&empty),
                right.get(n).unwrap_or(&empty),
            )
        })
        .collect();

    RollDiff { measures }
}

/// Total score of two rolls: the sum of per-measure scores.
pub fn diff_rolls(left: &PianoRoll, right: &PianoRoll) -> i64 {
    compare_rolls(left, right).score()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Beats, Event, Pitch};
    use pretty_assertions::assert_eq;

    fn ev(pitch: &str, offset: i64, duration: i64) -> Event {
        Event::note(
            Pitch::parse(pitch).unwrap(),
            Beats::from_integer(offset),
            Beats::from_integer(duration),
        )
    }

    fn set(events: &[Event]) -> EventSet {
        events.iter().copied().collect()
    }

    fn roll(measures: Vec<(u32, Vec<Event>)>) -> PianoRoll {
        measures
            .into_iter()
            .map(|(n, events)| (n, set(&events)))
            .collect()
    }

    #[test]
    fn test_one_substitution_scores_minus_one() {
        let left = roll(vec![(1, vec![ev("C4", 0, 1), ev("D4", 1, 1)])]);
        let right = roll(vec![(1, vec![ev("C4", 0, 1), ev("E4", 1, 1)])]);

        let diff = compare_rolls(&left, &right);
        assert_eq!(
            diff.measures,
            vec![MeasureDiff {
                measure: 1,
                common: 1,
                left_only: 1,
                right_only: 1
            }]
        );
        assert_eq!(diff.score(), -1);
    }

    #[test]
    fn test_missing_measure_is_penalized() {
        let a = ev("A4", 0, 4);
        let b = ev("B4", 0, 4);
        let left = roll(vec![(1, vec![a]), (2, vec![b])]);
        let right = roll(vec![(1, vec![a])]);
        assert_eq!(diff_rolls(&left, &right), 0);
        assert_eq!(diff_rolls(&right, &left), 0);
    }

    #[test]
    fn test_against_empty_is_negative_size() {
        let a = set(&[ev("C4", 0, 1), ev("E4", 0, 1), ev("G4", 0, 1)]);
        let empty = EventSet::new();
        assert_eq!(diff_measure(&a, &empty), -3);
        assert_eq!(diff_measure(&empty, &a), -3);
        assert_eq!(diff_measure(&empty, &empty), 0);
    }

    #[test]
    fn test_symmetric() {
        let a = set(&[ev("C4", 0, 1), ev("D4", 1, 1), ev("E4", 2, 1)]);
        let b = set(&[ev("C4", 0, 1), ev("F4", 1, 1)]);
        assert_eq!(diff_measure(&a, &b), diff_measure(&b, &a));
        assert_eq!(diff_measure(&a, &b), 1 - 2 - 1);
    }

    #[test]
    fn test_self_comparison_counts_every_event() {
        let r = roll(vec![
            (0, vec![ev("G4", 3, 1)]),
            (1, vec![ev("C4", 0, 2), ev("E4", 0, 2)]),
            (4, vec![]),
        ]);
        let diff = compare_rolls(&r, &r);
        assert!(diff.measures.iter().all(MeasureDiff::is_exact));
        assert_eq!(diff.score(), r.event_count() as i64);
        assert_eq!(diff.score(), 3);
    }

    #[test]
    fn test_measures_in_ascending_order() {
        let left = roll(vec![(10, vec![ev("C4", 0, 1)]), (2, vec![])]);
        let right = roll(vec![(7, vec![ev("C4", 0, 1)])]);
        let order: Vec<u32> = compare_rolls(&left, &right)
            .measures
            .iter()
            .map(|m| m.measure)
            .collect();
        assert_eq!(order, vec![2, 7, 10]);
    }

    #[test]
    fn test_near_miss_gets_no_credit() {
        let early = Event::note(
            Pitch::parse("C4").unwrap(),
            Beats::new(3, 4),
            Beats::from_integer(1),
        );
        let a = set(&[early]);
        let b = set(&[ev("C4", 1, 1)]);
        assert_eq!(diff_measure(&a, &b), -2);
    }
}
