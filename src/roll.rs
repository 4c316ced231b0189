//! Piano-roll construction.
//!
//! A [`PianoRoll`] maps each measure number to the set of events anywhere in
//! that measure. Rests become rest events; chords are flattened into one
//! event per pitch. Identical events collapse, since the roll stores sets.

use std::collections::{BTreeMap, HashSet};

use crate::document::{MeasureHandle, ScoreDocument};
use crate::event::Event;

pub type EventSet = HashSet<Event>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PianoRoll {
    measures: BTreeMap<u32, EventSet>,
}

impl PianoRoll {
    /// Build the roll for a parsed document.
    ///
    /// Every measure gets an entry, even an empty one. Measures sharing a
    /// number (one per part) are merged.
    pub fn from_document<D: ScoreDocument>(doc: &D) -> Self {
        let mut measures: BTreeMap<u32, EventSet> = BTreeMap::new();

        for measure in doc.measures() {
            let events = measures.entry(measure.number()).or_default();

            for rest in measure.rests() {
                events.insert(Event::rest(rest.offset, rest.duration));
            }
            for note in measure.notes() {
                events.insert(Event::note(note.pitch, note.offset, note.duration));
            }
            for chord in measure.chords() {
                events.extend(
                    chord
                        .pitches
                        .iter()
                        .map(|&pitch| Event::note(pitch, chord.offset, chord.duration)),
                );
            }
        }

        PianoRoll { measures }
    }

    pub fn get(&self, measure: u32) -> Option<&EventSet> {
        self.measures.get(&measure)
    }

    /// Measure numbers in ascending order
    pub fn measure_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.measures.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.measures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measures.is_empty()
    }

    /// Total number of distinct events across all measures
    pub fn event_count(&self) -> usize {
        self.measures.values().map(HashSet::len).sum()
    }
}

impl FromIterator<(u32, EventSet)> for PianoRoll {
    fn from_iter<I: IntoIterator<Item = (u32, EventSet)>>(iter: I) -> Self {
        PianoRoll {
            measures: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ChordItem, NoteItem, RestItem};
    use crate::event::{Beats, Pitch};

    struct TestMeasure {
        number: u32,
        rests: Vec<RestItem>,
        notes: Vec<NoteItem>,
        chords: Vec<ChordItem>,
    }

    impl MeasureHandle for TestMeasure {
        fn number(&self) -> u32 {
            self.number
        }
        fn rests(&self) -> &[RestItem] {
            &self.rests
        }
        fn notes(&self) -> &[NoteItem] {
            &self.notes
        }
        fn chords(&self) -> &[ChordItem] {
            &self.chords
        }
    }

    struct TestDoc(Vec<TestMeasure>);

    impl ScoreDocument for TestDoc {
        type Measure = TestMeasure;
        fn measures(&self) -> &[TestMeasure] {
            &self.0
        }
    }

    fn empty(number: u32) -> TestMeasure {
        TestMeasure {
            number,
            rests: vec![],
            notes: vec![],
            chords: vec![],
        }
    }

    fn beat(n: i64) -> Beats {
        Beats::from_integer(n)
    }

    fn p(s: &str) -> Pitch {
        Pitch::parse(s).unwrap()
    }

    #[test]
    fn test_chords_flatten_to_pitches() {
        let mut m = empty(1);
        m.chords.push(ChordItem {
            pitches: vec![p("C4"), p("E4"), p("G4")],
            offset: beat(0),
            duration: beat(2),
        });
        m.rests.push(RestItem {
            offset: beat(2),
            duration: beat(2),
        });
        let roll = PianoRoll::from_document(&TestDoc(vec![m]));

        let events = roll.get(1).unwrap();
        assert_eq!(events.len(), 4);
        assert!(events.contains(&Event::note(p("E4"), beat(0), beat(2))));
        assert!(events.contains(&Event::rest(beat(2), beat(2))));
    }

    #[test]
    fn test_empty_measure_is_present() {
        let roll = PianoRoll::from_document(&TestDoc(vec![empty(5), empty(7)]));
        assert_eq!(roll.get(5).map(HashSet::len), Some(0));
        assert_eq!(roll.measure_numbers().collect::<Vec<_>>(), vec![5, 7]);
        assert!(roll.get(6).is_none());
    }

    #[test]
    fn test_duplicates_collapse() {
        let mut m = empty(1);
        let note = NoteItem {
            pitch: p("A4"),
            offset: beat(1),
            duration: beat(1),
        };
        m.notes.push(note.clone());
        m.notes.push(note);
        let roll = PianoRoll::from_document(&TestDoc(vec![m]));
        assert_eq!(roll.event_count(), 1);
    }

    #[test]
    fn test_parts_merge_by_number() {
        let mut upper = empty(1);
        upper.notes.push(NoteItem {
            pitch: p("C5"),
            offset: beat(0),
            duration: beat(4),
        });
        let mut lower = empty(1);
        lower.notes.push(NoteItem {
            pitch: p("C3"),
            offset: beat(0),
            duration: beat(4),
        });
        let roll = PianoRoll::from_document(&TestDoc(vec![upper, lower]));
        assert_eq!(roll.len(), 1);
        assert_eq!(roll.get(1).unwrap().len(), 2);
    }
}
