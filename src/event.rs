//! # Event Model
//!
//! The unit of comparison: a `(pitch, offset, duration)` triple.
//!
//! ## Time
//! Offsets and durations are exact fractions of a quarter note
//! ([`Beats`], a reduced `Ratio<i64>`): a quarter note is `1`, an eighth is
//! `1/2`, a triplet eighth is `1/3`. Offsets are measured from the start of
//! the enclosing measure. Exactness matters because events are compared by
//! hash, never by tolerance.
//!
//! ## Pitch
//! A [`Pitch`] is a spelled pitch (`step`, `alter`, `octave`). `C#4` and
//! `Db4` are different pitches here; no enharmonic folding is done.

use std::fmt;

use num_rational::Ratio;

/// Musical time in quarter notes.
pub type Beats = Ratio<i64>;

/// Diatonic step (note letter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Step {
    pub fn from_str(s: &str) -> Option<Step> {
        match s.trim() {
            "C" => Some(Step::C),
            "D" => Some(Step::D),
            "E" => Some(Step::E),
            "F" => Some(Step::F),
            "G" => Some(Step::G),
            "A" => Some(Step::A),
            "B" => Some(Step::B),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Step::C => "C",
            Step::D => "D",
            Step::E => "E",
            Step::F => "F",
            Step::G => "G",
            Step::A => "A",
            Step::B => "B",
        }
    }
}

/// A spelled pitch, e.g. `F#4`.
///
/// `alter` is in semitones (`1` sharp, `-1` flat, `2` double sharp).
/// Octave 4 is the octave starting at middle C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pitch {
    pub step: Step,
    pub alter: i8,
    pub octave: i8,
}

impl Pitch {
    pub fn new(step: Step, alter: i8, octave: i8) -> Self {
        Pitch {
            step,
            alter,
            octave,
        }
    }

    /// Parse scientific pitch notation: `C4`, `F#3`, `Bb2`, `C##5`, `Ebb-1`.
    ///
    /// # Example
    /// ```
    /// use omreval::{Pitch, Step};
    ///
    /// assert_eq!(Pitch::parse("F#3"), Some(Pitch::new(Step::F, 1, 3)));
    /// assert_eq!(Pitch::parse("H2"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Pitch> {
        let s = s.trim();
        let step = Step::from_str(s.get(..1)?)?;
        let rest = &s[1..];
        let accidentals: usize = rest.chars().take_while(|c| *c == '#' || *c == 'b').count();
        let (acc, octave) = rest.split_at(accidentals);
        let sharps = acc.matches('#').count();
        let alter = i8::try_from(sharps).ok()? - i8::try_from(accidentals - sharps).ok()?;
        let octave = octave.parse().ok()?;
        Some(Pitch::new(step, alter, octave))
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.step.as_str())?;
        let acc = if self.alter >= 0 { "#" } else { "b" };
        for _ in 0..self.alter.unsigned_abs() {
            f.write_str(acc)?;
        }
        write!(f, "{}", self.octave)
    }
}

/// What sounds (or doesn't) during an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PitchOrRest {
    Rest,
    Pitch(Pitch),
}

impl fmt::Display for PitchOrRest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PitchOrRest::Rest => f.write_str("rest"),
            PitchOrRest::Pitch(p) => p.fmt(f),
        }
    }
}

/// One sounding or silent occurrence within a measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Event {
    pub pitch: PitchOrRest,
    pub offset: Beats,
    pub duration: Beats,
}

impl Event {
    pub fn note(pitch: Pitch, offset: Beats, duration: Beats) -> Self {
        Event {
            pitch: PitchOrRest::Pitch(pitch),
            offset,
            duration,
        }
    }

    pub fn rest(offset: Beats, duration: Beats) -> Self {
        Event {
            pitch: PitchOrRest::Rest,
            offset,
            duration,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.pitch, self.offset, self.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn q(n: i64, d: i64) -> Beats {
        Beats::new(n, d)
    }

    #[test]
    fn test_pitch_display() {
        assert_eq!(Pitch::new(Step::C, 0, 4).to_string(), "C4");
        assert_eq!(Pitch::new(Step::F, 1, 3).to_string(), "F#3");
        assert_eq!(Pitch::new(Step::B, -2, 2).to_string(), "Bbb2");
    }

    #[test]
    fn test_pitch_parse() {
        assert_eq!(Pitch::parse("C##5"), Some(Pitch::new(Step::C, 2, 5)));
        assert_eq!(Pitch::parse("Eb-1"), Some(Pitch::new(Step::E, -1, -1)));
        assert_eq!(Pitch::parse("C"), None);
        assert_eq!(Pitch::parse(""), None);
        assert_eq!(Pitch::parse(&format!("C{}4", "#".repeat(200))), None);
        assert_eq!(Pitch::parse(&format!("C{}4", "b".repeat(128))), None);
    }

    #[test]
    fn test_equal_fractions_hash_equal() {
        // 2/4 and 1/2 of a quarter are the same offset
        let c4 = Pitch::new(Step::C, 0, 4);
        let a = Event::note(c4, q(2, 4), q(1, 1));
        let b = Event::note(c4, q(1, 2), q(4, 4));
        assert_eq!(a, b);

        let set: HashSet<Event> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_rest_differs_from_note() {
        let c4 = Pitch::new(Step::C, 0, 4);
        assert_ne!(Event::rest(q(0, 1), q(1, 1)), Event::note(c4, q(0, 1), q(1, 1)));
    }

    #[test]
    fn test_enharmonics_are_distinct() {
        assert_ne!(Pitch::new(Step::C, 1, 4), Pitch::new(Step::D, -1, 4));
    }

    #[test]
    fn test_event_display() {
        let e = Event::note(Pitch::new(Step::D, 0, 4), q(3, 2), q(1, 2));
        assert_eq!(e.to_string(), "(D4, 3/2, 1/2)");
        assert_eq!(Event::rest(q(0, 1), q(4, 1)).to_string(), "(rest, 0, 4)");
    }
}
