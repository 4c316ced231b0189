//! Traversal interface between notation readers and the piano-roll builder.
//!
//! A reader exposes its parsed score as a sequence of measures; each measure
//! yields its rests, single notes and chords with offsets already resolved
//! relative to the measure start. Nested voices and staves are flattened by
//! the reader, so the builder never sees them.

use crate::event::{Beats, Pitch};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestItem {
    pub offset: Beats,
    pub duration: Beats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteItem {
    pub pitch: Pitch,
    pub offset: Beats,
    pub duration: Beats,
}

/// Two or more pitches struck together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChordItem {
    pub pitches: Vec<Pitch>,
    pub offset: Beats,
    pub duration: Beats,
}

pub trait MeasureHandle {
    /// Measure number as assigned by the document
    fn number(&self) -> u32;
    fn rests(&self) -> &[RestItem];
    fn notes(&self) -> &[NoteItem];
    fn chords(&self) -> &[ChordItem];
}

pub trait ScoreDocument {
    type Measure: MeasureHandle;

    /// Measures in document order. The same number may appear more than once
    /// (one measure per part).
    fn measures(&self) -> &[Self::Measure];
}
