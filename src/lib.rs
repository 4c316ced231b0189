pub mod api;
pub mod batch;
pub mod case;
pub mod command;
pub mod config;
pub mod diff;
pub mod document;
pub mod error;
pub mod event;
pub mod musicxml;
pub mod roll;

pub use api::{compare_documents, compare_files, compare_files_detailed};
pub use batch::{list_cases, Batch, BatchReport, CaseOutcome, CaseStatus};
pub use case::{CaseRunner, TestCase};
pub use command::CommandTemplate;
pub use config::Config;
pub use diff::{compare_rolls, diff_measure, diff_rolls, MeasureDiff, RollDiff};
pub use document::{ChordItem, MeasureHandle, NoteItem, RestItem, ScoreDocument};
pub use error::*;
pub use event::{Beats, Event, Pitch, PitchOrRest, Step};
pub use musicxml::MusicXmlScore;
pub use roll::{EventSet, PianoRoll};
