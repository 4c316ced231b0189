//! # Public API
//!
//! Entry points for comparing score files outside a batch run.
//!
//! - [`compare_files()`] - score one file against another
//! - [`compare_files_detailed()`] - same, with the per-measure breakdown
//! - [`compare_documents()`] - score two already-parsed documents
//!
//! ## Typical Usage
//!
//! ```rust,no_run
//! use omreval::compare_files;
//!
//! let score = compare_files("out/book.mxl", "corpus/waltz/target.mxl")?;
//! println!("score: {}", score);
//! # Ok::<(), omreval::EvalError>(())
//! ```
//!
//! Errors are returned as they happen; nothing here retries or recovers.

use std::path::Path;

use crate::diff::{compare_rolls, RollDiff};
use crate::document::ScoreDocument;
use crate::error::EvalError;
use crate::musicxml::MusicXmlScore;
use crate::roll::PianoRoll;

/// Score `left` against `right`.
///
/// Both files may be plain or compressed MusicXML.
///
/// # Pipeline
/// 1. Parse both files
/// 2. Build a piano-roll for each
/// 3. Sum per-measure scores
///
/// # Errors
/// [`EvalError::Parse`] if either file is not readable MusicXML,
/// [`EvalError::Io`] if either cannot be opened.
pub fn compare_files(left: impl AsRef<Path>, right: impl AsRef<Path>) -> Result<i64, EvalError> {
    compare_files_detailed(left.as_ref(), right.as_ref()).map(|diff| diff.score())
}

/// Like [`compare_files`], but returns the per-measure counts.
pub fn compare_files_detailed(left: &Path, right: &Path) -> Result<RollDiff, EvalError> {
    let left = MusicXmlScore::read(left)?;
    let right = MusicXmlScore::read(right)?;
    Ok(compare_documents(&left, &right))
}

/// Compare two parsed documents measure by measure.
///
/// # Example
/// ```rust
/// use omreval::{compare_documents, MusicXmlScore};
///
/// let xml = r#"<score-partwise><part id="P1"><measure number="1">
///   <note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration></note>
///   <note><pitch><step>E</step><octave>4</octave></pitch><duration>1</duration></note>
/// </measure></part></score-partwise>"#;
/// let score = MusicXmlScore::parse(xml)?;
/// assert_eq!(compare_documents(&score, &score).score(), 2);
/// # Ok::<(), omreval::EvalError>(())
/// ```
pub fn compare_documents<L: ScoreDocument, R: ScoreDocument>(left: &L, right: &R) -> RollDiff {
    compare_rolls(&PianoRoll::from_document(left), &PianoRoll::from_document(right))
}
