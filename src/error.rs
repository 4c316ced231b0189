//! # Error Types
//!
//! This module defines all error types for omreval.
//!
//! Every error carries the file path or case name it concerns, so a line in a
//! batch log is enough to find the offending input.
//!
//! ## Error Kinds
//! - `Parse` - a score document could not be read as MusicXML
//! - `CaseStructure` - a case directory lacks a unique `source*` or `target*` file
//! - `RecognitionFailure` - the recognition tool exited with a non-zero status
//! - `MissingOutput` - the tool ran but left no usable result file
//! - `Timeout` - the tool did not finish within the configured limit
//! - `Io` - filesystem or process-spawn failure
//! - `Config` - invalid command template or configuration file
//!
//! ## Usage
//! ```rust,no_run
//! use omreval::{compare_files, EvalError};
//!
//! match compare_files("out.mxl", "target.mxl") {
//!     Ok(score) => println!("score: {}", score),
//!     Err(EvalError::Parse { path, message }) => {
//!         eprintln!("could not read {}: {}", path.display(), message);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvalError {
    /// The document is not valid (partwise) MusicXML.
    ///
    /// # Example
    /// ```
    /// # use omreval::EvalError;
    /// let err = EvalError::Parse {
    ///     path: "a.xml".into(),
    ///     message: "missing <score-partwise> root".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Parse error in a.xml: missing <score-partwise> root");
    /// ```
    #[error("Parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// The case directory does not hold exactly one source and one target file.
    #[error("Bad case structure in {case}: {message}")]
    CaseStructure { case: String, message: String },

    /// The recognition tool exited unsuccessfully.
    #[error("Recognition failed for {case}: {status}")]
    RecognitionFailure { case: String, status: ExitStatus },

    /// The recognition tool produced no discoverable result file.
    #[error("Missing output for {case}: {message}")]
    MissingOutput { case: String, message: String },

    /// The recognition tool was killed after exceeding its time limit.
    #[error("Recognition timed out for {case} after {seconds}s")]
    Timeout { case: String, seconds: u64 },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid command template or configuration.
    ///
    /// # Example
    /// ```
    /// # use omreval::EvalError;
    /// let err = EvalError::Config("template has no {input} slot".to_string());
    /// assert_eq!(err.to_string(), "Invalid configuration: template has no {input} slot");
    /// ```
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl EvalError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EvalError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        EvalError::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Short, stable name of the error kind, used in logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            EvalError::Parse { .. } => "parse",
            EvalError::CaseStructure { .. } => "case-structure",
            EvalError::RecognitionFailure { .. } => "recognition-failure",
            EvalError::MissingOutput { .. } => "missing-output",
            EvalError::Timeout { .. } => "timeout",
            EvalError::Io { .. } => "io",
            EvalError::Config(_) => "config",
        }
    }

    /// Whether a batch run contains this error to the case that raised it.
    ///
    /// Configuration errors affect every case alike, so they abort the run.
    pub fn is_case_level(&self) -> bool {
        !matches!(self, EvalError::Config(_))
    }
}
