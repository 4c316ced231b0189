//! # Batch Aggregator
//!
//! Runs every case of a corpus and sums the scores.
//!
//! A failing case does not stop the batch: its error is logged with the case
//! name and kind, recorded in the report, and left out of the total. Only a
//! problem with the corpus itself (it cannot be listed) or a configuration
//! error aborts the run. A report with failures is never "clean", so a
//! partial run cannot pass for a complete one.
//!
//! Cases run one at a time unless [`Batch::with_jobs`] asks for more, in
//! which case at most that many recognizer processes run at once. Outcomes
//! are always reported in corpus order (case directories sorted by name).

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::case::{case_name, CaseRunner};
use crate::error::EvalError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CaseStatus {
    Scored { score: i64 },
    Failed { kind: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseOutcome {
    pub name: String,
    #[serde(flatten)]
    pub status: CaseStatus,
}

impl CaseOutcome {
    pub fn score(&self) -> Option<i64> {
        match self.status {
            CaseStatus::Scored { score } => Some(score),
            CaseStatus::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub cases: Vec<CaseOutcome>,
    /// Sum of the scores of evaluated cases
    pub total: i64,
    pub evaluated: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn from_outcomes(cases: Vec<CaseOutcome>) -> Self {
        let total = cases.iter().filter_map(CaseOutcome::score).sum();
        let evaluated = cases.iter().filter(|c| c.score().is_some()).count();
        let failed = cases.len() - evaluated;
        BatchReport {
            cases,
            total,
            evaluated,
            failed,
        }
    }

    /// True when every case was evaluated
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseOutcome> {
        self.cases.iter().filter(|c| c.score().is_none())
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for case in &self.cases {
            match &case.status {
                CaseStatus::Scored { score } => writeln!(f, "  {:<32} {:>8}", case.name, score)?,
                CaseStatus::Failed { kind, message } => {
                    writeln!(f, "  {:<32} {:>8}  {}", case.name, kind, message)?
                }
            }
        }
        write!(
            f,
            "total: {}  ({} evaluated, {} failed)",
            self.total, self.evaluated, self.failed
        )
    }
}

/// Immediate subdirectories of `corpus`, sorted by name
pub fn list_cases(corpus: &Path) -> Result<Vec<PathBuf>, EvalError> {
    let mut cases = Vec::new();
    for entry in fs::read_dir(corpus).map_err(|e| EvalError::io(corpus, e))? {
        let entry = entry.map_err(|e| EvalError::io(corpus, e))?;
        let path = entry.path();
        if path.is_dir() {
            cases.push(path);
        }
    }
    cases.sort();
    Ok(cases)
}

#[derive(Debug, Clone)]
pub struct Batch {
    runner: CaseRunner,
    jobs: usize,
}

impl Batch {
    pub fn new(runner: CaseRunner) -> Self {
        Batch { runner, jobs: 1 }
    }

    /// Run up to `jobs` cases at once. Zero is treated as one.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Evaluate every case under `corpus`.
    pub fn run(&self, corpus: &Path) -> Result<BatchReport, EvalError> {
        let cases = list_cases(corpus)?;
        info!(
            corpus = %corpus.display(),
            cases = cases.len(),
            jobs = self.jobs,
            "starting batch"
        );

        let outcomes = if self.jobs == 1 {
            cases
                .iter()
                .map(|dir| self.run_case(dir))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.jobs)
                .thread_name(|i| format!("omreval-case-{}", i))
                .build()
                .map_err(|e| EvalError::Config(format!("cannot start worker pool: {}", e)))?;
            pool.install(|| {
                cases
                    .par_iter()
                    .map(|dir| self.run_case(dir))
                    .collect::<Result<Vec<_>, _>>()
            })?
        };

        let report = BatchReport::from_outcomes(outcomes);
        if report.is_clean() {
            info!(total = report.total, evaluated = report.evaluated, "batch complete");
        } else {
            warn!(
                total = report.total,
                evaluated = report.evaluated,
                failed = report.failed,
                "batch complete with failures"
            );
        }
        Ok(report)
    }

    fn run_case(&self, dir: &Path) -> Result<CaseOutcome, EvalError> {
        let name = case_name(dir);
        let span = info_span!("case", case = %name);
        let _guard = span.enter();

        let status = match self.runner.run(dir) {
            Ok(score) => {
                debug!(score, "case scored");
                CaseStatus::Scored { score }
            }
            Err(e) if e.is_case_level() => {
                warn!(kind = e.kind(), error = %e, "case failed");
                CaseStatus::Failed {
                    kind: e.kind(),
                    message: e.to_string(),
                }
            }
            Err(e) => return Err(e),
        };
        Ok(CaseOutcome { name, status })
    }
}
