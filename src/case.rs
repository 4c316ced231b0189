//! # Case Runner
//!
//! Evaluates one test case: runs the recognition tool on the case's source
//! file and scores its output against the case's target file.
//!
//! ## Case Layout
//! ```text
//! corpus/
//!   waltz/
//!     source.png     <- handed to the recognition tool
//!     target.mxl     <- verified reference score
//! ```
//! Exactly one file must start with each prefix (`source`, `target` by
//! default). Anything else in the directory is ignored.
//!
//! ## Steps
//! 1. Find the source and target files ([`TestCase::discover`])
//! 2. Create a private temporary output directory
//! 3. Run the command template with `{output}` and `{input}` filled in
//! 4. Find the single result file (`.mxl` by default) the tool left there
//! 5. Score it against the target (result on the left, target on the right)
//!
//! The temporary directory is removed on every exit path.
//!
//! ## Failures
//! A broken result file and a broken target file both surface as `parse`
//! (or `io`) errors. The error's path tells them apart: a result file lives
//! under the temporary output directory, the target under the case
//! directory.
//!
//! On Unix the tool runs in its own process group. When the time limit
//! expires the whole group is killed, so launcher scripts cannot leave a
//! recognizer running behind them.

use std::fs;
use std::path::{Path, PathBuf};
use std::io;
use std::process::{Child, ExitStatus, Stdio};
use std::time::Duration;

use tracing::{debug, warn};
use wait_timeout::ChildExt;
use walkdir::WalkDir;

use crate::api::compare_files_detailed;
use crate::command::CommandTemplate;
use crate::diff::RollDiff;
use crate::error::EvalError;

/// A case directory with its source and target files resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub dir: PathBuf,
    pub source: PathBuf,
    pub target: PathBuf,
}

impl TestCase {
    /// Resolve the unique `source_prefix*` and `target_prefix*` files of a
    /// case directory.
    pub fn discover(dir: &Path, source_prefix: &str, target_prefix: &str) -> Result<Self, EvalError> {
        let name = case_name(dir);

        let mut files: Vec<(String, PathBuf)> = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| EvalError::io(dir, e))? {
            let entry = entry.map_err(|e| EvalError::io(dir, e))?;
            let path = entry.path();
            if path.is_file() {
                files.push((entry.file_name().to_string_lossy().into_owned(), path));
            }
        }
        files.sort();

        let source = unique_match(&files, source_prefix, &name)?;
        let target = unique_match(&files, target_prefix, &name)?;

        Ok(TestCase {
            name,
            dir: dir.to_path_buf(),
            source,
            target,
        })
    }
}

pub(crate) fn case_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}

fn unique_match(files: &[(String, PathBuf)], prefix: &str, case: &str) -> Result<PathBuf, EvalError> {
    let matches: Vec<&(String, PathBuf)> = files
        .iter()
        .filter(|(name, _)| name.starts_with(prefix))
        .collect();

    match matches.as_slice() {
        [(_, path)] => Ok(path.clone()),
        [] => Err(EvalError::CaseStructure {
            case: case.to_string(),
            message: format!("no file starting with '{}'", prefix),
        }),
        many => Err(EvalError::CaseStructure {
            case: case.to_string(),
            message: format!(
                "{} files start with '{}': {}",
                many.len(),
                prefix,
                many.iter()
                    .map(|(name, _)| name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }),
    }
}

/// Find the one file with `extension` anywhere under `dir`
fn find_output(dir: &Path, extension: &str, case: &str) -> Result<PathBuf, EvalError> {
    let mut found: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map_or(false, |ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
        })
        .map(|e| e.into_path())
        .collect();

    match found.len() {
        1 => Ok(found.remove(0)),
        0 => Err(EvalError::MissingOutput {
            case: case.to_string(),
            message: format!("no .{} file produced", extension),
        }),
        n => Err(EvalError::MissingOutput {
            case: case.to_string(),
            message: format!("{} .{} files produced, expected one", n, extension),
        }),
    }
}

/// Runs the recognition tool on test cases and scores the results.
#[derive(Debug, Clone)]
pub struct CaseRunner {
    command: CommandTemplate,
    timeout: Option<Duration>,
    working_dir: Option<PathBuf>,
    source_prefix: String,
    target_prefix: String,
    output_extension: String,
    quiet: bool,
}

impl CaseRunner {
    pub fn new(command: CommandTemplate) -> Self {
        CaseRunner {
            command,
            timeout: None,
            working_dir: None,
            source_prefix: "source".to_string(),
            target_prefix: "target".to_string(),
            output_extension: "mxl".to_string(),
            quiet: false,
        }
    }

    /// Kill the tool and fail the case if it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_prefixes(mut self, source: &str, target: &str) -> Self {
        self.source_prefix = source.to_string();
        self.target_prefix = target.to_string();
        self
    }

    pub fn with_output_extension(mut self, extension: &str) -> Self {
        self.output_extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn command(&self) -> &CommandTemplate {
        &self.command
    }

    /// Evaluate the case in `dir` and return its score.
    pub fn run(&self, dir: &Path) -> Result<i64, EvalError> {
        self.run_detailed(dir).map(|diff| diff.score())
    }

    /// Evaluate the case in `dir`, keeping the per-measure breakdown.
    pub fn run_detailed(&self, dir: &Path) -> Result<RollDiff, EvalError> {
        let case = TestCase::discover(dir, &self.source_prefix, &self.target_prefix)?;
        let input = fs::canonicalize(&case.source).map_err(|e| EvalError::io(&case.source, e))?;

        let output_dir = tempfile::Builder::new()
            .prefix("omreval-")
            .tempdir()
            .map_err(|e| EvalError::io(std::env::temp_dir(), e))?;

        let status = self.recognize(&case.name, output_dir.path(), &input)?;
        if !status.success() {
            return Err(EvalError::RecognitionFailure {
                case: case.name,
                status,
            });
        }

        let produced = find_output(output_dir.path(), &self.output_extension, &case.name)?;
        debug!(produced = %produced.display(), "found recognizer output");
        let diff = compare_files_detailed(&produced, &case.target)?;

        if let Err(e) = output_dir.close() {
            warn!(case = %case.name, error = %e, "could not remove temporary output directory");
        }
        Ok(diff)
    }

    fn recognize(&self, case: &str, output_dir: &Path, input: &Path) -> Result<ExitStatus, EvalError> {
        let mut cmd = self.command.command(output_dir, input);
        cmd.stdin(Stdio::null());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        if self.quiet {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        debug!(argv = ?self.command.argv(output_dir, input), "running recognizer");
        let mut child = cmd
            .spawn()
            .map_err(|e| EvalError::io(self.command.program(), e))?;

        let Some(limit) = self.timeout else {
            return child
                .wait()
                .map_err(|e| EvalError::io(self.command.program(), e));
        };

        match child
            .wait_timeout(limit)
            .map_err(|e| EvalError::io(self.command.program(), e))?
        {
            Some(status) => Ok(status),
            None => {
                if let Err(e) = kill_process_group(&mut child) {
                    warn!(case, error = %e, "could not kill recognizer");
                }
                if let Err(e) = child.wait() {
                    warn!(case, error = %e, "could not reap recognizer");
                }
                Err(EvalError::Timeout {
                    case: case.to_string(),
                    seconds: limit.as_secs(),
                })
            }
        }
    }
}

/// Kill the child and everything it started in its process group.
#[cfg(unix)]
fn kill_process_group(child: &mut Child) -> io::Result<()> {
    let Ok(pgid) = libc::pid_t::try_from(child.id()) else {
        return child.kill();
    };
    // SAFETY: killpg only sends a signal; the group was created at spawn.
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } == 0 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        Some(libc::ESRCH) => Ok(()),
        _ => child.kill().or(Err(err)),
    }
}

#[cfg(not(unix))]
fn kill_process_group(child: &mut Child) -> io::Result<()> {
    child.kill()
}

impl Default for CaseRunner {
    fn default() -> Self {
        CaseRunner::new(CommandTemplate::default())
    }
}
