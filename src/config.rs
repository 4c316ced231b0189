//! # Configuration
//!
//! Batch settings, loaded from a YAML file and overridden from the command
//! line.
//!
//! ## File Format
//! ```yaml
//! command: audiveris -batch -export -output {output} {input}
//! timeout-secs: 600
//! jobs: 2
//! source-prefix: source
//! target-prefix: target
//! output-extension: mxl
//! working-dir: /opt/audiveris
//! quiet: true
//! ```
//! Every key is optional; missing keys take the defaults shown by
//! [`Config::default`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::case::CaseRunner;
use crate::command::CommandTemplate;
use crate::error::EvalError;

/// Raw file contents, before validation
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawConfig {
    command: Option<String>,
    timeout_secs: Option<u64>,
    jobs: Option<usize>,
    source_prefix: Option<String>,
    target_prefix: Option<String>,
    output_extension: Option<String>,
    working_dir: Option<PathBuf>,
    quiet: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub command: CommandTemplate,
    pub timeout: Option<Duration>,
    pub jobs: usize,
    pub source_prefix: String,
    pub target_prefix: String,
    /// Extension of the recognition tool's result file, without the dot
    pub output_extension: String,
    pub working_dir: Option<PathBuf>,
    /// Discard the tool's stdout/stderr instead of passing them through
    pub quiet: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            command: CommandTemplate::default(),
            timeout: None,
            jobs: 1,
            source_prefix: "source".to_string(),
            target_prefix: "target".to_string(),
            output_extension: "mxl".to_string(),
            working_dir: None,
            quiet: false,
        }
    }
}

impl Config {
    /// Parse YAML configuration text.
    ///
    /// # Example
    /// ```
    /// use omreval::Config;
    /// use std::time::Duration;
    ///
    /// let config = Config::from_yaml("timeout-secs: 30\njobs: 4\n")?;
    /// assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    /// assert_eq!(config.jobs, 4);
    /// assert_eq!(config.source_prefix, "source");
    /// # Ok::<(), omreval::EvalError>(())
    /// ```
    pub fn from_yaml(content: &str) -> Result<Self, EvalError> {
        let raw: RawConfig = if content.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| EvalError::Config(e.to_string()))?
        };
        let defaults = Config::default();

        let command = match raw.command {
            Some(template) => CommandTemplate::parse(&template)?,
            None => defaults.command,
        };
        let jobs = raw.jobs.unwrap_or(defaults.jobs);
        if jobs == 0 {
            return Err(EvalError::Config("jobs must be at least 1".to_string()));
        }
        if raw.timeout_secs == Some(0) {
            return Err(EvalError::Config("timeout-secs must be at least 1".to_string()));
        }
        let output_extension = raw
            .output_extension
            .map(|ext| ext.trim_start_matches('.').to_string())
            .unwrap_or(defaults.output_extension);
        if output_extension.is_empty() {
            return Err(EvalError::Config("output-extension is empty".to_string()));
        }
        let source_prefix = raw.source_prefix.unwrap_or(defaults.source_prefix);
        let target_prefix = raw.target_prefix.unwrap_or(defaults.target_prefix);
        if source_prefix.is_empty() || target_prefix.is_empty() {
            return Err(EvalError::Config("file prefixes must not be empty".to_string()));
        }

        Ok(Config {
            command,
            timeout: raw.timeout_secs.map(Duration::from_secs),
            jobs,
            source_prefix,
            target_prefix,
            output_extension,
            working_dir: raw.working_dir,
            quiet: raw.quiet.unwrap_or(defaults.quiet),
        })
    }

    pub fn load(path: &Path) -> Result<Self, EvalError> {
        let content = fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
        Config::from_yaml(&content)
    }

    /// The case runner these settings describe
    pub fn runner(&self) -> CaseRunner {
        let mut runner = CaseRunner::new(self.command.clone())
            .with_prefixes(&self.source_prefix, &self.target_prefix)
            .with_output_extension(&self.output_extension)
            .quiet(self.quiet);
        if let Some(timeout) = self.timeout {
            runner = runner.with_timeout(timeout);
        }
        if let Some(dir) = &self.working_dir {
            runner = runner.with_working_dir(dir);
        }
        runner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_default() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn test_full_file() {
        let config = Config::from_yaml(
            r#"
command: omr --out {output} {input}
timeout-secs: 90
jobs: 3
source-prefix: input
target-prefix: truth
output-extension: .musicxml
working-dir: /opt/omr
quiet: true
"#,
        )
        .unwrap();
        assert_eq!(config.command.to_string(), "omr --out {output} {input}");
        assert_eq!(config.timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.jobs, 3);
        assert_eq!(config.source_prefix, "input");
        assert_eq!(config.target_prefix, "truth");
        assert_eq!(config.output_extension, "musicxml");
        assert_eq!(config.working_dir, Some(PathBuf::from("/opt/omr")));
        assert!(config.quiet);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            Config::from_yaml("jobs: 0"),
            Err(EvalError::Config(_))
        ));
        assert!(Config::from_yaml("command: omr {input}").is_err());
        assert!(Config::from_yaml("timeout: 5").is_err());
        assert!(matches!(
            Config::from_yaml("timeout-secs: 0"),
            Err(EvalError::Config(_))
        ));
        assert!(Config::from_yaml("jobs: [1, 2]").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert_eq!(err.kind(), "io");
    }
}
