//! Recognition command templates.
//!
//! A template is a program plus arguments, where each argument is either
//! literal text or a slot for the output directory or the input file. Slots
//! are filled per argument, so a substituted path is always exactly one
//! argument no matter what characters it contains.
//!
//! Templates are usually written as one string, e.g.
//! `audiveris -batch -export -output {output} {input}`. That string is split
//! on whitespace once, when the template is parsed; a token that contains a
//! slot marker among other text (`--out={output}`) keeps its surrounding
//! text.

use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::process::Command;

use crate::error::EvalError;

pub const OUTPUT_SLOT: &str = "{output}";
pub const INPUT_SLOT: &str = "{input}";

/// Default invocation of the Audiveris command-line interface
pub const DEFAULT_TEMPLATE: &str = "audiveris -batch -export -output {output} {input}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    OutputDir,
    Input,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Literal(String),
    /// `prefix` + slot value + `suffix`
    Slot {
        slot: Slot,
        prefix: String,
        suffix: String,
    },
}

impl Arg {
    fn parse(token: &str) -> Result<Arg, EvalError> {
        let found = [(OUTPUT_SLOT, Slot::OutputDir), (INPUT_SLOT, Slot::Input)]
            .into_iter()
            .filter_map(|(marker, slot)| token.find(marker).map(|at| (at, marker, slot)))
            .collect::<Vec<_>>();

        match found.as_slice() {
            [] => Ok(Arg::Literal(token.to_string())),
            [(at, marker, slot)] => {
                let suffix = &token[at + marker.len()..];
                if suffix.contains(marker) {
                    return Err(EvalError::Config(format!(
                        "argument '{}' repeats {}",
                        token, marker
                    )));
                }
                Ok(Arg::Slot {
                    slot: slot.clone(),
                    prefix: token[..*at].to_string(),
                    suffix: suffix.to_string(),
                })
            }
            _ => Err(EvalError::Config(format!(
                "argument '{}' holds more than one slot",
                token
            ))),
        }
    }

    fn render(&self, output_dir: &Path, input: &Path) -> OsString {
        match self {
            Arg::Literal(text) => OsString::from(text),
            Arg::Slot {
                slot,
                prefix,
                suffix,
            } => {
                let value = match slot {
                    Slot::OutputDir => output_dir,
                    Slot::Input => input,
                };
                let mut arg = OsString::from(prefix);
                arg.push(value.as_os_str());
                arg.push(suffix);
                arg
            }
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Literal(text) => f.write_str(text),
            Arg::Slot {
                slot,
                prefix,
                suffix,
            } => {
                let marker = match slot {
                    Slot::OutputDir => OUTPUT_SLOT,
                    Slot::Input => INPUT_SLOT,
                };
                write!(f, "{}{}{}", prefix, marker, suffix)
            }
        }
    }
}

/// A validated recognition command with an output-directory slot and an
/// input-file slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    program: String,
    args: Vec<Arg>,
}

impl CommandTemplate {
    /// Build a template from a program and already-split arguments.
    ///
    /// Fails unless both `{output}` and `{input}` appear among the arguments.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Result<Self, EvalError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let program = program.into();
        if program.is_empty() {
            return Err(EvalError::Config("empty command template".to_string()));
        }
        if program.contains(OUTPUT_SLOT) || program.contains(INPUT_SLOT) {
            return Err(EvalError::Config(format!(
                "program '{}' must not be a slot",
                program
            )));
        }
        let args = args
            .into_iter()
            .map(|a| Arg::parse(a.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let has = |wanted: Slot| {
            args.iter()
                .any(|a| matches!(a, Arg::Slot { slot, .. } if *slot == wanted))
        };
        for (slot, marker) in [(Slot::OutputDir, OUTPUT_SLOT), (Slot::Input, INPUT_SLOT)] {
            if !has(slot) {
                return Err(EvalError::Config(format!(
                    "command template has no {} slot",
                    marker
                )));
            }
        }

        Ok(CommandTemplate { program, args })
    }

    /// Parse a whitespace-separated template string.
    ///
    /// # Example
    /// ```
    /// use omreval::CommandTemplate;
    /// use std::path::Path;
    ///
    /// let template = CommandTemplate::parse("omr --out {output} {input}")?;
    /// let argv = template.argv(Path::new("/tmp/my out"), Path::new("scan 1.png"));
    /// assert_eq!(argv, vec!["omr", "--out", "/tmp/my out", "scan 1.png"]);
    /// # Ok::<(), omreval::EvalError>(())
    /// ```
    pub fn parse(template: &str) -> Result<Self, EvalError> {
        let mut tokens = template.split_whitespace();
        let program = tokens
            .next()
            .ok_or_else(|| EvalError::Config("empty command template".to_string()))?;
        CommandTemplate::new(program, tokens)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// The full argument vector, program first, with both slots filled.
    pub fn argv(&self, output_dir: &Path, input: &Path) -> Vec<OsString> {
        std::iter::once(OsString::from(&self.program))
            .chain(self.args.iter().map(|a| a.render(output_dir, input)))
            .collect()
    }

    /// A [`Command`] ready to spawn, with no working directory or stdio set.
    pub fn command(&self, output_dir: &Path, input: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args.iter().map(|a| a.render(output_dir, input)));
        cmd
    }
}

impl Default for CommandTemplate {
    fn default() -> Self {
        CommandTemplate {
            program: "audiveris".to_string(),
            args: ["-batch", "-export", "-output"]
                .iter()
                .map(|s| Arg::Literal(s.to_string()))
                .chain([
                    Arg::Slot {
                        slot: Slot::OutputDir,
                        prefix: String::new(),
                        suffix: String::new(),
                    },
                    Arg::Slot {
                        slot: Slot::Input,
                        prefix: String::new(),
                        suffix: String::new(),
                    },
                ])
                .collect(),
        }
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
