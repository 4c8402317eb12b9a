use crate::weave::filters::FilterSpec;
use crate::weave::transform::program::{ProgramError, run_bounded};
use std::path::Path;
use std::process::Command;
use std::time::Duration;

/// Produces the directory-tree prefix of a document.
#[cfg_attr(test, mockall::automock)]
pub trait TreeRenderer: Send + Sync {
    fn render(&self, root: &Path, spec: &FilterSpec) -> Result<String, ProgramError>;
}

/// Runs `tree <flags> -I "a|b|..." --prune <root>`.
#[derive(Debug, Clone)]
pub struct CommandTreeRenderer {
    program: String,
    flags: Vec<String>,
    timeout: Duration,
}

impl CommandTreeRenderer {
    pub fn new(flags: &str, timeout: Duration) -> Self {
        Self {
            program: "tree".to_string(),
            flags: flags.split_whitespace().map(str::to_string).collect(),
            timeout,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn arguments(&self, root: &Path, spec: &FilterSpec) -> Vec<String> {
        let mut args = self.flags.clone();
        let ignore = ignore_pattern(spec);
        if !ignore.is_empty() {
            args.push("-I".to_string());
            args.push(ignore);
        }
        args.push("--prune".to_string());
        args.push(root.to_string_lossy().into_owned());
        args
    }
}

/// `tree -I` takes a single `|`-separated list of names.
fn ignore_pattern(spec: &FilterSpec) -> String {
    let mut names: Vec<&str> = spec
        .excluded_dirs()
        .iter()
        .chain(spec.exclude().patterns())
        .map(|entry| entry.trim_matches('/'))
        .filter(|entry| !entry.is_empty())
        .collect();
    names.sort_unstable();
    names.dedup();
    names.join("|")
}

impl TreeRenderer for CommandTreeRenderer {
    fn render(&self, root: &Path, spec: &FilterSpec) -> Result<String, ProgramError> {
        let program = which::which(&self.program).map_err(|e| ProgramError::Spawn {
            program: self.program.clone(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, e.to_string()),
        })?;
        let mut command = Command::new(program);
        command.args(self.arguments(root, spec));
        let output = run_bounded(&mut command, self.timeout)?;
        Ok(String::from_utf8_lossy(&output).into_owned())
    }
}
