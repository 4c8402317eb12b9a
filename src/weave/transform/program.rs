//! External program substitution and bounded subprocess execution.

use crate::error::ConfigError;
use crate::weave::registry;
use crossbeam::channel;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("empty command")]
    EmptyCommand,

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("exited with {status}: {stderr}")]
    NonZeroExit { status: String, stderr: String },

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("I/O error while waiting for the process: {0}")]
    Io(#[from] std::io::Error),
}

enum Stream {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
}

/// Run `command` to completion, capturing stdout, killing it at `timeout`.
///
/// stdin is closed. The child leads its own process group so that anything
/// it spawns dies with it, and the deadline also covers draining the output
/// pipes, which stay open while any descendant holds them.
pub fn run_bounded(command: &mut Command, timeout: Duration) -> Result<Vec<u8>, ProgramError> {
    let program = command.get_program().to_string_lossy().into_owned();
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ProgramError::Spawn { program, source })?;

    let (sender, receiver) = channel::bounded(2);
    let stdout = child.stdout.take();
    let out_sender = sender.clone();
    thread::spawn(move || out_sender.send(Stream::Stdout(drain(stdout))));
    let stderr = child.stderr.take();
    thread::spawn(move || sender.send(Stream::Stderr(drain(stderr))));

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            kill_group(&mut child);
            return Err(ProgramError::TimedOut(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    };

    let (mut stdout, mut stderr) = (Vec::new(), Vec::new());
    for _ in 0..2 {
        match receiver.recv_deadline(deadline) {
            Ok(Stream::Stdout(buffer)) => stdout = buffer,
            Ok(Stream::Stderr(buffer)) => stderr = buffer,
            Err(_) => {
                kill_group(&mut child);
                return Err(ProgramError::TimedOut(timeout));
            }
        }
    }

    if !status.success() {
        return Err(ProgramError::NonZeroExit {
            status: status.to_string(),
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        });
    }
    Ok(stdout)
}

fn kill_group(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: plain signal delivery to the group created at spawn.
            unsafe {
                libc::kill(-pid, libc::SIGKILL);
            }
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

fn drain<R: Read>(pipe: Option<R>) -> Vec<u8> {
    let mut buffer = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buffer);
    }
    buffer
}

/// Runs a user-supplied command against one file.
#[cfg_attr(test, mockall::automock)]
pub trait ProgramRunner: Send + Sync {
    /// Invoke `command` with `path` as its only positional argument and
    /// return what it printed on stdout.
    fn run(&self, command: &str, path: &Path) -> Result<String, ProgramError>;
}

/// Runs mapped commands through the system shell with a time limit.
#[derive(Debug, Clone)]
pub struct ShellProgramRunner {
    timeout: Duration,
}

impl ShellProgramRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl ProgramRunner for ShellProgramRunner {
    fn run(&self, command: &str, path: &Path) -> Result<String, ProgramError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(ProgramError::EmptyCommand);
        }
        tracing::debug!(command, path = %path.display(), "running mapped program");

        let mut shell = shell_command(command, path);
        let stdout = run_bounded(&mut shell, self.timeout)?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

/// The path travels as a positional parameter, never spliced into the script.
#[cfg(unix)]
fn shell_command(command: &str, path: &Path) -> Command {
    let mut shell = Command::new("sh");
    shell
        .arg("-c")
        .arg(format!("{command} \"$1\""))
        .arg("codeweave")
        .arg(path);
    shell
}

#[cfg(not(unix))]
fn shell_command(command: &str, path: &Path) -> Command {
    let mut shell = Command::new("cmd");
    shell.arg("/C").arg(command).arg(path);
    shell
}

/// A `language=command` pair; `*` applies to every file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramMapping {
    pub language: String,
    pub command: String,
}

impl ProgramMapping {
    pub const WILDCARD: &'static str = "*";

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let (language, command) = raw
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidProgramMapping(raw.to_string()))?;
        let language = language.trim().to_lowercase();
        let command = command.trim();
        if language.is_empty() || command.is_empty() {
            return Err(ConfigError::InvalidProgramMapping(raw.to_string()));
        }
        if language != Self::WILDCARD && !registry::is_known_language(&language) {
            return Err(ConfigError::UnknownProgramLanguage(language));
        }
        Ok(Self {
            language,
            command: command.to_string(),
        })
    }

    pub fn is_wildcard(&self) -> bool {
        self.language == Self::WILDCARD
    }

    pub fn applies_to(&self, file_name: &str) -> bool {
        if self.is_wildcard() {
            return true;
        }
        registry::extensions_for(&self.language)
            .is_some_and(|extensions| extensions.iter().any(|ext| file_name.ends_with(ext)))
    }
}

/// Language-specific mappings win over the wildcard; otherwise first match wins.
pub fn find_mapping<'a>(mappings: &'a [ProgramMapping], file_name: &str) -> Option<&'a ProgramMapping> {
    mappings
        .iter()
        .find(|m| !m.is_wildcard() && m.applies_to(file_name))
        .or_else(|| mappings.iter().find(|m| m.is_wildcard()))
}
