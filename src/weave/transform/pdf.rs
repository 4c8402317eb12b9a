use super::program::{ProgramError, run_bounded};
use std::path::Path;
use std::process::Command;
use std::time::Duration;

/// Extracts plain text from a PDF document.
#[cfg_attr(test, mockall::automock)]
pub trait PdfExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String, ProgramError>;
}

/// Runs `pdftotext -layout <file> -` (poppler-utils) with a time limit.
#[derive(Debug, Clone)]
pub struct PdftotextExtractor {
    program: String,
    timeout: Duration,
}

impl PdftotextExtractor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: "pdftotext".to_string(),
            timeout,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

impl PdfExtractor for PdftotextExtractor {
    fn extract(&self, path: &Path) -> Result<String, ProgramError> {
        let program = which::which(&self.program).map_err(|e| ProgramError::Spawn {
            program: self.program.clone(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, e.to_string()),
        })?;
        let mut command = Command::new(program);
        command.arg("-layout").arg(path).arg("-");
        let text = run_bounded(&mut command, self.timeout)?;
        Ok(String::from_utf8_lossy(&text).into_owned())
    }
}
