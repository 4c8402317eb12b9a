//! Error taxonomy for the weaving pipeline.
//!
//! Fatal conditions surface as [`WeaveError`]; per-directory problems are
//! collected as [`TraversalWarning`] and per-file problems are carried in
//! [`crate::weave::transform::TransformStatus`], so a caller can always tell
//! a failed run from a run that finished with warnings.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Invalid user configuration, reported before traversal starts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unrecognized language '{0}' (run `codeweave languages` for the supported list)")]
    UnrecognizedLanguage(String),

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid program mapping '{0}': expected <language>=<command>")]
    InvalidProgramMapping(String),

    #[error("program mapping names unknown language '{0}'")]
    UnknownProgramLanguage(String),

    #[error("invalid execution mode '{0}': expected auto, sequential or parallel")]
    InvalidExecutionMode(String),
}

/// Fatal outcome of a weave run.
#[derive(Debug, Error)]
pub enum WeaveError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("input directory not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("unsupported input '{0}': only local directories can be woven")]
    UnsupportedInput(String),

    #[error("no source code found matching the requested filters")]
    NoContent,

    #[error("run cancelled")]
    Cancelled,

    #[error("worker pool failed: {0}")]
    Worker(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WeaveError {
    /// Process exit code the CLI reports for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            WeaveError::NoContent => 2,
            WeaveError::Cancelled => 130,
            _ => 1,
        }
    }
}

/// A directory-level problem that does not stop the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraversalWarning {
    UnreadableDirectory { path: String, reason: String },
    SymlinkSkipped { path: String },
}

impl fmt::Display for TraversalWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraversalWarning::UnreadableDirectory { path, reason } => {
                write!(f, "cannot read directory '{path}': {reason}")
            }
            TraversalWarning::SymlinkSkipped { path } => {
                write!(f, "symbolic link not followed: '{path}'")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_distinguish_no_content() {
        assert_eq!(WeaveError::NoContent.exit_code(), 2);
        assert_eq!(WeaveError::Cancelled.exit_code(), 130);
        let config: WeaveError = ConfigError::UnrecognizedLanguage("cobol".into()).into();
        assert_eq!(config.exit_code(), 1);
    }

    #[test]
    fn test_messages_name_the_offending_token() {
        let err = ConfigError::UnrecognizedLanguage("cobol".into());
        assert!(err.to_string().contains("'cobol'"));

        let warning = TraversalWarning::UnreadableDirectory {
            path: "src/locked".into(),
            reason: "permission denied".into(),
        };
        assert_eq!(
            warning.to_string(),
            "cannot read directory 'src/locked': permission denied"
        );
    }
}
