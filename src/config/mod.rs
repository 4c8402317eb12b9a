//! Configuration management for codeweave
//!
//! [`WeaveConfig`] is the merged view of every configuration layer (see
//! [`core`] for the layering). It converts into the immutable core types
//! before any file is touched, so configuration mistakes are reported up
//! front.

pub mod core;
pub mod formats;
pub mod overrides;

pub use formats::{ConfigFormat, ExportFormat};

use crate::error::ConfigError;
use crate::parallel::ExecutionStrategy;
use crate::weave::filters::{FilterOptions, FilterSpec};
use crate::weave::pipeline::{ExecutionMode, ExecutionSettings};
use crate::weave::registry;
use crate::weave::transform::{ProgramMapping, TransformOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaveConfig {
    pub filter: FilterConfig,
    pub transform: TransformConfig,
    pub output: OutputConfig,
    pub execution: ExecutionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub languages: Vec<String>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub excluded_dirs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    pub strip_comments: bool,
    pub convert_notebooks: bool,
    pub pdf_text_mode: bool,
    /// 0 keeps whole blocks
    pub top_n: usize,
    /// `language=command` pairs
    pub programs: Vec<String>,
    pub substitute: bool,
    pub program_timeout_secs: u64,
    /// 0 disables the limit
    pub max_file_size_mb: u64,
    pub skip_test_files: bool,
    pub min_lines: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub name_append: String,
    pub tree: bool,
    pub tree_flags: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    pub mode: String,
    pub max_threads: usize,
    pub thread_percentage: u8,
    pub min_files_for_parallel: usize,
}

impl WeaveConfig {
    pub fn filter_spec(&self) -> Result<FilterSpec, ConfigError> {
        FilterSpec::new(FilterOptions {
            languages: self.filter.languages.clone(),
            include: self.filter.include.clone(),
            exclude: self.filter.exclude.clone(),
            excluded_dirs: self.filter.excluded_dirs.clone(),
        })
    }

    pub fn program_mappings(&self) -> Result<Vec<ProgramMapping>, ConfigError> {
        self.transform
            .programs
            .iter()
            .map(|raw| ProgramMapping::parse(raw))
            .collect()
    }

    pub fn comment_prefix(&self) -> &'static str {
        registry::comment_prefix(&self.filter.languages)
    }

    pub fn program_timeout(&self) -> Duration {
        Duration::from_secs(self.transform.program_timeout_secs.max(1))
    }

    pub fn transform_options(&self) -> Result<TransformOptions, ConfigError> {
        let t = &self.transform;
        Ok(TransformOptions {
            strip_comments: t.strip_comments,
            convert_notebooks: t.convert_notebooks,
            pdf_text_mode: t.pdf_text_mode,
            top_n: (t.top_n > 0).then_some(t.top_n),
            programs: self.program_mappings()?,
            substitute: t.substitute,
            program_timeout: self.program_timeout(),
            max_file_size: (t.max_file_size_mb > 0).then(|| t.max_file_size_mb * 1024 * 1024),
            skip_test_files: t.skip_test_files,
            min_lines: t.min_lines,
            comment_prefix: self.comment_prefix(),
        })
    }

    pub fn execution_settings(&self) -> Result<ExecutionSettings, ConfigError> {
        let e = &self.execution;
        Ok(ExecutionSettings {
            mode: e.mode.parse::<ExecutionMode>()?,
            workers: ExecutionStrategy::calculate_optimal_workers(e.max_threads, e.thread_percentage),
            min_files_for_parallel: e.min_files_for_parallel,
        })
    }

    /// `<directory>/<folder>_<lang1,lang2>[_<name_append>].txt`
    pub fn output_path(&self, folder: &Path) -> PathBuf {
        let folder_name = folder
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "root".to_string());
        let languages = if self.filter.languages.is_empty() {
            "all".to_string()
        } else {
            self.filter
                .languages
                .iter()
                .map(|language| language.trim().to_lowercase())
                .collect::<Vec<_>>()
                .join(",")
        };
        let suffix = match self.output.name_append.trim() {
            "" => String::new(),
            append => format!("_{append}"),
        };
        self.output
            .directory
            .join(format!("{folder_name}_{languages}{suffix}.txt"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> WeaveConfig {
        super::core::load_layers(&super::core::ConfigSources::defaults_only(), None::<&()>).unwrap()
    }

    #[test]
    fn test_defaults_convert_to_core_types() {
        let config = defaults();
        let spec = config.filter_spec().unwrap();
        assert!(spec.extensions().contains(".py"));
        assert!(spec.excluded_dirs().contains(".venv"));

        let options = config.transform_options().unwrap();
        assert!(options.strip_comments);
        assert_eq!(options.top_n, None);
        assert_eq!(options.max_file_size, Some(10 * 1024 * 1024));
        assert_eq!(options.comment_prefix, "# ");

        let execution = config.execution_settings().unwrap();
        assert_eq!(execution.mode, ExecutionMode::Auto);
        assert!(execution.workers >= 1);
    }

    #[test]
    fn test_configuration_errors_surface_before_running() {
        let mut config = defaults();
        config.filter.languages = vec!["cobol".into()];
        assert_eq!(
            config.filter_spec().unwrap_err(),
            ConfigError::UnrecognizedLanguage("cobol".into())
        );

        let mut config = defaults();
        config.transform.programs = vec!["python".into()];
        assert!(matches!(
            config.transform_options(),
            Err(ConfigError::InvalidProgramMapping(_))
        ));

        let mut config = defaults();
        config.execution.mode = "turbo".into();
        assert!(config.execution_settings().is_err());
    }

    #[test]
    fn test_output_path_naming() {
        let mut config = defaults();
        config.filter.languages = vec!["python".into(), "Markdown".into()];
        assert_eq!(
            config.output_path(Path::new("/work/my-repo")),
            PathBuf::from("outputs/my-repo_python,markdown.txt")
        );

        config.output.name_append = "v2".into();
        config.output.directory = PathBuf::from("out");
        config.filter.languages = vec!["go".into()];
        assert_eq!(
            config.output_path(Path::new("svc")),
            PathBuf::from("out/svc_go_v2.txt")
        );
        assert_eq!(config.comment_prefix(), "// ");
    }
}
