//! End-to-end weave run: traverse, transform, assemble.

use crate::error::{TraversalWarning, WeaveError};
use crate::parallel::ExecutionStrategy;
use crate::weave::filters::FilterSpec;
use crate::weave::transform::{TransformResult, TransformStatus, Transformer};
use crate::weave::traversal::{FileCandidate, FileSystem, OsFileSystem, Traversal, TraversalStats};
use crate::weave::tree::TreeRenderer;
use crate::weave::writer::{AssembleOptions, OutputDocument, assemble};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Auto,
    Sequential,
    Parallel,
}

impl FromStr for ExecutionMode {
    type Err = crate::error::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(ExecutionMode::Auto),
            "sequential" => Ok(ExecutionMode::Sequential),
            "parallel" => Ok(ExecutionMode::Parallel),
            _ => Err(crate::error::ConfigError::InvalidExecutionMode(s.to_string())),
        }
    }
}

/// How transformation work is spread over threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionSettings {
    pub mode: ExecutionMode,
    pub workers: usize,
    pub min_files_for_parallel: usize,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Auto,
            workers: ExecutionStrategy::calculate_optimal_workers(0, 75),
            min_files_for_parallel: 32,
        }
    }
}

impl ExecutionSettings {
    pub fn strategy_for(&self, file_count: usize) -> ExecutionStrategy {
        // Never start more workers than there are files
        let workers = self.workers.min(file_count).max(1);
        match self.mode {
            ExecutionMode::Sequential => ExecutionStrategy::Sequential,
            ExecutionMode::Parallel => ExecutionStrategy::Parallel { workers },
            ExecutionMode::Auto => {
                ExecutionStrategy::auto(file_count, self.min_files_for_parallel, workers)
            }
        }
    }
}

/// Non-fatal problem recorded during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunWarning {
    Traversal(TraversalWarning),
    Transform { path: String, message: String },
    Tree(String),
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunWarning::Traversal(warning) => warning.fmt(f),
            RunWarning::Transform { path, message } => write!(f, "{path}: {message}"),
            RunWarning::Tree(message) => write!(f, "directory tree omitted: {message}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeaveStats {
    pub traversal: TraversalStats,
    pub emitted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub duration: Duration,
}

#[derive(Debug)]
pub struct WeaveReport {
    pub document: OutputDocument,
    pub warnings: Vec<RunWarning>,
    pub stats: WeaveStats,
}

/// Candidates found by a walk, before any content is read.
#[derive(Debug)]
pub struct Discovery {
    pub candidates: Vec<FileCandidate>,
    pub stats: TraversalStats,
    pub warnings: Vec<TraversalWarning>,
}

/// Turn a user-supplied input into a local directory.
///
/// Remote repositories and archives have to be fetched or extracted by the
/// caller first.
pub fn resolve_input(input: &str, base: &Path) -> Result<PathBuf, WeaveError> {
    let trimmed = input.trim();
    let lowered = trimmed.to_lowercase();
    if lowered.contains("://") || lowered.starts_with("git@") || lowered.ends_with(".zip") {
        return Err(WeaveError::UnsupportedInput(trimmed.to_string()));
    }

    let path = base.join(trimmed);
    if !path.is_dir() {
        return Err(WeaveError::InputNotFound(path));
    }
    Ok(path)
}

pub struct Weaver {
    spec: Arc<FilterSpec>,
    transformer: Transformer,
    execution: ExecutionSettings,
    tree: Option<Box<dyn TreeRenderer>>,
    fs: Arc<dyn FileSystem>,
    cancel: Arc<AtomicBool>,
}

impl Weaver {
    pub fn new(spec: FilterSpec, transformer: Transformer) -> Self {
        Self {
            spec: Arc::new(spec),
            transformer,
            execution: ExecutionSettings::default(),
            tree: None,
            fs: Arc::new(OsFileSystem),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_execution(mut self, execution: ExecutionSettings) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_tree_renderer(mut self, renderer: Box<dyn TreeRenderer>) -> Self {
        self.tree = Some(renderer);
        self
    }

    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Share a flag that aborts the run once set.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Walk `root` and collect the candidates in output order.
    pub fn discover(&self, root: &Path) -> Result<Discovery, WeaveError> {
        if !root.is_dir() {
            return Err(WeaveError::InputNotFound(root.to_path_buf()));
        }

        let mut traversal = Traversal::with_file_system(root, self.spec.clone(), self.fs.clone());
        let mut candidates = Vec::new();
        for candidate in traversal.by_ref() {
            if self.cancelled() {
                return Err(WeaveError::Cancelled);
            }
            candidates.push(candidate);
        }
        let (stats, warnings) = traversal.finish();

        tracing::info!(
            candidates = candidates.len(),
            directories = stats.directories_listed,
            pruned = stats.directories_pruned,
            rejected = stats.total_rejected(),
            "discovery complete"
        );
        Ok(Discovery {
            candidates,
            stats,
            warnings,
        })
    }

    pub fn run(&self, root: &Path) -> Result<WeaveReport, WeaveError> {
        let started = Instant::now();
        let discovery = self.discover(root)?;
        if discovery.candidates.is_empty() {
            tracing::warn!(root = %root.display(), "no files matched the filters");
            return Err(WeaveError::NoContent);
        }

        let strategy = self.execution.strategy_for(discovery.candidates.len());
        tracing::debug!(?strategy, files = discovery.candidates.len(), "transforming");

        let results = strategy
            .execute(discovery.candidates, |candidate| {
                (!self.cancelled()).then(|| self.transformer.transform(candidate))
            })
            .map_err(|e| WeaveError::Worker(e.to_string()))?;
        let results: Vec<TransformResult> = results
            .into_iter()
            .collect::<Option<_>>()
            .ok_or(WeaveError::Cancelled)?;
        if self.cancelled() {
            return Err(WeaveError::Cancelled);
        }

        let mut warnings: Vec<RunWarning> = discovery
            .warnings
            .into_iter()
            .map(RunWarning::Traversal)
            .collect();
        let mut stats = WeaveStats {
            traversal: discovery.stats,
            ..Default::default()
        };

        for result in &results {
            match &result.status {
                TransformStatus::Ok => {}
                TransformStatus::Skipped(reason) => {
                    stats.skipped += 1;
                    tracing::debug!(path = %result.relative_path, %reason, "skipped");
                }
                TransformStatus::Failed(reason) => {
                    stats.failed += 1;
                    warnings.push(RunWarning::Transform {
                        path: result.relative_path.clone(),
                        message: reason.clone(),
                    });
                }
            }
            if let Some(warning) = &result.warning {
                warnings.push(RunWarning::Transform {
                    path: result.relative_path.clone(),
                    message: warning.clone(),
                });
            }
            if result.is_emitted() {
                stats.emitted += 1;
            }
        }

        let tree = self.tree.as_ref().and_then(|renderer| {
            match renderer.render(root, &self.spec) {
                Ok(tree) => Some(tree),
                Err(e) => {
                    tracing::warn!(error = %e, "tree rendering failed");
                    warnings.push(RunWarning::Tree(e.to_string()));
                    None
                }
            }
        });

        let document = assemble(
            results,
            &AssembleOptions {
                comment_prefix: self.transformer.options().comment_prefix,
                tree,
            },
        )?;

        stats.duration = started.elapsed();
        tracing::info!(
            emitted = stats.emitted,
            skipped = stats.skipped,
            failed = stats.failed,
            elapsed_ms = stats.duration.as_millis() as u64,
            "weave complete"
        );

        Ok(WeaveReport {
            document,
            warnings,
            stats,
        })
    }
}
