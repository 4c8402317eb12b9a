//! Pruning traversal
//!
//! Depth-first, pre-order walk driven by an explicit stack. Directory entries
//! are sorted by name before they are partitioned, so the visitation order
//! is fully determined by the tree: within a directory its accepted files
//! come first, then its subdirectories in name order. Subdirectories rejected
//! by the [`FilterChain`] are never listed.

use crate::error::TraversalWarning;
use crate::weave::filters::{FilterChain, FilterDecision, FilterSpec, RejectReason};
use std::collections::{BTreeMap, VecDeque};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Kind of a directory entry, taken without following symbolic links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

#[derive(Debug, Clone)]
pub struct DirEntryInfo {
    pub name: OsString,
    pub kind: EntryKind,
    pub size: u64,
}

/// Directory listing capability used by the traversal.
pub trait FileSystem: Send + Sync {
    /// List the immediate entries of `path`, in any order.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>>;
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let kind = if file_type.is_symlink() {
                EntryKind::Symlink
            } else if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                EntryKind::Other
            };
            let size = match kind {
                EntryKind::File => entry.metadata().map(|m| m.len()).unwrap_or(0),
                _ => 0,
            };
            entries.push(DirEntryInfo {
                name: entry.file_name(),
                kind,
                size,
            });
        }
        Ok(entries)
    }
}

/// A file that survived the filter chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub absolute_path: PathBuf,
    /// Path below the walk root, `/`-separated.
    pub relative_path: String,
    pub size: u64,
    /// Extension including the leading dot.
    pub extension: Option<String>,
}

impl FileCandidate {
    pub fn new(absolute_path: PathBuf, relative_path: String, size: u64) -> Self {
        let extension = absolute_path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()));
        Self {
            absolute_path,
            relative_path,
            size,
            extension,
        }
    }

    pub fn file_name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }

    pub fn has_extension(&self, extension: &str) -> bool {
        self.extension.as_deref() == Some(extension)
    }
}

/// Counters collected while walking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraversalStats {
    pub directories_listed: usize,
    pub directories_pruned: usize,
    pub files_accepted: usize,
    pub files_rejected: BTreeMap<RejectReason, usize>,
}

impl TraversalStats {
    pub fn total_rejected(&self) -> usize {
        self.files_rejected.values().sum()
    }
}

struct PendingDir {
    absolute: PathBuf,
    relative: String,
}

/// Lazy, single-pass sequence of [`FileCandidate`]s below a root directory.
pub struct Traversal {
    fs: Arc<dyn FileSystem>,
    chain: FilterChain,
    stack: Vec<PendingDir>,
    ready: VecDeque<FileCandidate>,
    warnings: Vec<TraversalWarning>,
    stats: TraversalStats,
}

/// Walk `root` on the real filesystem.
pub fn traverse(root: impl Into<PathBuf>, spec: Arc<FilterSpec>) -> Traversal {
    Traversal::with_file_system(root, spec, Arc::new(OsFileSystem))
}

impl Traversal {
    pub fn with_file_system(
        root: impl Into<PathBuf>,
        spec: Arc<FilterSpec>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            fs,
            chain: FilterChain::new(spec),
            stack: vec![PendingDir {
                absolute: root.into(),
                relative: String::new(),
            }],
            ready: VecDeque::new(),
            warnings: Vec::new(),
            stats: TraversalStats::default(),
        }
    }

    pub fn warnings(&self) -> &[TraversalWarning] {
        &self.warnings
    }

    pub fn stats(&self) -> &TraversalStats {
        &self.stats
    }

    /// Consume the traversal, returning what it recorded.
    pub fn finish(self) -> (TraversalStats, Vec<TraversalWarning>) {
        (self.stats, self.warnings)
    }

    fn expand(&mut self, dir: PendingDir) {
        let mut entries = match self.fs.list_dir(&dir.absolute) {
            Ok(entries) => entries,
            Err(e) => {
                let path = display_relative(&dir.relative).to_string();
                tracing::warn!(path = %path, error = %e, "cannot read directory, skipping");
                self.warnings.push(TraversalWarning::UnreadableDirectory {
                    path,
                    reason: e.to_string(),
                });
                return;
            }
        };
        self.stats.directories_listed += 1;
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let mut subdirs = Vec::new();
        for entry in entries {
            let name = entry.name.to_string_lossy();
            let relative = if dir.relative.is_empty() {
                name.to_string()
            } else {
                format!("{}/{}", dir.relative, name)
            };

            match entry.kind {
                EntryKind::Directory => {
                    if self.chain.should_enter_directory(&relative) {
                        subdirs.push(PendingDir {
                            absolute: dir.absolute.join(&entry.name),
                            relative,
                        });
                    } else {
                        self.stats.directories_pruned += 1;
                    }
                }
                EntryKind::File => match self.chain.should_accept_file(&relative) {
                    FilterDecision::Process => {
                        self.stats.files_accepted += 1;
                        self.ready.push_back(FileCandidate::new(
                            dir.absolute.join(&entry.name),
                            relative,
                            entry.size,
                        ));
                    }
                    FilterDecision::Skip(reason) => {
                        *self.stats.files_rejected.entry(reason).or_default() += 1;
                    }
                },
                EntryKind::Symlink => {
                    tracing::debug!(path = %relative, "not following symbolic link");
                    self.warnings
                        .push(TraversalWarning::SymlinkSkipped { path: relative });
                }
                EntryKind::Other => {
                    tracing::trace!(path = %relative, "skipping special file");
                }
            }
        }

        // Reverse so the smallest name is popped first.
        self.stack.extend(subdirs.into_iter().rev());
    }
}

impl Iterator for Traversal {
    type Item = FileCandidate;

    fn next(&mut self) -> Option<FileCandidate> {
        loop {
            if let Some(candidate) = self.ready.pop_front() {
                return Some(candidate);
            }
            let dir = self.stack.pop()?;
            self.expand(dir);
        }
    }
}

fn display_relative(relative: &str) -> &str {
    if relative.is_empty() { "." } else { relative }
}
