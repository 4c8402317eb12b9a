//! Filter chain for the weaving pipeline
//!
//! Directory decisions are taken before a directory is listed, so a pruned
//! subtree costs nothing. File decisions run a fixed, short-circuiting
//! sequence: include, exclude, language.

pub mod pattern;
pub mod spec;

pub use pattern::PatternSet;
pub use spec::{FilterOptions, FilterSpec};

use std::fmt;
use std::sync::Arc;

/// Base filter trait that all path filters implement
pub trait Filter {
    /// The input type this filter processes
    type Input: ?Sized;
    /// The output type this filter produces
    type Output;

    /// Apply the filter to the input
    fn filter(&self, input: &Self::Input) -> Self::Output;

    /// Get the name of this filter for debugging/logging
    fn name(&self) -> &'static str;
}

/// Why a path was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RejectReason {
    ExcludedDirectory,
    NotIncluded,
    Excluded,
    WrongLanguage,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::ExcludedDirectory => "excluded directory",
            RejectReason::NotIncluded => "not included",
            RejectReason::Excluded => "excluded",
            RejectReason::WrongLanguage => "wrong language",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision for whether to process or skip a file/directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    /// Continue processing this item
    Process,
    /// Skip this item with a reason
    Skip(RejectReason),
}

impl FilterDecision {
    pub fn is_process(&self) -> bool {
        matches!(self, FilterDecision::Process)
    }
}

/// Final segment of a `/`-separated relative path.
fn file_name(relative: &str) -> &str {
    relative.rsplit('/').next().unwrap_or(relative)
}

/// Prunes directories by name or by exclude pattern.
pub struct DirectoryRule {
    spec: Arc<FilterSpec>,
}

impl Filter for DirectoryRule {
    type Input = str;
    type Output = FilterDecision;

    fn filter(&self, relative: &str) -> FilterDecision {
        if self.spec.excluded_dirs().contains(file_name(relative)) || self.spec.exclude().is_match(relative) {
            FilterDecision::Skip(RejectReason::ExcludedDirectory)
        } else {
            FilterDecision::Process
        }
    }

    fn name(&self) -> &'static str {
        "DirectoryRule"
    }
}

/// Keeps only files matching an include pattern, when any are configured.
pub struct IncludeFilter {
    spec: Arc<FilterSpec>,
}

impl Filter for IncludeFilter {
    type Input = str;
    type Output = FilterDecision;

    fn filter(&self, relative: &str) -> FilterDecision {
        let include = self.spec.include();
        if include.is_empty() || include.is_match(relative) {
            FilterDecision::Process
        } else {
            FilterDecision::Skip(RejectReason::NotIncluded)
        }
    }

    fn name(&self) -> &'static str {
        "IncludeFilter"
    }
}

/// Drops files matching any exclude pattern.
pub struct ExcludeFilter {
    spec: Arc<FilterSpec>,
}

impl Filter for ExcludeFilter {
    type Input = str;
    type Output = FilterDecision;

    fn filter(&self, relative: &str) -> FilterDecision {
        if self.spec.exclude().is_match(relative) {
            FilterDecision::Skip(RejectReason::Excluded)
        } else {
            FilterDecision::Process
        }
    }

    fn name(&self) -> &'static str {
        "ExcludeFilter"
    }
}

/// Drops files whose extension is not in the resolved language set.
pub struct LanguageFilter {
    spec: Arc<FilterSpec>,
}

impl Filter for LanguageFilter {
    type Input = str;
    type Output = FilterDecision;

    fn filter(&self, relative: &str) -> FilterDecision {
        if self.spec.accepts_extension(file_name(relative)) {
            FilterDecision::Process
        } else {
            FilterDecision::Skip(RejectReason::WrongLanguage)
        }
    }

    fn name(&self) -> &'static str {
        "LanguageFilter"
    }
}

/// The composed directory and file rules over one [`FilterSpec`].
pub struct FilterChain {
    spec: Arc<FilterSpec>,
    directories: DirectoryRule,
    include: IncludeFilter,
    exclude: ExcludeFilter,
    language: LanguageFilter,
}

impl FilterChain {
    pub fn new(spec: Arc<FilterSpec>) -> Self {
        Self {
            directories: DirectoryRule { spec: spec.clone() },
            include: IncludeFilter { spec: spec.clone() },
            exclude: ExcludeFilter { spec: spec.clone() },
            language: LanguageFilter { spec: spec.clone() },
            spec,
        }
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    /// `relative` is the directory's `/`-separated path below the walk root.
    pub fn directory_decision(&self, relative: &str) -> FilterDecision {
        let decision = self.directories.filter(relative);
        if let FilterDecision::Skip(reason) = decision {
            tracing::trace!(path = relative, filter = self.directories.name(), %reason, "pruned directory");
        }
        decision
    }

    pub fn should_enter_directory(&self, relative: &str) -> bool {
        self.directory_decision(relative).is_process()
    }

    /// Include, then exclude, then language; the first rejection wins.
    pub fn should_accept_file(&self, relative: &str) -> FilterDecision {
        let rules: [&dyn Filter<Input = str, Output = FilterDecision>; 3] =
            [&self.include, &self.exclude, &self.language];
        for rule in rules {
            let decision = rule.filter(relative);
            if let FilterDecision::Skip(reason) = decision {
                tracing::trace!(path = relative, filter = rule.name(), %reason, "rejected file");
                return decision;
            }
        }
        FilterDecision::Process
    }
}
