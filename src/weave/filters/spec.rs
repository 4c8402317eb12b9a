use super::pattern::PatternSet;
use crate::error::ConfigError;
use crate::weave::registry;
use std::collections::BTreeSet;

/// Raw filter settings as they arrive from configuration.
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    pub languages: Vec<String>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub excluded_dirs: Vec<String>,
}

/// Normalized, immutable filter configuration.
///
/// Built once before traversal: languages are resolved to extensions,
/// include entries override identical exclude entries, and excluded
/// directory names are folded into the exclude patterns.
#[derive(Debug, Clone)]
pub struct FilterSpec {
    languages: Vec<String>,
    extensions: BTreeSet<String>,
    include: PatternSet,
    exclude: PatternSet,
    excluded_dirs: BTreeSet<String>,
}

impl FilterSpec {
    pub fn new(options: FilterOptions) -> Result<Self, ConfigError> {
        let FilterOptions {
            languages,
            include,
            exclude,
            excluded_dirs,
        } = options;

        let languages: Vec<String> = languages
            .iter()
            .map(|language| language.trim().to_lowercase())
            .filter(|language| !language.is_empty())
            .collect();
        let extensions = registry::resolve_extensions(&languages)?;

        let include = clean(include);
        let keep = |entry: &String| {
            let overridden = include.contains(entry);
            if overridden {
                tracing::debug!(entry = %entry, "include entry overrides exclusion");
            }
            !overridden
        };
        let excluded_dirs: BTreeSet<String> = clean(excluded_dirs)
            .into_iter()
            .filter(|dir| keep(dir))
            .collect();
        let mut exclude: Vec<String> = clean(exclude)
            .into_iter()
            .filter(|pattern| keep(pattern))
            .collect();

        for dir in &excluded_dirs {
            if !exclude.contains(dir) {
                exclude.push(dir.clone());
            }
        }

        Ok(Self {
            languages,
            extensions,
            include: PatternSet::compile(&include)?,
            exclude: PatternSet::compile(&exclude)?,
            excluded_dirs,
        })
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn extensions(&self) -> &BTreeSet<String> {
        &self.extensions
    }

    pub fn include(&self) -> &PatternSet {
        &self.include
    }

    pub fn exclude(&self) -> &PatternSet {
        &self.exclude
    }

    pub fn excluded_dirs(&self) -> &BTreeSet<String> {
        &self.excluded_dirs
    }

    /// An empty language list accepts every extension.
    pub fn accepts_extension(&self, file_name: &str) -> bool {
        self.extensions.is_empty() || self.extensions.iter().any(|ext| file_name.ends_with(ext.as_str()))
    }
}

fn clean(entries: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    entries
        .into_iter()
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty() && seen.insert(entry.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(languages: &[&str]) -> FilterOptions {
        FilterOptions {
            languages: languages.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_excluded_dirs_fold_into_exclude_patterns() {
        let spec = FilterSpec::new(FilterOptions {
            excluded_dirs: vec![".venv".into(), "docs".into()],
            exclude: vec!["*.lock".into()],
            ..options(&["python"])
        })
        .unwrap();

        assert_eq!(spec.exclude().patterns(), &["*.lock", ".venv", "docs"]);
        assert!(spec.exclude().is_match(".venv/lib/x.py"));
        assert!(spec.excluded_dirs().contains("docs"));
    }

    #[test]
    fn test_include_overrides_identical_exclusions() {
        let spec = FilterSpec::new(FilterOptions {
            include: vec!["tests".into()],
            exclude: vec!["tests".into(), "build".into()],
            excluded_dirs: vec!["tests".into(), "docs".into()],
            ..options(&["python"])
        })
        .unwrap();

        assert!(!spec.excluded_dirs().contains("tests"));
        assert_eq!(spec.exclude().patterns(), &["build", "docs"]);
    }

    #[test]
    fn test_unknown_language_fails_construction() {
        let err = FilterSpec::new(options(&["python", "fortran77"])).unwrap_err();
        assert_eq!(err, ConfigError::UnrecognizedLanguage("fortran77".into()));
    }

    #[test]
    fn test_accepts_extension() {
        let spec = FilterSpec::new(options(&["python"])).unwrap();
        assert!(spec.accepts_extension("main.py"));
        assert!(!spec.accepts_extension("main.pyc"));
        assert!(!spec.accepts_extension("lib.rs"));

        let any = FilterSpec::new(options(&[])).unwrap();
        assert!(any.accepts_extension("Makefile"));
    }
}
