use crate::error::ConfigError;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::sync::Arc;

/// Compiled include/exclude patterns with segment-anchored matching.
///
/// A pattern matches a relative path (rendered with `/` separators) when it
/// matches a whole run of path segments starting at any segment boundary, or
/// any ancestor directory of the path. `docs` therefore matches `docs`,
/// `src/docs/a.py` and `docs/x/y.md`, but never `docsite/index.md`.
/// A leading `/` anchors the pattern at the root. `*` and `?` never cross a
/// separator; `**` does. Matching is case-sensitive.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<String>,
    set: Arc<GlobSet>,
}

impl PatternSet {
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        let mut kept = Vec::with_capacity(patterns.len());

        for raw in patterns {
            let raw = raw.as_ref();
            for expanded in anchored_globs(raw)? {
                let glob = GlobBuilder::new(&expanded)
                    .literal_separator(true)
                    .build()
                    .map_err(|e| ConfigError::InvalidPattern {
                        pattern: raw.to_string(),
                        reason: e.kind().to_string(),
                    })?;
                builder.add(glob);
            }
            kept.push(raw.to_string());
        }

        let set = builder.build().map_err(|e| ConfigError::InvalidPattern {
            pattern: kept.join(", "),
            reason: e.to_string(),
        })?;

        tracing::debug!(count = kept.len(), "compiled path patterns");
        Ok(Self {
            patterns: kept,
            set: Arc::new(set),
        })
    }

    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            set: Arc::new(GlobSet::empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_match(&self, relative_path: &str) -> bool {
        self.set.is_match(relative_path)
    }
}

/// Expand one user pattern into the globs that implement segment anchoring.
fn anchored_globs(raw: &str) -> Result<Vec<String>, ConfigError> {
    let normalized = raw.trim().replace('\\', "/");
    let (rooted, body) = match normalized.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, normalized.strip_prefix("./").unwrap_or(&normalized)),
    };
    let body = body.trim_end_matches('/');

    if body.is_empty() {
        return Err(ConfigError::InvalidPattern {
            pattern: raw.to_string(),
            reason: "empty pattern".to_string(),
        });
    }

    let base = if rooted || body.starts_with("**/") || body == "**" {
        body.to_string()
    } else {
        format!("**/{body}")
    };

    let mut globs = vec![base.clone()];
    if !base.ends_with("/**") && base != "**" {
        globs.push(format!("{base}/**"));
    }
    Ok(globs)
}
