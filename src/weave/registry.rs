//! Extension registry
//!
//! Fixed table from a language or format identifier to the file-extension
//! patterns that belong to it. Identifiers are resolved once, before the walk
//! starts, so an unknown token fails fast with [`ConfigError::UnrecognizedLanguage`].

use crate::error::ConfigError;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

/// Global language table, built on first access and shared read-only.
pub static LANGUAGE_EXTENSIONS: LazyLock<BTreeMap<&'static str, &'static [&'static str]>> =
    LazyLock::new(|| {
        let mut table: BTreeMap<&'static str, &'static [&'static str]> = BTreeMap::new();

        // Scripting
        table.insert("python", &[".py"]);
        table.insert("py", &[".py"]);
        table.insert("ipython", &[".ipynb"]);
        table.insert("ipynb", &[".ipynb"]);
        table.insert("ruby", &[".rb"]);
        table.insert("shell", &[".sh"]);
        table.insert("bash", &[".sh"]);
        table.insert("zsh", &[".sh"]);
        table.insert("matlab", &[".m"]);
        table.insert("mojo", &[".mojo"]);

        // Web
        table.insert("js", &[".js"]);
        table.insert("javascript", &[".js"]);
        table.insert("typescript", &[".ts", ".tsx"]);
        table.insert("ts", &[".ts", ".tsx"]);
        table.insert("html", &[".html"]);

        // Compiled
        table.insert("go", &[".go"]);
        table.insert("java", &[".java"]);
        table.insert("c", &[".c", ".h"]);
        table.insert("cpp", &[".cpp", ".h", ".hpp"]);
        table.insert("c++", &[".cpp", ".h", ".hpp"]);
        table.insert("csharp", &[".cs"]);
        table.insert("rust", &[".rs"]);

        // Documents and data
        table.insert("markdown", &[".md", ".markdown", ".mdx"]);
        table.insert("md", &[".md"]);
        table.insert("toml", &[".toml"]);
        table.insert("pdf", &[".pdf"]);

        table
    });

/// Languages whose block headers use `//` instead of `#`.
const SLASH_COMMENT_LANGUAGES: &[&str] = &[
    "go",
    "js",
    "javascript",
    "typescript",
    "ts",
    "java",
    "c",
    "cpp",
    "c++",
    "csharp",
    "rust",
];

/// Look up the extension patterns for one identifier.
pub fn extensions_for(language: &str) -> Option<&'static [&'static str]> {
    LANGUAGE_EXTENSIONS.get(language).copied()
}

/// Whether `language` names an entry of the table.
pub fn is_known_language(language: &str) -> bool {
    LANGUAGE_EXTENSIONS.contains_key(language)
}

/// Resolve a set of identifiers to the union of their extension patterns.
///
/// Identifiers are trimmed and lower-cased; blank tokens are ignored.
pub fn resolve_extensions<S: AsRef<str>>(languages: &[S]) -> Result<BTreeSet<String>, ConfigError> {
    let mut extensions = BTreeSet::new();
    for raw in languages {
        let token = raw.as_ref().trim();
        if token.is_empty() {
            continue;
        }
        let patterns = extensions_for(&token.to_lowercase())
            .ok_or_else(|| ConfigError::UnrecognizedLanguage(token.to_string()))?;
        extensions.extend(patterns.iter().map(|ext| ext.to_string()));
    }
    Ok(extensions)
}

/// Every identifier whose extension list claims `file_name`.
pub fn languages_for_file(file_name: &str) -> Vec<&'static str> {
    LANGUAGE_EXTENSIONS
        .iter()
        .filter(|(_, extensions)| extensions.iter().any(|ext| file_name.ends_with(ext)))
        .map(|(language, _)| *language)
        .collect()
}

/// Comment leader used in block headers for the requested languages.
pub fn comment_prefix<S: AsRef<str>>(languages: &[S]) -> &'static str {
    let slash = languages.iter().any(|language| {
        SLASH_COMMENT_LANGUAGES.contains(&language.as_ref().trim().to_lowercase().as_str())
    });
    if slash { "// " } else { "# " }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_union_of_extensions() {
        let extensions = resolve_extensions(&["python", "markdown"]).unwrap();
        let expected: BTreeSet<String> = [".py", ".md", ".markdown", ".mdx"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(extensions, expected);
    }

    #[test]
    fn test_shared_extensions_are_deduplicated() {
        let extensions = resolve_extensions(&["c", "cpp"]).unwrap();
        assert_eq!(extensions.len(), 4);
        assert!(extensions.contains(".h"));
    }

    #[test]
    fn test_unknown_language_names_the_token() {
        let err = resolve_extensions(&["python", "klingon"]).unwrap_err();
        assert_eq!(err, ConfigError::UnrecognizedLanguage("klingon".into()));
    }

    #[test]
    fn test_identifiers_are_normalised() {
        let extensions = resolve_extensions(&[" Python ", ""]).unwrap();
        assert_eq!(extensions.into_iter().collect::<Vec<_>>(), vec![".py"]);
    }

    #[test]
    fn test_languages_for_file() {
        let languages = languages_for_file("main.py");
        assert!(languages.contains(&"python"));
        assert!(languages.contains(&"py"));
        assert!(!languages.contains(&"pdf"));
        assert!(languages_for_file("Makefile").is_empty());
    }

    #[test]
    fn test_comment_prefix() {
        assert_eq!(comment_prefix(&["python"]), "# ");
        assert_eq!(comment_prefix(&["python", "go"]), "// ");
        assert_eq!(comment_prefix::<&str>(&[]), "# ");
    }
}
