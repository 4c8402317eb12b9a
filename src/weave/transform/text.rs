//! Raw text reading and content heuristics.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

/// Bytes inspected when sniffing for binary content.
const SNIFF_LEN: usize = 1024;

/// Extensions that are never worth decoding
static BINARY_EXTENSIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    let mut set = HashSet::new();

    // Executables and objects
    set.insert("exe");
    set.insert("dll");
    set.insert("so");
    set.insert("dylib");
    set.insert("bin");
    set.insert("o");
    set.insert("a");
    set.insert("pyc");
    set.insert("class");

    // Images
    set.insert("jpg");
    set.insert("jpeg");
    set.insert("png");
    set.insert("gif");
    set.insert("bmp");
    set.insert("ico");
    set.insert("webp");

    // Archives
    set.insert("zip");
    set.insert("tar");
    set.insert("gz");
    set.insert("bz2");
    set.insert("7z");
    set.insert("rar");

    // Media and fonts
    set.insert("mp3");
    set.insert("mp4");
    set.insert("wav");
    set.insert("ttf");
    set.insert("woff");
    set.insert("woff2");

    set
});

/// Decoded file content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextContent {
    Text(String),
    Binary,
}

/// Hybrid binary detection: fast extension check first, then content inspection
pub fn is_binary(path: &Path, bytes: &[u8]) -> bool {
    let by_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| BINARY_EXTENSIONS.contains(ext.to_lowercase().as_str()));
    by_extension || content_inspector::inspect(&bytes[..bytes.len().min(SNIFF_LEN)]).is_binary()
}

/// Read a file as text, decoding invalid UTF-8 permissively.
pub fn read_text(path: &Path) -> std::io::Result<TextContent> {
    let bytes = std::fs::read(path)?;
    if is_binary(path, &bytes) {
        return Ok(TextContent::Binary);
    }
    Ok(TextContent::Text(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }))
}

/// Keep the first `limit` lines, line terminators included.
///
/// Text with `limit` lines or fewer is returned unchanged, so applying the
/// same limit twice is a no-op.
pub fn truncate_lines(text: &str, limit: usize) -> String {
    text.split_inclusive('\n').take(limit).collect()
}

/// Per-language markers of test code, keyed by file extension.
const TEST_INDICATORS: &[(&str, &[&str])] = &[
    (
        ".py",
        &["import unittest", "import pytest", "from unittest", "from pytest", "def test_"],
    ),
    (".go", &["import \"testing\"", "func Test", "t *testing.T"]),
    (
        ".js",
        &["describe(", "it(", "test(", "expect(", "require('assert')", "require(\"assert\")"],
    ),
    (".ts", &["describe(", "it(", "test(", "expect("]),
    (".java", &["import org.junit", "@Test"]),
    (".rs", &["#[test]", "#[cfg(test)]"]),
    (".rb", &["require 'minitest", "RSpec.describe"]),
    (".cs", &["[TestMethod]", "[Fact]", "using NUnit"]),
];

/// Whether `content` carries the test markers of its language.
pub fn looks_like_test(file_name: &str, content: &str) -> bool {
    TEST_INDICATORS
        .iter()
        .filter(|(extension, _)| file_name.ends_with(extension))
        .any(|(_, markers)| markers.iter().any(|marker| content.contains(marker)))
}

/// Lines that are neither blank nor a `#` or `//` comment.
pub fn substantive_lines(content: &str) -> usize {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with("//"))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_is_idempotent() {
        let text = "one\ntwo\nthree\nfour\n";
        let once = truncate_lines(text, 2);
        assert_eq!(once, "one\ntwo\n");
        assert_eq!(truncate_lines(&once, 2), once);
        assert_eq!(truncate_lines(text, 10), text);
        assert_eq!(truncate_lines("no newline", 1), "no newline");
        assert_eq!(truncate_lines(text, 0), "");
    }

    #[test]
    fn test_read_text_detects_binary() {
        let temp = tempfile::TempDir::new().unwrap();
        let text = temp.path().join("a.py");
        let blob = temp.path().join("blob.dat");
        let image = temp.path().join("logo.png");
        std::fs::write(&text, "print('ok')\n").unwrap();
        std::fs::write(&blob, [0u8, 159, 146, 150, 0, 1, 2]).unwrap();
        std::fs::write(&image, "not really an image").unwrap();

        assert_eq!(read_text(&text).unwrap(), TextContent::Text("print('ok')\n".into()));
        assert_eq!(read_text(&blob).unwrap(), TextContent::Binary);
        assert_eq!(read_text(&image).unwrap(), TextContent::Binary);
    }

    #[test]
    fn test_invalid_utf8_is_decoded_permissively() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("latin1.py");
        std::fs::write(&path, b"name = 'caf\xe9'\n").unwrap();
        match read_text(&path).unwrap() {
            TextContent::Text(text) => assert_eq!(text, "name = 'caf\u{FFFD}'\n"),
            TextContent::Binary => panic!("latin-1 text reported as binary"),
        }
    }

    #[test]
    fn test_looks_like_test() {
        assert!(looks_like_test("test_io.py", "import pytest\n\ndef test_read():\n    pass\n"));
        assert!(looks_like_test("io_test.go", "package io\nimport \"testing\"\n"));
        assert!(!looks_like_test("io.py", "import os\n"));
        assert!(!looks_like_test("notes.md", "def test_"));
    }

    #[test]
    fn test_substantive_lines() {
        let content = "# comment\n\nimport os\n// other\nx = 1\n   \n";
        assert_eq!(substantive_lines(content), 2);
    }
}
