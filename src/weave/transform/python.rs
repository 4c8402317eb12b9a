//! Comment and docstring stripping for Python source.
//!
//! A small lexer splits the source into code, string literals, comments and
//! newlines, then groups tokens into logical lines (newlines inside brackets
//! or after a backslash continue the line). Comments are dropped, lines
//! left blank by a dropped comment disappear, and a string literal standing
//! alone as the first statement of a module, class or function is removed.
//! If that empties a block, `pass` keeps it valid. Everything else is copied
//! byte for byte.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static BLOCK_HEADER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\s*(?:async\s+def|def|class)\b[\s\S]*:\s*$").ok());

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StripError {
    #[error("unterminated string literal starting on line {line}")]
    UnterminatedString { line: usize },

    #[error("unbalanced bracket on line {line}")]
    UnbalancedBracket { line: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Code(&'a str),
    Str(&'a str),
    Comment(&'a str),
    /// `logical` is false inside brackets or after a line continuation.
    Newline { logical: bool },
}

fn line_at(source: &str, offset: usize) -> usize {
    source[..offset].bytes().filter(|b| *b == b'\n').count() + 1
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

fn is_prefix_byte(b: u8) -> bool {
    matches!(b, b'r' | b'R' | b'b' | b'B' | b'u' | b'U' | b'f' | b'F')
}

fn flush<'a>(tokens: &mut Vec<Token<'a>>, source: &'a str, from: usize, to: usize) {
    if from < to {
        tokens.push(Token::Code(&source[from..to]));
    }
}

fn tokenize(source: &str) -> Result<Vec<Token<'_>>, StripError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut depth: i64 = 0;
    let mut code_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'#' => {
                flush(&mut tokens, source, code_start, i);
                let end = source[i..].find('\n').map_or(bytes.len(), |p| i + p);
                tokens.push(Token::Comment(&source[i..end]));
                i = end;
                code_start = i;
            }
            quote @ (b'\'' | b'"') => {
                // Up to two prefix letters (r, b, u, f) glued to the quote.
                let mut start = i;
                while start > code_start && i - start < 2 && is_prefix_byte(bytes[start - 1]) {
                    start -= 1;
                }
                if start < i && start > 0 && is_ident_byte(bytes[start - 1]) {
                    start = i;
                }
                flush(&mut tokens, source, code_start, start);

                let triple = bytes.get(i + 1) == Some(&quote) && bytes.get(i + 2) == Some(&quote);
                let mut j = if triple { i + 3 } else { i + 1 };
                let end = loop {
                    let Some(&b) = bytes.get(j) else {
                        return Err(StripError::UnterminatedString {
                            line: line_at(source, i),
                        });
                    };
                    if b == b'\\' {
                        j += 2;
                        continue;
                    }
                    if triple {
                        if b == quote && bytes.get(j + 1) == Some(&quote) && bytes.get(j + 2) == Some(&quote) {
                            break j + 3;
                        }
                    } else if b == quote {
                        break j + 1;
                    } else if b == b'\n' {
                        return Err(StripError::UnterminatedString {
                            line: line_at(source, i),
                        });
                    }
                    j += 1;
                };
                tokens.push(Token::Str(&source[start..end]));
                i = end;
                code_start = i;
            }
            b'(' | b'[' | b'{' => {
                depth += 1;
                i += 1;
            }
            b')' | b']' | b'}' => {
                depth -= 1;
                if depth < 0 {
                    return Err(StripError::UnbalancedBracket {
                        line: line_at(source, i),
                    });
                }
                i += 1;
            }
            b'\n' => {
                let continued = source[code_start..i].trim_end_matches('\r').ends_with('\\');
                flush(&mut tokens, source, code_start, i);
                tokens.push(Token::Newline {
                    logical: depth == 0 && !continued,
                });
                i += 1;
                code_start = i;
            }
            _ => i += 1,
        }
    }
    flush(&mut tokens, source, code_start, bytes.len());

    if depth != 0 {
        return Err(StripError::UnbalancedBracket {
            line: line_at(source, bytes.len()),
        });
    }
    Ok(tokens)
}

struct LogicalLine<'a> {
    tokens: Vec<Token<'a>>,
}

impl<'a> LogicalLine<'a> {
    fn indent(&self) -> &'a str {
        match self.tokens.first() {
            Some(&Token::Code(text)) => {
                let trimmed = text.trim_start_matches([' ', '\t']);
                &text[..text.len() - trimmed.len()]
            }
            _ => "",
        }
    }

    fn indent_width(&self) -> usize {
        self.indent()
            .chars()
            .map(|c| if c == '\t' { 8 } else { 1 })
            .sum()
    }

    /// Code text with comments and newlines removed.
    fn code(&self) -> String {
        self.tokens
            .iter()
            .filter_map(|token| match token {
                Token::Code(text) | Token::Str(text) => Some(*text),
                _ => None,
            })
            .collect()
    }

    fn is_significant(&self) -> bool {
        !self.code().trim().is_empty()
    }

    fn is_block_header(&self) -> bool {
        let code = self.code();
        BLOCK_HEADER.as_ref().is_some_and(|header| header.is_match(&code))
    }

    /// Nothing but string literals (implicit concatenation allowed).
    fn is_bare_string(&self) -> bool {
        let mut saw_string = false;
        for token in &self.tokens {
            match token {
                Token::Str(_) => saw_string = true,
                Token::Code(text) if text.trim().is_empty() || text.trim() == "\\" => {}
                Token::Code(_) => return false,
                Token::Comment(_) | Token::Newline { .. } => {}
            }
        }
        saw_string
    }
}

fn logical_lines(tokens: Vec<Token<'_>>) -> Vec<LogicalLine<'_>> {
    let mut lines = Vec::new();
    let mut current = Vec::new();
    for token in tokens {
        let ends_line = matches!(token, Token::Newline { logical: true });
        current.push(token);
        if ends_line {
            lines.push(LogicalLine {
                tokens: std::mem::take(&mut current),
            });
        }
    }
    if !current.is_empty() {
        lines.push(LogicalLine { tokens: current });
    }
    lines
}

/// Indices of docstring lines, paired with whether removing them empties
/// their block.
fn find_docstrings(lines: &[LogicalLine<'_>]) -> Vec<(usize, bool)> {
    let significant: Vec<usize> = (0..lines.len()).filter(|&i| lines[i].is_significant()).collect();
    let mut docstrings = Vec::new();

    for (position, &index) in significant.iter().enumerate() {
        let line = &lines[index];
        if !line.is_bare_string() {
            continue;
        }
        let previous = position.checked_sub(1).map(|p| &lines[significant[p]]);
        let owner_width = match previous {
            None => None,
            Some(header) if header.is_block_header() && header.indent_width() < line.indent_width() => {
                Some(header.indent_width())
            }
            Some(_) => continue,
        };
        let empties_block = match owner_width {
            None => false,
            Some(width) => significant
                .get(position + 1)
                .is_none_or(|&next| lines[next].indent_width() <= width),
        };
        docstrings.push((index, empties_block));
    }
    docstrings
}

/// Remove comments and docstrings from Python source.
pub fn strip_python(source: &str) -> Result<String, StripError> {
    let lines = logical_lines(tokenize(source)?);
    let docstrings = find_docstrings(&lines);

    let mut out = String::with_capacity(source.len());
    for (index, line) in lines.iter().enumerate() {
        if let Some(&(_, empties_block)) = docstrings.iter().find(|(i, _)| *i == index) {
            if empties_block {
                out.push_str(line.indent());
                out.push_str("pass\n");
            }
            continue;
        }

        let mut had_comment = false;
        for token in &line.tokens {
            match token {
                Token::Code(text) | Token::Str(text) => out.push_str(text),
                Token::Comment(_) => {
                    let kept = out.trim_end_matches([' ', '\t']).len();
                    out.truncate(kept);
                    had_comment = true;
                }
                Token::Newline { .. } => {
                    let line_start = out.rfind('\n').map_or(0, |p| p + 1);
                    if had_comment && out[line_start..].trim().is_empty() {
                        out.truncate(line_start);
                    } else {
                        out.push('\n');
                    }
                    had_comment = false;
                }
            }
        }
        if had_comment {
            let line_start = out.rfind('\n').map_or(0, |p| p + 1);
            if out[line_start..].trim().is_empty() {
                out.truncate(line_start);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_header_pattern_compiles() {
        let header = BLOCK_HEADER.as_ref().expect("block header regex");
        assert!(header.is_match("def f(x):"));
        assert!(header.is_match("async def run(self) -> None:"));
        assert!(header.is_match("class A(Base):"));
        assert!(!header.is_match("x = {'a': 1}"));
    }

    #[test]
    fn test_removes_comment_lines_and_trailing_comments() {
        let source = "# header\nimport os  # needed\n\n    # indented note\nx = 1\n";
        assert_eq!(strip_python(source).unwrap(), "import os\n\nx = 1\n");
    }

    #[test]
    fn test_hash_inside_strings_is_kept() {
        let source = "url = 'http://x/#anchor'  # drop\ncolor = \"#fff\"\n";
        assert_eq!(
            strip_python(source).unwrap(),
            "url = 'http://x/#anchor'\ncolor = \"#fff\"\n"
        );
    }

    #[test]
    fn test_removes_module_function_and_class_docstrings() {
        let source = r#""""Module doc."""
import os


class Greeter:
    """Says hello."""

    def greet(self, name):
        '''Greet someone.

        Multi-line.
        '''
        return f"hi {name}"
"#;
        let expected = r#"import os


class Greeter:

    def greet(self, name):
        return f"hi {name}"
"#;
        assert_eq!(strip_python(source).unwrap(), expected);
    }

    #[test]
    fn test_docstring_only_body_becomes_pass() {
        let source = "def todo():\n    \"\"\"Not yet.\"\"\"\n\nx = 1\n";
        assert_eq!(strip_python(source).unwrap(), "def todo():\n    pass\n\nx = 1\n");
    }

    #[test]
    fn test_strings_that_are_not_docstrings_stay() {
        let source = "x = 1\n\"\"\"not a docstring position\"\"\"\nvalue = \"\"\"kept\"\"\"\n";
        assert_eq!(strip_python(source).unwrap(), source);
    }

    #[test]
    fn test_prefixed_and_multiline_header_docstrings() {
        let source = "def f(\n    a,  # first\n    b,\n):\n    r\"\"\"Raw doc.\"\"\"\n    return a\n";
        assert_eq!(
            strip_python(source).unwrap(),
            "def f(\n    a,\n    b,\n):\n    return a\n"
        );
    }

    #[test]
    fn test_comment_inside_brackets_on_its_own_line() {
        let source = "items = [\n    1,\n    # two is skipped\n    3,\n]\n";
        assert_eq!(strip_python(source).unwrap(), "items = [\n    1,\n    3,\n]\n");
    }

    #[test]
    fn test_identifier_ending_in_prefix_letter_is_not_a_prefix() {
        let source = "print(arr'x')\n";
        assert_eq!(strip_python(source).unwrap(), source);
        let source = "call(b\"bytes\")  # c\n";
        assert_eq!(strip_python(source).unwrap(), "call(b\"bytes\")\n");
    }

    #[test]
    fn test_malformed_source_is_an_error() {
        assert_eq!(
            strip_python("x = \"open\ny = 2\n"),
            Err(StripError::UnterminatedString { line: 1 })
        );
        assert_eq!(
            strip_python("s = '''never closed\n"),
            Err(StripError::UnterminatedString { line: 1 })
        );
        assert_eq!(
            strip_python("f(1, 2\n"),
            Err(StripError::UnbalancedBracket { line: 2 })
        );
        assert_eq!(
            strip_python("x = 1)\n"),
            Err(StripError::UnbalancedBracket { line: 1 })
        );
    }

    #[test]
    fn test_output_without_comments_is_unchanged() {
        let source = "def add(a, b):\n    return a + b\n";
        assert_eq!(strip_python(source).unwrap(), source);
    }
}
