//! Content transformer
//!
//! Exactly one [`ContentPolicy`] applies to each candidate. The priority order
//! lives in [`resolve_policy`]; everything with side effects (subprocesses,
//! notebook parsing, PDF extraction) sits behind a capability trait so tests
//! can swap it out. A preview limit, when set, is applied to every policy's
//! output after the policy has run.

pub mod notebook;
pub mod pdf;
pub mod program;
pub mod python;
pub mod text;

pub use notebook::{NotebookConverter, NotebookError, ScriptExporter};
pub use pdf::{PdfExtractor, PdftotextExtractor};
pub use program::{ProgramError, ProgramMapping, ProgramRunner, ShellProgramRunner, find_mapping};
pub use python::{StripError, strip_python};
pub use text::{TextContent, truncate_lines};

use crate::weave::traversal::FileCandidate;
use std::sync::Arc;
use std::time::Duration;

pub const PDF_PLACEHOLDER: &str = "[PDF file - use --pdf-text-mode to extract text]";
pub const BINARY_PLACEHOLDER: &str = "[binary content omitted]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPolicy {
    PassThrough,
    StripComments,
    ConvertNotebook,
    ExtractPdfText,
    PdfPlaceholder,
    ExternalProgram { command: String, substitute: bool },
}

impl ContentPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            ContentPolicy::PassThrough => "pass-through",
            ContentPolicy::StripComments => "strip-comments",
            ContentPolicy::ConvertNotebook => "convert-notebook",
            ContentPolicy::ExtractPdfText => "extract-pdf-text",
            ContentPolicy::PdfPlaceholder => "pdf-placeholder",
            ContentPolicy::ExternalProgram { .. } => "external-program",
        }
    }

    /// Policies that load the whole file into memory themselves.
    fn reads_file(&self) -> bool {
        matches!(
            self,
            ContentPolicy::PassThrough | ContentPolicy::StripComments | ContentPolicy::ConvertNotebook
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformStatus {
    Ok,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformResult {
    pub relative_path: String,
    pub policy: ContentPolicy,
    /// Text to emit; `None` omits the file from the document.
    pub text: Option<String>,
    pub status: TransformStatus,
    /// Set when the file was emitted in a degraded form.
    pub warning: Option<String>,
}

impl TransformResult {
    fn ok(candidate: &FileCandidate, policy: ContentPolicy, text: impl Into<String>) -> Self {
        Self {
            relative_path: candidate.relative_path.clone(),
            policy,
            text: Some(text.into()),
            status: TransformStatus::Ok,
            warning: None,
        }
    }

    fn skipped(candidate: &FileCandidate, policy: ContentPolicy, reason: impl Into<String>) -> Self {
        Self {
            relative_path: candidate.relative_path.clone(),
            policy,
            text: None,
            status: TransformStatus::Skipped(reason.into()),
            warning: None,
        }
    }

    fn failed(candidate: &FileCandidate, policy: ContentPolicy, reason: impl Into<String>) -> Self {
        Self {
            relative_path: candidate.relative_path.clone(),
            policy,
            text: None,
            status: TransformStatus::Failed(reason.into()),
            warning: None,
        }
    }

    fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }

    pub fn is_emitted(&self) -> bool {
        self.text.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct TransformOptions {
    pub strip_comments: bool,
    pub convert_notebooks: bool,
    pub pdf_text_mode: bool,
    /// Keep only this many lines of every block.
    pub top_n: Option<usize>,
    pub programs: Vec<ProgramMapping>,
    /// Emit the file content after the program output.
    pub substitute: bool,
    pub program_timeout: Duration,
    pub max_file_size: Option<u64>,
    pub skip_test_files: bool,
    pub min_lines: usize,
    /// Comment leader for labels written into blocks.
    pub comment_prefix: &'static str,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            strip_comments: false,
            convert_notebooks: true,
            pdf_text_mode: false,
            top_n: None,
            programs: Vec::new(),
            substitute: false,
            program_timeout: Duration::from_secs(30),
            max_file_size: None,
            skip_test_files: false,
            min_lines: 0,
            comment_prefix: "# ",
        }
    }
}

/// Pick the single policy for `candidate`, in priority order.
pub fn resolve_policy(candidate: &FileCandidate, options: &TransformOptions) -> ContentPolicy {
    if let Some(mapping) = find_mapping(&options.programs, candidate.file_name()) {
        return ContentPolicy::ExternalProgram {
            command: mapping.command.clone(),
            substitute: options.substitute,
        };
    }
    if candidate.has_extension(".ipynb") && options.convert_notebooks {
        return ContentPolicy::ConvertNotebook;
    }
    if candidate.has_extension(".pdf") {
        return if options.pdf_text_mode {
            ContentPolicy::ExtractPdfText
        } else {
            ContentPolicy::PdfPlaceholder
        };
    }
    if candidate.has_extension(".py") && options.strip_comments {
        return ContentPolicy::StripComments;
    }
    ContentPolicy::PassThrough
}

/// Applies content policies to candidates. Shared read-only across workers.
pub struct Transformer {
    options: TransformOptions,
    programs: Arc<dyn ProgramRunner>,
    notebooks: Arc<dyn NotebookConverter>,
    pdfs: Arc<dyn PdfExtractor>,
}

impl Transformer {
    pub fn new(options: TransformOptions) -> Self {
        let timeout = options.program_timeout;
        Self {
            options,
            programs: Arc::new(ShellProgramRunner::new(timeout)),
            notebooks: Arc::new(ScriptExporter),
            pdfs: Arc::new(PdftotextExtractor::new(timeout)),
        }
    }

    pub fn with_program_runner(mut self, runner: Arc<dyn ProgramRunner>) -> Self {
        self.programs = runner;
        self
    }

    pub fn with_notebook_converter(mut self, converter: Arc<dyn NotebookConverter>) -> Self {
        self.notebooks = converter;
        self
    }

    pub fn with_pdf_extractor(mut self, extractor: Arc<dyn PdfExtractor>) -> Self {
        self.pdfs = extractor;
        self
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    pub fn transform(&self, candidate: &FileCandidate) -> TransformResult {
        let policy = resolve_policy(candidate, &self.options);
        tracing::trace!(path = %candidate.relative_path, policy = policy.name(), "transforming");

        let mut result = match self.options.max_file_size {
            Some(limit) if policy.reads_file() && candidate.size > limit => {
                TransformResult::skipped(candidate, policy, "file too large")
            }
            _ => self.apply(candidate, policy),
        };

        if let (Some(limit), Some(text)) = (self.options.top_n, result.text.as_mut()) {
            *text = truncate_lines(text, limit);
        }
        result
    }

    fn apply(&self, candidate: &FileCandidate, policy: ContentPolicy) -> TransformResult {
        let path = candidate.absolute_path.as_path();
        match policy {
            ContentPolicy::ExternalProgram {
                ref command,
                substitute,
            } => {
                let command = command.clone();
                self.run_program(candidate, policy, &command, substitute)
            }
            ContentPolicy::ConvertNotebook => match self.notebooks.convert(path) {
                Ok(script) => self.screen(candidate, policy, script),
                Err(e) => {
                    tracing::warn!(path = %candidate.relative_path, error = %e, "notebook conversion failed, emitting raw JSON");
                    let warning = format!("notebook conversion failed ({e}), raw JSON emitted");
                    self.pass_through(candidate, policy).with_warning(warning)
                }
            },
            ContentPolicy::ExtractPdfText => match self.pdfs.extract(path) {
                Ok(text) => TransformResult::ok(candidate, policy, text),
                Err(e) => {
                    let reason = format!("PDF text extraction failed: {e}");
                    tracing::warn!(path = %candidate.relative_path, %reason);
                    TransformResult::failed(candidate, policy, reason.clone())
                        .with_text(format!("[{reason}]"))
                }
            },
            ContentPolicy::PdfPlaceholder => TransformResult::ok(candidate, policy, PDF_PLACEHOLDER),
            ContentPolicy::StripComments => match text::read_text(path) {
                Ok(TextContent::Text(source)) => {
                    if let Some(skip) = self.heuristic_skip(candidate, &source) {
                        return TransformResult::skipped(candidate, policy, skip);
                    }
                    match strip_python(&source) {
                        Ok(stripped) => TransformResult::ok(candidate, policy, stripped),
                        Err(e) => {
                            tracing::warn!(path = %candidate.relative_path, error = %e, "malformed Python, emitting unchanged");
                            TransformResult::ok(candidate, policy, source)
                                .with_warning(format!("comments kept, source is malformed: {e}"))
                        }
                    }
                }
                Ok(TextContent::Binary) => binary(candidate, policy),
                Err(e) => TransformResult::failed(candidate, policy, format!("cannot read file: {e}")),
            },
            ContentPolicy::PassThrough => self.pass_through(candidate, policy),
        }
    }

    fn run_program(
        &self,
        candidate: &FileCandidate,
        policy: ContentPolicy,
        command: &str,
        substitute: bool,
    ) -> TransformResult {
        let path = candidate.absolute_path.as_path();
        match self.programs.run(command, path) {
            Ok(output) => {
                let mut block = format!("{}Program output:\n{}", self.options.comment_prefix, output);
                if !substitute {
                    return TransformResult::ok(candidate, policy, block);
                }
                ensure_newline(&mut block);
                match text::read_text(path) {
                    Ok(TextContent::Text(content)) => block.push_str(&content),
                    Ok(TextContent::Binary) => block.push_str(BINARY_PLACEHOLDER),
                    Err(e) => {
                        return TransformResult::ok(candidate, policy, block)
                            .with_warning(format!("program output kept, source unreadable: {e}"));
                    }
                }
                TransformResult::ok(candidate, policy, block)
            }
            Err(e) => {
                let reason = format!("program '{command}' failed: {e}");
                tracing::warn!(path = %candidate.relative_path, %reason, "skipping file");
                TransformResult::failed(candidate, policy, reason)
            }
        }
    }

    fn pass_through(&self, candidate: &FileCandidate, policy: ContentPolicy) -> TransformResult {
        match text::read_text(&candidate.absolute_path) {
            Ok(TextContent::Text(content)) => self.screen(candidate, policy, content),
            Ok(TextContent::Binary) => binary(candidate, policy),
            Err(e) => TransformResult::failed(candidate, policy, format!("cannot read file: {e}")),
        }
    }

    /// Emit `content` unless a content heuristic rules it out.
    fn screen(&self, candidate: &FileCandidate, policy: ContentPolicy, content: String) -> TransformResult {
        match self.heuristic_skip(candidate, &content) {
            Some(reason) => TransformResult::skipped(candidate, policy, reason),
            None => TransformResult::ok(candidate, policy, content),
        }
    }

    fn heuristic_skip(&self, candidate: &FileCandidate, content: &str) -> Option<&'static str> {
        if self.options.skip_test_files && text::looks_like_test(candidate.file_name(), content) {
            return Some("test file");
        }
        if self.options.min_lines > 0 && text::substantive_lines(content) < self.options.min_lines {
            return Some("insufficient content");
        }
        None
    }
}

fn binary(candidate: &FileCandidate, policy: ContentPolicy) -> TransformResult {
    TransformResult::skipped(candidate, policy, "binary content").with_text(BINARY_PLACEHOLDER)
}

fn ensure_newline(text: &mut String) {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::notebook::MockNotebookConverter;
    use super::pdf::MockPdfExtractor;
    use super::program::MockProgramRunner;
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn candidate(dir: &TempDir, relative: &str, content: &[u8]) -> FileCandidate {
        let path = dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        FileCandidate::new(path, relative.to_string(), content.len() as u64)
    }

    fn mapping(raw: &str) -> ProgramMapping {
        ProgramMapping::parse(raw).unwrap()
    }

    #[test]
    fn test_policy_priority() {
        let temp = TempDir::new().unwrap();
        let py = candidate(&temp, "a.py", b"x = 1\n");
        let nb = candidate(&temp, "b.ipynb", b"{}");
        let pdf = candidate(&temp, "c.pdf", b"%PDF");
        let md = candidate(&temp, "d.md", b"# hi\n");

        let mut options = TransformOptions {
            strip_comments: true,
            ..Default::default()
        };
        assert_eq!(resolve_policy(&py, &options), ContentPolicy::StripComments);
        assert_eq!(resolve_policy(&nb, &options), ContentPolicy::ConvertNotebook);
        assert_eq!(resolve_policy(&pdf, &options), ContentPolicy::PdfPlaceholder);
        assert_eq!(resolve_policy(&md, &options), ContentPolicy::PassThrough);

        options.pdf_text_mode = true;
        options.convert_notebooks = false;
        assert_eq!(resolve_policy(&pdf, &options), ContentPolicy::ExtractPdfText);
        assert_eq!(resolve_policy(&nb, &options), ContentPolicy::PassThrough);

        options.programs = vec![mapping("*=cat")];
        for file in [&py, &nb, &pdf, &md] {
            assert_eq!(
                resolve_policy(file, &options),
                ContentPolicy::ExternalProgram {
                    command: "cat".into(),
                    substitute: false
                }
            );
        }
    }

    #[test]
    fn test_program_output_replaces_source() {
        let temp = TempDir::new().unwrap();
        let file = candidate(&temp, "src/main.py", b"print('secret source')\n");

        let mut runner = MockProgramRunner::new();
        runner
            .expect_run()
            .withf(|command, _| command == "wc -l")
            .times(1)
            .returning(|_, _| Ok("1 src/main.py\n".to_string()));

        let transformer = Transformer::new(TransformOptions {
            programs: vec![mapping("python=wc -l")],
            ..Default::default()
        })
        .with_program_runner(Arc::new(runner));

        let result = transformer.transform(&file);
        assert_eq!(result.status, TransformStatus::Ok);
        assert_eq!(result.text.as_deref(), Some("# Program output:\n1 src/main.py\n"));
    }

    #[test]
    fn test_substitute_keeps_source_after_output() {
        let temp = TempDir::new().unwrap();
        let file = candidate(&temp, "main.py", b"x = 1\n");

        let mut runner = MockProgramRunner::new();
        runner.expect_run().returning(|_, _| Ok("1".to_string()));

        let transformer = Transformer::new(TransformOptions {
            programs: vec![mapping("python=wc -l")],
            substitute: true,
            ..Default::default()
        })
        .with_program_runner(Arc::new(runner));

        let result = transformer.transform(&file);
        assert_eq!(result.text.as_deref(), Some("# Program output:\n1\nx = 1\n"));
    }

    #[test]
    fn test_program_failure_omits_file() {
        let temp = TempDir::new().unwrap();
        let file = candidate(&temp, "main.py", b"x = 1\n");

        let mut runner = MockProgramRunner::new();
        runner
            .expect_run()
            .returning(|_, _| Err(ProgramError::TimedOut(Duration::from_secs(1))));

        let transformer = Transformer::new(TransformOptions {
            programs: vec![mapping("*=slow")],
            ..Default::default()
        })
        .with_program_runner(Arc::new(runner));

        let result = transformer.transform(&file);
        assert!(!result.is_emitted());
        assert!(matches!(result.status, TransformStatus::Failed(ref reason) if reason.contains("timed out")));
    }

    #[test]
    fn test_notebook_failure_falls_back_to_raw_json() {
        let temp = TempDir::new().unwrap();
        let file = candidate(&temp, "nb.ipynb", b"{\"cells\": oops");

        let mut converter = MockNotebookConverter::new();
        converter.expect_convert().returning(|_| {
            Err(NotebookError::Io(std::io::Error::other("converter crashed")))
        });

        let transformer = Transformer::new(TransformOptions::default())
            .with_notebook_converter(Arc::new(converter));

        let result = transformer.transform(&file);
        assert_eq!(result.status, TransformStatus::Ok);
        assert_eq!(result.text.as_deref(), Some("{\"cells\": oops"));
        assert!(result.warning.unwrap().contains("converter crashed"));
    }

    #[test]
    fn test_pdf_modes() {
        let temp = TempDir::new().unwrap();
        let file = candidate(&temp, "paper.pdf", b"%PDF-1.4");

        let placeholder = Transformer::new(TransformOptions::default()).transform(&file);
        assert_eq!(placeholder.text.as_deref(), Some(PDF_PLACEHOLDER));

        let mut extractor = MockPdfExtractor::new();
        extractor
            .expect_extract()
            .returning(|_| Err(ProgramError::EmptyCommand));
        let failed = Transformer::new(TransformOptions {
            pdf_text_mode: true,
            ..Default::default()
        })
        .with_pdf_extractor(Arc::new(extractor))
        .transform(&file);
        assert!(matches!(failed.status, TransformStatus::Failed(_)));
        assert!(failed.text.unwrap().starts_with("[PDF text extraction failed"));

        let mut extractor = MockPdfExtractor::new();
        extractor
            .expect_extract()
            .returning(|_| Ok("Abstract\n".to_string()));
        let extracted = Transformer::new(TransformOptions {
            pdf_text_mode: true,
            ..Default::default()
        })
        .with_pdf_extractor(Arc::new(extractor))
        .transform(&file);
        assert_eq!(extracted.text.as_deref(), Some("Abstract\n"));
    }

    #[test]
    fn test_strip_comments_with_malformed_fallback() {
        let temp = TempDir::new().unwrap();
        let good = candidate(&temp, "good.py", b"# note\nx = 1  # one\n");
        let bad = candidate(&temp, "bad.py", b"x = 'unterminated\n");

        let transformer = Transformer::new(TransformOptions {
            strip_comments: true,
            ..Default::default()
        });
        assert_eq!(transformer.transform(&good).text.as_deref(), Some("x = 1\n"));

        let fallback = transformer.transform(&bad);
        assert_eq!(fallback.text.as_deref(), Some("x = 'unterminated\n"));
        assert!(fallback.warning.is_some());
    }

    #[test]
    fn test_binary_content_gets_placeholder() {
        let temp = TempDir::new().unwrap();
        let file = candidate(&temp, "data.py", &[0, 1, 2, 3, 0]);
        let result = Transformer::new(TransformOptions::default()).transform(&file);
        assert_eq!(result.text.as_deref(), Some(BINARY_PLACEHOLDER));
        assert_eq!(result.status, TransformStatus::Skipped("binary content".into()));
    }

    #[test]
    fn test_preview_applies_after_every_policy() {
        let temp = TempDir::new().unwrap();
        let file = candidate(&temp, "main.py", b"a = 1\nb = 2\nc = 3\n");

        let mut runner = MockProgramRunner::new();
        runner
            .expect_run()
            .returning(|_, _| Ok("l1\nl2\nl3\n".to_string()));

        let plain = Transformer::new(TransformOptions {
            top_n: Some(2),
            ..Default::default()
        });
        let once = plain.transform(&file).text.unwrap();
        assert_eq!(once, "a = 1\nb = 2\n");
        assert_eq!(truncate_lines(&once, 2), once);

        let program = Transformer::new(TransformOptions {
            top_n: Some(2),
            programs: vec![mapping("python=lines")],
            ..Default::default()
        })
        .with_program_runner(Arc::new(runner));
        assert_eq!(
            program.transform(&file).text.as_deref(),
            Some("# Program output:\nl1\n")
        );
    }

    #[test]
    fn test_heuristics_and_size_limit() {
        let temp = TempDir::new().unwrap();
        let test_file = candidate(&temp, "test_io.py", b"import pytest\n\ndef test_x():\n    assert True\n");
        let tiny = candidate(&temp, "tiny.py", b"x = 1\n");
        let big = candidate(&temp, "big.py", &vec![b'x'; 2048]);

        let transformer = Transformer::new(TransformOptions {
            skip_test_files: true,
            min_lines: 2,
            max_file_size: Some(1024),
            ..Default::default()
        });
        assert_eq!(
            transformer.transform(&test_file).status,
            TransformStatus::Skipped("test file".into())
        );
        assert_eq!(
            transformer.transform(&tiny).status,
            TransformStatus::Skipped("insufficient content".into())
        );
        assert_eq!(
            transformer.transform(&big).status,
            TransformStatus::Skipped("file too large".into())
        );
    }
}
