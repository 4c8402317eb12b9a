use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::cli::Output;
use crate::config::WeaveConfig;
use crate::error::WeaveError;
use crate::weave::{
    CommandTreeRenderer, RunWarning, Transformer, WeaveReport, Weaver, persist, resolve_input,
};

#[derive(Args, Debug, Default)]
pub struct WeaveArgs {
    /// Local directory to weave
    #[arg(value_name = "FOLDER")]
    pub folder: String,

    /// Language identifiers to keep (see `codeweave languages`)
    #[arg(short, long, value_delimiter = ',')]
    pub lang: Vec<String>,

    /// Keep only paths matching one of these patterns
    #[arg(short, long, value_delimiter = ',')]
    pub include: Vec<String>,

    /// Drop paths matching any of these patterns
    #[arg(short, long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Directory names that are never entered (replaces the configured list)
    #[arg(long, value_delimiter = ',')]
    pub excluded_dirs: Vec<String>,

    /// Keep comments and docstrings in Python files
    #[arg(long)]
    pub keep_comments: bool,

    /// Emit notebooks as raw JSON
    #[arg(long)]
    pub no_notebook_conversion: bool,

    /// Extract text from PDF files instead of a placeholder
    #[arg(long)]
    pub pdf_text_mode: bool,

    /// Keep only the first N lines of every file
    #[arg(long, value_name = "N")]
    pub top_n: Option<usize>,

    /// Run a command per file instead of copying it, as language=command
    #[arg(long = "program", value_name = "LANG=CMD")]
    pub programs: Vec<String>,

    /// Emit the file content after the program output
    #[arg(long)]
    pub substitute: bool,

    /// Prepend a directory tree rendered by `tree`
    #[arg(long)]
    pub tree: bool,

    /// Extra flags passed to `tree`
    #[arg(long, value_name = "FLAGS", allow_hyphen_values = true)]
    pub tree_flags: Option<String>,

    /// Output file (default: <output dir>/<folder>_<langs>.txt)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Suffix inserted before the output file extension
    #[arg(long, value_name = "SUFFIX")]
    pub name_append: Option<String>,

    /// Processing mode
    #[arg(long, value_parser = ["auto", "sequential", "parallel"])]
    pub mode: Option<String>,

    /// Maximum worker threads
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// List the files that would be woven and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Write the document to standard output instead of a file
    #[arg(long)]
    pub stdout: bool,
}

impl WeaveArgs {
    /// Configuration values set on the command line; unset flags stay null.
    pub fn overrides(&self) -> serde_json::Value {
        json!({
            "filter": {
                "languages": self.lang,
                "include": self.include,
                "exclude": self.exclude,
                "excluded_dirs": self.excluded_dirs,
            },
            "transform": {
                "strip_comments": self.keep_comments.then_some(false),
                "convert_notebooks": self.no_notebook_conversion.then_some(false),
                "pdf_text_mode": self.pdf_text_mode.then_some(true),
                "top_n": self.top_n,
                "programs": self.programs,
                "substitute": self.substitute.then_some(true),
            },
            "output": {
                "name_append": self.name_append,
                "tree": self.tree.then_some(true),
                "tree_flags": self.tree_flags,
            },
            "execution": {
                "mode": self.mode,
                "max_threads": self.threads,
            },
        })
    }
}

pub fn execute(args: WeaveArgs, custom_config: Option<&Path>, output: &Output) -> Result<()> {
    let root = resolve_input(&args.folder, Path::new("."))?;
    let root = root
        .canonicalize()
        .with_context(|| format!("cannot resolve {}", root.display()))?;

    let config = WeaveConfig::load(custom_config, Some(&args.overrides()))?;
    let spec = config.filter_spec()?;
    let transformer = Transformer::new(config.transform_options()?);

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
        tracing::warn!(error = %e, "cannot install Ctrl-C handler");
    }

    let mut weaver = Weaver::new(spec, transformer)
        .with_execution(config.execution_settings()?)
        .with_cancel_flag(cancel);
    if config.output.tree {
        weaver = weaver.with_tree_renderer(Box::new(CommandTreeRenderer::new(
            &config.output.tree_flags,
            config.program_timeout(),
        )));
    }

    if args.dry_run {
        return dry_run(&weaver, &root, output);
    }

    let report = weaver.run(&root)?;
    report_warnings(&report.warnings, output);

    if args.stdout {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(report.document.render().as_bytes())?;
        stdout.flush()?;
    } else {
        let destination = args.output.clone().unwrap_or_else(|| config.output_path(&root));
        persist(&report.document, &destination)?;
        output.success(&format!(
            "Wove {} files into {}",
            report.stats.emitted,
            destination.display()
        ));
    }
    summarize(&report, output);
    Ok(())
}

fn dry_run(weaver: &Weaver, root: &Path, output: &Output) -> Result<()> {
    let discovery = weaver.discover(root)?;
    for warning in &discovery.warnings {
        output.warning(&warning.to_string());
    }
    if discovery.candidates.is_empty() {
        return Err(WeaveError::NoContent.into());
    }
    for candidate in &discovery.candidates {
        println!("{}", candidate.relative_path);
    }
    output.info(&format!("{} files would be woven", discovery.candidates.len()));
    Ok(())
}

fn report_warnings(warnings: &[RunWarning], output: &Output) {
    for warning in warnings {
        output.warning(&warning.to_string());
    }
}

fn summarize(report: &WeaveReport, output: &Output) {
    let stats = &report.stats;
    output.info(&format!(
        "{} emitted, {} skipped, {} failed, {} directories pruned, {} warnings in {:.2}s",
        stats.emitted,
        stats.skipped,
        stats.failed,
        stats.traversal.directories_pruned,
        report.warnings.len(),
        stats.duration.as_secs_f64()
    ));
    for (reason, count) in &stats.traversal.files_rejected {
        output.verbose_breakdown(&format!("rejected: {reason}"), *count);
    }
}
