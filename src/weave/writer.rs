//! Aggregation writer
//!
//! [`assemble`] only builds the in-memory document; [`persist`] is the single
//! place that touches the destination, and it either replaces the file
//! completely or leaves it alone.

use crate::error::WeaveError;
use crate::weave::transform::TransformResult;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Default)]
pub struct AssembleOptions {
    /// Comment leader for block headers, `# ` or `// `.
    pub comment_prefix: &'static str,
    /// Pre-rendered directory tree, emitted verbatim before the first block.
    pub tree: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub relative_path: String,
    pub text: String,
}

/// Ordered blocks plus an optional tree prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDocument {
    comment_prefix: &'static str,
    tree: Option<String>,
    blocks: Vec<Block>,
}

impl OutputDocument {
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn tree(&self) -> Option<&str> {
        self.tree.as_deref()
    }

    pub fn header(&self, relative_path: &str) -> String {
        format!("{}File: {}", self.comment_prefix, relative_path)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(tree) = &self.tree {
            out.push_str(tree);
            push_line_end(&mut out);
            out.push('\n');
        }
        for block in &self.blocks {
            out.push_str(&self.header(&block.relative_path));
            out.push('\n');
            out.push_str(&block.text);
            push_line_end(&mut out);
            out.push('\n');
        }
        out
    }
}

fn push_line_end(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

/// Collect emitted results, in the order given, into a document.
///
/// Fails with [`WeaveError::NoContent`] when nothing would be emitted.
pub fn assemble<I>(results: I, options: &AssembleOptions) -> Result<OutputDocument, WeaveError>
where
    I: IntoIterator<Item = TransformResult>,
{
    let blocks: Vec<Block> = results
        .into_iter()
        .filter_map(|result| {
            result.text.map(|text| Block {
                relative_path: result.relative_path,
                text,
            })
        })
        .collect();

    if blocks.is_empty() {
        return Err(WeaveError::NoContent);
    }

    Ok(OutputDocument {
        comment_prefix: options.comment_prefix,
        tree: options.tree.clone(),
        blocks,
    })
}

/// Write `document` to `destination` through a temporary file in the same
/// directory, renamed into place once fully written.
pub fn persist(document: &OutputDocument, destination: &Path) -> Result<(), WeaveError> {
    let io_error = |source: std::io::Error| WeaveError::Io {
        path: destination.to_path_buf(),
        source,
    };

    let parent = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(io_error)?;

    let mut file = NamedTempFile::new_in(parent).map_err(io_error)?;
    file.write_all(document.render().as_bytes()).map_err(io_error)?;
    file.flush().map_err(io_error)?;
    file.persist(destination).map_err(|e| io_error(e.error))?;

    tracing::info!(path = %destination.display(), blocks = document.blocks().len(), "wrote document");
    Ok(())
}
