use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotebookError {
    #[error("cannot read notebook: {0}")]
    Io(#[from] std::io::Error),

    #[error("notebook is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Turns a Jupyter notebook into a plain script.
#[cfg_attr(test, mockall::automock)]
pub trait NotebookConverter: Send + Sync {
    fn convert(&self, path: &Path) -> Result<String, NotebookError>;
}

#[derive(Debug, Deserialize)]
struct Notebook {
    cells: Vec<Cell>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    cell_type: String,
    #[serde(default)]
    source: Source,
    #[serde(default)]
    execution_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Source {
    Lines(Vec<String>),
    Text(String),
}

impl Default for Source {
    fn default() -> Self {
        Source::Text(String::new())
    }
}

impl Source {
    fn text(&self) -> String {
        match self {
            Source::Lines(lines) => lines.concat(),
            Source::Text(text) => text.clone(),
        }
    }
}

/// Reads the notebook JSON directly and renders it the way a script export
/// does: code cells verbatim under an `# In[n]:` marker, markdown cells as
/// `#` comments, raw cells dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptExporter;

impl ScriptExporter {
    pub fn render(json: &str) -> Result<String, NotebookError> {
        let notebook: Notebook = serde_json::from_str(json)?;
        let mut script = String::from("#!/usr/bin/env python\n# coding: utf-8\n");

        for cell in &notebook.cells {
            let source = cell.source.text();
            match cell.cell_type.as_str() {
                "code" => {
                    let count = cell
                        .execution_count
                        .map_or_else(|| " ".to_string(), |n| n.to_string());
                    script.push_str(&format!("\n# In[{count}]:\n\n\n"));
                    script.push_str(source.trim_end());
                    script.push_str("\n\n");
                }
                "markdown" => {
                    script.push('\n');
                    for line in source.lines() {
                        if line.is_empty() {
                            script.push_str("#\n");
                        } else {
                            script.push_str(&format!("# {line}\n"));
                        }
                    }
                    script.push('\n');
                }
                _ => {}
            }
        }
        Ok(script)
    }
}

impl NotebookConverter for ScriptExporter {
    fn convert(&self, path: &Path) -> Result<String, NotebookError> {
        let json = std::fs::read_to_string(path)?;
        Self::render(&json)
    }
}
