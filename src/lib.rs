//! # codeweave
//!
//! Discover, filter, transform and concatenate the source files of a local
//! repository into a single document that is easy to hand to a person or a
//! language model.
//!
//! The pipeline runs in one direction:
//!
//! ```text
//! root directory -> pruning traversal (filter chain) -> ordered candidates
//!                -> content transformer (one policy per file)
//!                -> aggregation writer -> document
//! ```
//!
//! ```rust,no_run
//! use codeweave::weave::{FilterOptions, FilterSpec, TransformOptions, Transformer, Weaver};
//!
//! let spec = FilterSpec::new(FilterOptions {
//!     languages: vec!["python".into()],
//!     excluded_dirs: vec![".venv".into()],
//!     ..Default::default()
//! })?;
//! let report = Weaver::new(spec, Transformer::new(TransformOptions::default()))
//!     .run(std::path::Path::new("."))?;
//! print!("{}", report.document.render());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod parallel;
pub mod weave;

pub use cli::{Cli, Output};
pub use config::WeaveConfig;
pub use error::{ConfigError, TraversalWarning, WeaveError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
