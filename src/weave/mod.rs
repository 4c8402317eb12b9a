//! The weaving pipeline: registry, filters, traversal, transformation and
//! aggregation, leaves first.

pub mod filters;
pub mod pipeline;
pub mod registry;
pub mod transform;
pub mod traversal;
pub mod tree;
pub mod writer;

pub use filters::{FilterChain, FilterDecision, FilterOptions, FilterSpec, RejectReason};
pub use pipeline::{
    Discovery, ExecutionMode, ExecutionSettings, RunWarning, WeaveReport, WeaveStats, Weaver,
    resolve_input,
};
pub use transform::{ContentPolicy, TransformOptions, TransformResult, TransformStatus, Transformer};
pub use traversal::{FileCandidate, FileSystem, OsFileSystem, Traversal, traverse};
pub use tree::{CommandTreeRenderer, TreeRenderer};
pub use writer::{OutputDocument, assemble, persist};
