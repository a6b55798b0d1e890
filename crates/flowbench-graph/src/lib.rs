//! Workflow graph core: the mutable node/edge store, edge styling sync,
//! pipeline resolution, batch-result application, lint validation, and
//! autosave/restore.
//!
//! This crate implements the editor-facing semantics of the canvas: every
//! structural mutation goes through [`WorkflowGraph`], and the
//! [`Resolver`] turns the current graph into per-result execution
//! configurations by walking each result node's parent chain backward.

pub mod autosave;
pub mod resolver;
pub mod results;
pub mod store;
pub mod styling;
pub mod validation;

pub use autosave::{
    builtin_templates, clear_snapshot, load_or_seed, load_snapshot, save_snapshot, GraphSnapshot,
    Template, AUTOSAVE_SLOT,
};
pub use resolver::{ResolvedBatch, Resolver, SkipReason, SkippedResult, DEFAULT_MAX_HOPS};
pub use results::{apply_batch_results, BatchReport, NodeError};
pub use store::WorkflowGraph;
pub use styling::{stroke_for, DEFAULT_STROKE, STROKE_WIDTH};
pub use validation::{validate, validate_or_raise, Diagnostic, LintRule, Severity};
