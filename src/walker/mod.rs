//! The tree walker: one engine for copy, archive and approval copy.
//!
//! A job runs in two passes. [`TreeWalker::plan`] reads the source tree, resolves where each
//! node lands, renames files whose destination already exists and derives the lock set.
//! The driver acquires those locks, then [`TreeWalker::execute`] visits the planned tree
//! depth-first and performs the blob, graph and metadata calls for each node.

mod duplicate;
mod engine;
mod plan;
mod strategy;

pub use duplicate::{append_suffix, DuplicatedFileNames};
pub use engine::{ExecutionReport, RenamedFile, TreeWalker};
pub use plan::{PlanEntry, PlanSummary, PlannedNode, TransferPlan};
pub use strategy::{Pipeline, TerminalAction};
