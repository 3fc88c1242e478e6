//! Core library for `zone_transfer`.
//!
//! Copies, moves and deletes folder/file trees that live in a graph store (nodes) and an
//! object store (payloads), holding a lock on every affected resource for the duration of a
//! job and propagating lineage, catalog, search-index and audit metadata for each node.
//!
//! The external systems are reached through small traits (`LockService`, `NodeRepository`,
//! `BlobStore`, `MetadataSink`, `JobTracker`, `ApprovalSource`). In-memory implementations
//! exist for tests; file-backed implementations (see [`backends`]) let the binary run against
//! a local data root.

pub mod approval;
pub mod backends;
pub mod blob;
pub mod cli;
pub mod config;
pub mod driver;
pub mod errors;
pub mod fs_ops;
pub mod graph;
pub mod import;
pub mod job;
pub mod lock;
pub mod metadata;
pub mod model;
pub mod output;
pub mod services;
pub mod shutdown;
pub mod walker;

pub use config::{default_config_path, default_log_path, path_has_symlink_ancestor};
pub use config::{Config, LogLevel};
pub use driver::{plan_job, run_job, JobSummary};
pub use errors::TransferError;
pub use model::{JobRequest, Location, Node, NodeKind, ObjectKey, TransferJob, Zone};
pub use services::Services;
pub use walker::{DuplicatedFileNames, TerminalAction, TransferPlan, TreeWalker};
