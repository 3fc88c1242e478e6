//! Typed error definitions for zone_transfer.
//! Every job ends either successfully or with exactly one of these; the driver records
//! `code()` in the job tracker so an orchestrator can tell retriable failures apart.

use thiserror::Error;

use crate::lock::LockMode;
use crate::metadata::MetadataStep;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Resource {key} is already locked ({mode} lock refused)")]
    LockContention { key: String, mode: LockMode },

    #[error("Lock service failed on {key} ({mode} lock): {reason}")]
    LockService {
        key: String,
        mode: LockMode,
        reason: String,
    },

    #[error("Destination {path} already exists")]
    DestinationExists { path: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transfer failed {src} -> {dst}: {reason}")]
    TransferFailure {
        src: String,
        dst: String,
        reason: String,
    },

    #[error("Metadata propagation failed at {step} for {geid}: {reason}")]
    MetadataPropagationFailure {
        step: MetadataStep,
        geid: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Graph store failed during {op}: {reason}")]
    GraphStore { op: &'static str, reason: String },

    #[error("Job interrupted before any resource was locked")]
    Interrupted,
}

impl TransferError {
    /// Stable machine-readable code, used in structured logs and job payloads.
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::LockContention { .. } => "lock_contention",
            TransferError::LockService { .. } => "lock_service_failure",
            TransferError::DestinationExists { .. } => "destination_exists",
            TransferError::NotFound(_) => "not_found",
            TransferError::TransferFailure { .. } => "transfer_failure",
            TransferError::MetadataPropagationFailure { .. } => "metadata_propagation_failure",
            TransferError::Configuration(_) => "configuration_error",
            TransferError::GraphStore { .. } => "graph_store_failure",
            TransferError::Interrupted => "interrupted",
        }
    }

    /// Whether re-running the whole job later can reasonably succeed.
    ///
    /// Metadata failures are not retriable: the blob and graph node already exist, so a
    /// re-run would produce a second, renamed copy. A destination that appeared under a
    /// concurrent job is picked up (and renamed around) by the next run's planning pass.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            TransferError::LockContention { .. }
                | TransferError::LockService { .. }
                | TransferError::DestinationExists { .. }
                | TransferError::TransferFailure { .. }
                | TransferError::GraphStore { .. }
                | TransferError::Interrupted
        )
    }
}
