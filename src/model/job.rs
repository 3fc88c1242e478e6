use std::fmt;

use chrono::Utc;

use crate::walker::TerminalAction;

/// Opaque user credentials forwarded to downstream services. Never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// One copy, delete or approval-copy request as submitted by a caller.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub action: TerminalAction,
    pub source_geid: String,
    /// Destination folder (or project root) for copies; ignored for deletes.
    pub destination_geid: Option<String>,
    pub project_code: String,
    pub operator: String,
    pub job_id: String,
    pub session_id: String,
    pub approval_request_id: Option<String>,
    /// New name for the root of a copy.
    pub rename: Option<String>,
    pub credentials: Option<Credentials>,
}

impl JobRequest {
    pub fn new(
        action: TerminalAction,
        source_geid: impl Into<String>,
        project_code: impl Into<String>,
        operator: impl Into<String>,
    ) -> Self {
        let job_id = uuid::Uuid::new_v4().to_string();
        JobRequest {
            action,
            source_geid: source_geid.into(),
            destination_geid: None,
            project_code: project_code.into(),
            operator: operator.into(),
            session_id: job_id.clone(),
            job_id,
            approval_request_id: None,
            rename: None,
            credentials: None,
        }
    }

    pub fn with_destination(mut self, geid: impl Into<String>) -> Self {
        self.destination_geid = Some(geid.into());
        self
    }

    pub fn with_approval_request(mut self, id: impl Into<String>) -> Self {
        self.approval_request_id = Some(id.into());
        self
    }

    pub fn with_rename(mut self, name: impl Into<String>) -> Self {
        self.rename = Some(name.into());
        self
    }
}

/// A request bound to the single timestamp used for every rename it performs.
#[derive(Debug, Clone)]
pub struct TransferJob {
    pub request: JobRequest,
    pub timestamp: i64,
}

impl TransferJob {
    pub fn new(request: JobRequest) -> Self {
        Self::with_timestamp(request, Utc::now().timestamp())
    }

    pub fn with_timestamp(request: JobRequest, timestamp: i64) -> Self {
        TransferJob { request, timestamp }
    }
}
