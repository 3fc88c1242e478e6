//! Job driver: plan, lock, execute, release, report.
//!
//! Locks are taken only after planning succeeds and are released before the terminal job
//! status is written, whatever the outcome. Destinations are checked again under the locks,
//! since another job may have written one after this job planned. Interruption (Ctrl-C) is honoured up to the
//! moment locks are requested; once the walk starts it runs to completion or failure.

use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::errors::TransferError;
use crate::job::{report, JobStatus, JobUpdate, ProgressReporter};
use crate::lock::{ReleaseFailure, ResourceLock};
use crate::model::{JobRequest, TransferJob};
use crate::services::Services;
use crate::shutdown;
use crate::walker::{ExecutionReport, TransferPlan, TreeWalker};

#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub job_id: String,
    pub timestamp: i64,
    pub locks_acquired: usize,
    pub report: ExecutionReport,
    #[serde(skip)]
    pub release_failures: Vec<ReleaseFailure>,
}

fn status_update(job: &TransferJob, status: JobStatus, progress: u8, payload: serde_json::Value) -> JobUpdate {
    JobUpdate {
        session_id: job.request.session_id.clone(),
        job_id: job.request.job_id.clone(),
        status,
        progress,
        payload,
    }
}

/// Plan `request` without locking or writing anything.
pub fn plan_job(
    config: &Config,
    services: Services<'_>,
    request: JobRequest,
) -> Result<TransferPlan, TransferError> {
    let job = TransferJob::new(request);
    TreeWalker::new(config, services, &job).plan()
}

/// Run one job to completion and record its terminal status.
pub fn run_job(
    config: &Config,
    services: Services<'_>,
    request: JobRequest,
) -> Result<JobSummary, TransferError> {
    run_transfer_job(config, services, &TransferJob::new(request))
}

/// As [`run_job`], for a job whose timestamp is already fixed.
pub fn run_transfer_job(
    config: &Config,
    services: Services<'_>,
    job: &TransferJob,
) -> Result<JobSummary, TransferError> {
    let req = &job.request;
    info!(
        job_id = %req.job_id,
        action = %req.action,
        source = %req.source_geid,
        project = %req.project_code,
        operator = %req.operator,
        "job started"
    );
    report(
        services.jobs,
        &status_update(
            job,
            JobStatus::Running,
            0,
            json!({ "action": req.action, "source_geid": req.source_geid, "destination_geid": req.destination_geid }),
        ),
    );

    let outcome = locked_walk(config, services, job);

    match &outcome {
        Ok(summary) => {
            info!(
                job_id = %req.job_id,
                files = summary.report.files_copied + summary.report.files_archived,
                bytes = summary.report.bytes_transferred,
                "job succeeded"
            );
            let payload = serde_json::to_value(summary).unwrap_or_else(|_| json!({}));
            report(services.jobs, &status_update(job, JobStatus::Succeed, 100, payload));
        }
        Err(e) => {
            error!(
                job_id = %req.job_id,
                code = e.code(),
                retriable = e.is_retriable(),
                error = %e,
                "job failed"
            );
            report(
                services.jobs,
                &status_update(
                    job,
                    JobStatus::Terminated,
                    0,
                    json!({ "error_msg": e.to_string(), "error_code": e.code(), "retriable": e.is_retriable() }),
                ),
            );
        }
    }
    outcome
}

fn locked_walk(
    config: &Config,
    services: Services<'_>,
    job: &TransferJob,
) -> Result<JobSummary, TransferError> {
    services
        .blobs
        .authorize(job.request.credentials.as_ref())
        .map_err(|e| TransferError::Configuration(format!("object store rejected the job's credentials: {e:#}")))?;

    let walker = TreeWalker::new(config, services, job);
    let plan = walker.plan()?;

    if shutdown::is_requested() {
        warn!(job_id = %job.request.job_id, "shutdown requested; not starting the walk");
        return Err(TransferError::Interrupted);
    }

    let locks = ResourceLock::new(services.locks);
    locks.acquire_all(&plan.locks)?;
    let locks_acquired = plan.locks.len();

    let progress = ProgressReporter::new(services.jobs, &job.request.session_id, &job.request.job_id, plan.files);
    let result = walker
        .verify_destinations(&plan)
        .and_then(|()| walker.execute(&plan, Some(&progress)));

    let release_failures = locks.release_all();
    if !release_failures.is_empty() {
        warn!(
            job_id = %job.request.job_id,
            failures = release_failures.len(),
            "some locks could not be released"
        );
    }

    Ok(JobSummary {
        job_id: job.request.job_id.clone(),
        timestamp: job.timestamp,
        locks_acquired,
        report: result?,
        release_failures,
    })
}
