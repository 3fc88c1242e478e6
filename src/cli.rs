//! CLI definition and parsing.
//! Defines Args and provides parse() for command-line handling.
//!
//! Notes:
//! - Global flags may appear before or after the subcommand.
//! - --debug is a shorthand for --log-level debug.

use clap::{Parser, Subcommand, ValueHint};
use std::path::PathBuf;

use crate::config::types::{Config, LogLevel};
use crate::model::{Credentials, JobRequest};
use crate::walker::TerminalAction;

/// Copy, archive or approval-copy file trees between the greenroom and core zones.
/// CLI flags override config values (which are loaded from XML if present).
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Copy and archive file trees between storage zones with resource locking"
)]
pub struct Args {
    /// Explicit config file (otherwise $ZONE_TRANSFER_CONFIG, then the default location).
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Override the data root holding the local stores.
    #[arg(long, global = true, value_hint = ValueHint::DirPath)]
    pub data_root: Option<PathBuf>,

    /// Override the staging directory used for large objects.
    #[arg(long, global = true, value_hint = ValueHint::DirPath)]
    pub staging_dir: Option<PathBuf>,

    /// Override the large-object threshold in bytes.
    #[arg(long, global = true, value_name = "BYTES")]
    pub large_object_threshold: Option<u64>,

    #[arg(
        short = 'd',
        long,
        global = true,
        help = "Enable debug logging (shorthand for --log-level debug)"
    )]
    pub debug: bool,

    #[arg(long, global = true, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<String>,

    /// Also write logs to this file.
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,

    /// Emit logs in structured JSON (includes timestamp, level, and structured fields).
    #[arg(long, global = true, help = "Emit logs in structured JSON")]
    pub json: bool,

    #[arg(long, help = "Print the config file location used by zone_transfer and exit")]
    pub print_config: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Copy a greenroom file or folder tree into a core folder.
    Copy(CopyArgs),
    /// Archive a file or folder tree into the trash bin.
    #[command(visible_alias = "move", alias = "archive")]
    Delete(DeleteArgs),
    /// Copy the approved entities of an approval request into core.
    ApprovalCopy(ApprovalCopyArgs),
    /// Seed the greenroom from a local directory tree.
    Import(ImportArgs),
    /// List the active children of a node (or of a project's root).
    Ls(LsArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct JobArgs {
    #[arg(long, short = 'p')]
    pub project: String,

    #[arg(long, default_value = "admin")]
    pub operator: String,

    /// Caller-supplied job id (a random one otherwise).
    #[arg(long)]
    pub job_id: Option<String>,

    /// Session the job's status updates are grouped under (defaults to the job id).
    #[arg(long)]
    pub session_id: Option<String>,

    #[arg(long, env = "ZONE_TRANSFER_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    #[arg(long, env = "ZONE_TRANSFER_REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: Option<String>,

    #[arg(long, help = "Show the lock set and renames, but do not lock or modify anything")]
    pub plan_only: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct CopyArgs {
    /// Source node geid.
    #[arg(long = "source", short = 'i')]
    pub source: String,

    /// Destination folder (or project root) geid in core.
    #[arg(long = "destination", short = 'o')]
    pub destination: String,

    /// New name for the copied root.
    #[arg(long, short = 'r')]
    pub rename: Option<String>,

    #[command(flatten)]
    pub job: JobArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct DeleteArgs {
    #[arg(long = "source", short = 'i')]
    pub source: String,

    #[command(flatten)]
    pub job: JobArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ApprovalCopyArgs {
    #[arg(long = "source", short = 'i')]
    pub source: String,

    #[arg(long = "destination", short = 'o')]
    pub destination: String,

    #[arg(long)]
    pub approval_request: String,

    #[command(flatten)]
    pub job: JobArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ImportArgs {
    #[arg(value_hint = ValueHint::DirPath)]
    pub source_dir: PathBuf,

    #[arg(long, short = 'p')]
    pub project: String,

    #[arg(long, default_value = "admin")]
    pub uploader: String,
}

#[derive(clap::Args, Debug, Clone)]
pub struct LsArgs {
    /// Node geid; omit to list the project's root.
    pub geid: Option<String>,

    #[arg(long, short = 'p', required_unless_present = "geid")]
    pub project: Option<String>,
}

impl JobArgs {
    fn request(&self, action: TerminalAction, source: &str) -> JobRequest {
        let mut req = JobRequest::new(action, source, &self.project, &self.operator);
        if let Some(id) = &self.job_id {
            req.job_id = id.clone();
            req.session_id = id.clone();
        }
        if let Some(s) = &self.session_id {
            req.session_id = s.clone();
        }
        if self.access_token.is_some() || self.refresh_token.is_some() {
            req.credentials = Some(Credentials {
                access_token: self.access_token.clone().unwrap_or_default(),
                refresh_token: self.refresh_token.clone().unwrap_or_default(),
            });
        }
        req
    }
}

impl Command {
    /// The job request and its `--plan-only` flag, for the commands that run a job.
    pub fn job_request(&self) -> Option<(JobRequest, bool)> {
        match self {
            Command::Copy(a) => {
                let mut req = a.job.request(TerminalAction::Copy, &a.source).with_destination(&a.destination);
                if let Some(name) = &a.rename {
                    req = req.with_rename(name);
                }
                Some((req, a.job.plan_only))
            }
            Command::Delete(a) => Some((a.job.request(TerminalAction::Archive, &a.source), a.job.plan_only)),
            Command::ApprovalCopy(a) => {
                let req = a
                    .job
                    .request(TerminalAction::ApprovalCopy, &a.source)
                    .with_destination(&a.destination)
                    .with_approval_request(&a.approval_request);
                Some((req, a.job.plan_only))
            }
            Command::Import(_) | Command::Ls(_) => None,
        }
    }
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(root) = &self.data_root {
            // Staging follows the data root unless it was set explicitly below.
            if cfg.staging_dir == cfg.data_root.join("staging") {
                cfg.staging_dir = root.join("staging");
            }
            cfg.data_root = root.clone();
        }
        if let Some(dir) = &self.staging_dir {
            cfg.staging_dir = dir.clone();
        }
        if let Some(t) = self.large_object_threshold {
            cfg.large_object_threshold = t;
        }
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        if let Some(lf) = &self.log_file {
            cfg.log_file = Some(lf.clone());
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_aliases_parse() {
        for verb in ["delete", "move", "archive"] {
            let args = Args::try_parse_from(["zone_transfer", verb, "-i", "g1", "-p", "proj"]).unwrap();
            let (req, plan_only) = args.command.unwrap().job_request().unwrap();
            assert_eq!(req.action, TerminalAction::Archive);
            assert_eq!(req.source_geid, "g1");
            assert!(!plan_only);
        }
    }

    #[test]
    fn copy_request_carries_everything() {
        let args = Args::try_parse_from([
            "zone_transfer",
            "copy",
            "-i",
            "src",
            "-o",
            "dst",
            "-r",
            "renamed",
            "-p",
            "proj",
            "--job-id",
            "job-1",
            "--plan-only",
            "--debug",
        ])
        .unwrap();
        assert_eq!(args.effective_log_level(), Some(LogLevel::Debug));
        let (req, plan_only) = args.command.unwrap().job_request().unwrap();
        assert!(plan_only);
        assert_eq!(req.destination_geid.as_deref(), Some("dst"));
        assert_eq!(req.rename.as_deref(), Some("renamed"));
        assert_eq!(req.job_id, "job-1");
        assert_eq!(req.session_id, "job-1");
    }

    #[test]
    fn overrides_move_staging_with_data_root() {
        let args = Args::try_parse_from(["zone_transfer", "--data-root", "/srv/zt", "ls", "-p", "proj"]).unwrap();
        let mut cfg = Config::new("/var/lib/zone_transfer");
        args.apply_overrides(&mut cfg);
        assert_eq!(cfg.data_root, PathBuf::from("/srv/zt"));
        assert_eq!(cfg.staging_dir, PathBuf::from("/srv/zt/staging"));
    }
}
