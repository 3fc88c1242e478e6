//! Application orchestrator.
//! Loads/merges config, initializes logging, installs the signal handler, opens the local
//! backends and dispatches the chosen subcommand.

use anyhow::{bail, Result};
use tracing::{debug, error, info, warn};
use zone_transfer::output as out;

use zone_transfer::backends::LocalBackends;
use zone_transfer::cli::{Args, Command, ImportArgs, LsArgs};
use zone_transfer::config::{load_or_init, LoadResult, CONFIG_ENV};
use zone_transfer::graph::NodeRepository;
use zone_transfer::import::{import_tree, ImportRequest};
use zone_transfer::{default_config_path, plan_job, run_job, shutdown, Config, JobRequest, TransferError};

use crate::logging::init_tracing;

/// Run the CLI application.
pub fn run(args: Args) -> Result<()> {
    // Handle --print-config before logging init
    if args.print_config {
        print_config_location(&args);
        return Ok(());
    }

    let mut cfg = match load_or_init(args.config.as_deref())? {
        LoadResult::Loaded(cfg, _) => cfg,
        LoadResult::CreatedTemplate(path) => {
            out::print_success(&format!("A template zone_transfer config was written to: {}", path.display()));
            out::print_info("Edit `data_root` (and optionally the zone prefixes, `log_level` and `log_file`), then re-run.");
            if args.data_root.is_none() {
                out::print_info(&format!("To use a different location set {CONFIG_ENV} or pass --config."));
                return Ok(());
            }
            Config::default()
        }
        LoadResult::Defaults => Config::default(),
    };
    args.apply_overrides(&mut cfg);

    let guard = init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json).map_err(|e| {
        out::print_error(&format!("Failed to initialize logging: {}", e));
        e
    })?;

    // Interrupts only stop jobs that have not locked anything yet.
    if let Err(e) = ctrlc::set_handler(|| {
        shutdown::request();
        out::print_warn("Received interrupt; a walk already under way will run to completion.");
    }) {
        warn!(error = %e, "failed to install signal handler");
    }

    debug!("Starting zone_transfer: {:?}", args);

    let result = (|| -> Result<()> {
        cfg.validate()?;
        let Some(command) = args.command.as_ref() else {
            bail!("no command given; run with --help to see the available commands");
        };
        let backends = LocalBackends::open(&cfg)?;

        if let Some((request, plan_only)) = command.job_request() {
            return run_job_command(&cfg, &backends, request, plan_only, args.json);
        }
        match command {
            Command::Import(a) => run_import(&cfg, &backends, a, args.json),
            Command::Ls(a) => run_ls(&backends, a),
            _ => Ok(()),
        }
    })();

    // Flush the file appender before exit
    drop(guard);

    result
}

fn print_config_location(args: &Args) {
    if let Some(p) = &args.config {
        out::print_info(&format!("Using --config (explicit):\n  {}\n", p.display()));
        return;
    }
    if let Ok(cfg_env) = std::env::var(CONFIG_ENV) {
        out::print_info(&format!("Using {CONFIG_ENV} (explicit):\n  {}\n", cfg_env));
        out::print_info(&format!("To override, unset {CONFIG_ENV} or set it to another file."));
        return;
    }
    match default_config_path() {
        Ok(p) => {
            out::print_info(&format!("Default zone_transfer config path:\n  {}\n", p.display()));
            if p.exists() {
                out::print_info("A config file already exists at that location.");
            } else {
                out::print_info("No config file exists there yet. Run without --print-config to create a template.");
            }
        }
        Err(e) => out::print_error(&format!("Could not determine a default config path: {e}")),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    out::print_user(&serde_json::to_string_pretty(value)?);
    Ok(())
}

fn log_failure(e: &TransferError) {
    match e {
        TransferError::LockContention { key, mode } => {
            error!(code = e.code(), kind = "lock_contention", %key, %mode, "Job failed")
        }
        TransferError::LockService { key, mode, reason } => {
            error!(code = e.code(), kind = "lock_service", %key, %mode, %reason, "Job failed")
        }
        TransferError::DestinationExists { path } => {
            error!(code = e.code(), kind = "destination_exists", %path, "Job failed; nothing was overwritten")
        }
        TransferError::NotFound(what) => error!(code = e.code(), kind = "not_found", %what, "Job failed"),
        TransferError::MetadataPropagationFailure { step, geid, .. } => {
            error!(code = e.code(), kind = "metadata", %step, %geid, "Job failed; transferred data was kept")
        }
        TransferError::Interrupted => error!(code = e.code(), kind = "interrupted", "Job aborted by user"),
        _ => error!(code = e.code(), retriable = e.is_retriable(), error = %e, "Job failed"),
    }
}

fn run_job_command(
    cfg: &Config,
    backends: &LocalBackends,
    request: JobRequest,
    plan_only: bool,
    json: bool,
) -> Result<()> {
    let services = backends.services();
    if plan_only {
        let plan = plan_job(cfg, services, request).inspect_err(log_failure)?;
        let summary = plan.summary();
        if json {
            return print_json(&summary);
        }
        out::print_plan(&summary);
        return Ok(());
    }

    let summary = run_job(cfg, services, request).inspect_err(log_failure)?;
    for failure in &summary.release_failures {
        out::print_warn(&format!("lock {} ({}) was not released: {}", failure.key, failure.mode, failure.reason));
    }
    if json {
        return print_json(&summary);
    }
    out::print_report(&summary.report);
    Ok(())
}

fn run_import(cfg: &Config, backends: &LocalBackends, a: &ImportArgs, json: bool) -> Result<()> {
    let req = ImportRequest {
        source_dir: a.source_dir.clone(),
        project_code: a.project.clone(),
        uploader: a.uploader.clone(),
    };
    let report = import_tree(cfg, &backends.graph, &backends.ids, &backends.blobs, &req)?;
    if json {
        return print_json(&report);
    }
    out::print_user(&format!("project\t{}", report.project_geid));
    out::print_user(&format!("{}\t{}", a.uploader, report.name_folder_geid));
    out::print_success(&format!(
        "imported {} file(s) ({} byte(s)) and {} folder(s); {} skipped",
        report.files_created, report.bytes, report.folders_created, report.skipped
    ));
    Ok(())
}

fn run_ls(backends: &LocalBackends, a: &LsArgs) -> Result<()> {
    let parent = match (&a.geid, &a.project) {
        (Some(geid), _) => geid.clone(),
        (None, Some(code)) => match backends.graph.find_project(code)? {
            Some(p) => p.geid,
            None => bail!("project {code} not found"),
        },
        (None, None) => bail!("ls needs a node geid or --project"),
    };
    let children = backends.graph.get_children(&parent)?;
    info!(parent = %parent, count = children.len(), "listing");
    for n in children {
        out::print_user(&format!(
            "{}\t{}\t{}\t{}\t{}",
            n.kind, n.zone, n.geid, n.display_path, n.file_size
        ));
    }
    Ok(())
}
