//! User-facing console lines, colored when stdout is a terminal.
//!
//! Diagnostics go through `tracing`; these helpers print job results and hints. Plain lines
//! (`print_user`) carry no prefix so scripts can parse them.

use owo_colors::OwoColorize;

use crate::walker::{ExecutionReport, PlanSummary};

#[derive(Clone, Copy)]
enum Tone {
    Info,
    Warn,
    Error,
    Success,
}

fn is_tty() -> bool {
    atty::is(atty::Stream::Stdout)
}

fn emit(tone: Tone, msg: &str) {
    let (prefix, to_stderr) = match tone {
        Tone::Info => ("info:", false),
        Tone::Warn => ("warn:", true),
        Tone::Error => ("error:", true),
        Tone::Success => ("ok:", false),
    };
    let line = if is_tty() {
        let colored = match tone {
            Tone::Info => prefix.cyan().bold().to_string(),
            Tone::Warn => prefix.yellow().bold().to_string(),
            Tone::Error => prefix.red().bold().to_string(),
            Tone::Success => prefix.green().bold().to_string(),
        };
        format!("{colored} {msg}")
    } else {
        format!("{prefix} {msg}")
    };
    if to_stderr {
        eprintln!("{line}");
    } else {
        println!("{line}");
    }
}

pub fn print_info(msg: &str) {
    emit(Tone::Info, msg);
}

pub fn print_warn(msg: &str) {
    emit(Tone::Warn, msg);
}

pub fn print_error(msg: &str) {
    emit(Tone::Error, msg);
}

pub fn print_success(msg: &str) {
    emit(Tone::Success, msg);
}

pub fn print_user(msg: &str) {
    println!("{msg}");
}

/// One line per planned node (`<kind>\t<source> -> <destination>`), then the lock list.
pub fn print_plan(plan: &PlanSummary) {
    for entry in &plan.entries {
        let mut line = format!("{}\t{} -> {}", entry.kind, entry.source, entry.destination);
        if entry.reuses_existing {
            line.push_str("\t(exists)");
        }
        if entry.renamed {
            line.push_str("\t(renamed)");
        }
        print_user(&line);
    }
    for lock in &plan.locks {
        print_user(&format!("lock\t{}\t{}", lock.mode, lock.key));
    }
    print_info(&format!(
        "{} file(s), {} folder(s), {} byte(s), {} lock(s)",
        plan.files,
        plan.folders,
        plan.bytes,
        plan.locks.len()
    ));
}

pub fn print_report(report: &ExecutionReport) {
    for r in &report.renamed {
        print_warn(&format!("{} already existed; written as {}", r.source, r.destination));
    }
    if report.files_archived + report.folders_archived > 0 {
        print_success(&format!(
            "moved {} file(s) and {} folder(s) to the trash bin",
            report.files_archived, report.folders_archived
        ));
    } else {
        print_success(&format!(
            "copied {} file(s) ({} byte(s)); {} folder(s) created, {} reused",
            report.files_copied, report.bytes_transferred, report.folders_created, report.folders_reused
        ));
    }
}
