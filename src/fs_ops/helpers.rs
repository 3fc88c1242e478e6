//! Adapters that enrich `io::Error` with the failing operation, the path and a hint.
//!
//!   fs::create_dir_all(dir).map_err(io_error_with_help("create dir", dir))?;

use anyhow::anyhow;
use std::io;
use std::path::Path;

fn build_message(op: &str, path: &Path, e: &io::Error) -> String {
    let mut msg = format!("{} '{}': {}", op, path.display(), e);
    let hint = match e.kind() {
        io::ErrorKind::PermissionDenied => Some("permission denied; check ownership and write permissions."),
        io::ErrorKind::NotFound => Some("path not found; verify it exists."),
        io::ErrorKind::AlreadyExists => Some("already exists; pick a unique name or remove the target."),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
            Some("busy; another process holds the resource.")
        }
        io::ErrorKind::StorageFull => Some("insufficient space on device."),
        io::ErrorKind::ReadOnlyFilesystem => Some("read-only filesystem; cannot write here."),
        io::ErrorKind::InvalidFilename => Some("filename or path too long or malformed."),
        _ => None,
    };
    if let Some(h) = hint {
        msg.push_str(" (");
        msg.push_str(h);
        msg.push(')');
    }
    if let Some(code) = e.raw_os_error() {
        msg.push_str(&format!(" [os code: {}]", code));
    }
    msg
}

/// Returns a closure for `.map_err(...)` turning `io::Error` into an `anyhow::Error`.
pub fn io_error_with_help<'a>(
    op: &'a str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> anyhow::Error + 'a {
    move |e: io::Error| anyhow!(build_message(op, path, &e))
}
