//! Domain types shared by every layer: graph nodes, object locations and job requests.

mod job;
mod location;
mod node;

pub use job::{Credentials, JobRequest, TransferJob};
pub use location::{Location, ObjectKey};
pub use node::{Node, NodeKind, Zone, FOLDER_SIZE};

/// Join a display path and a child name the way the graph stores them (no leading slash).
pub fn join_display_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// Parent part of a display path, or "" at the top level.
pub fn parent_display_path(path: &str) -> &str {
    path.rsplit_once('/').map(|(p, _)| p).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_path_helpers() {
        assert_eq!(join_display_path("", "admin"), "admin");
        assert_eq!(join_display_path("admin/", "a.txt"), "admin/a.txt");
        assert_eq!(parent_display_path("admin/A/x.txt"), "admin/A");
        assert_eq!(parent_display_path("admin"), "");
    }
}
