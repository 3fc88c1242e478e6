//! Duplicate-name resolution.
//!
//! When a destination file already exists, the copy is written under
//! `<stem>_<job timestamp><extensions>` instead. The table is filled while planning and
//! consulted while executing, keyed by the source's display path. One timestamp serves the
//! whole job, so every rename of a run carries the same suffix.

use std::collections::BTreeMap;

use tracing::trace;

/// Longest file name (in bytes) produced by a rename.
const MAX_FILENAME_LEN: usize = 255;

/// Insert `_<suffix>` before the extensions of the last path segment.
///
/// `file.tar.gz` -> `file_<suffix>.tar.gz`, `path/to/file` -> `path/to/file_<suffix>`.
/// Only the final segment is changed, so dotted folder names are left alone.
pub fn append_suffix(filepath: &str, suffix: &str) -> String {
    let (dir, name) = match filepath.rsplit_once('/') {
        Some((d, n)) => (Some(d), n),
        None => (None, filepath),
    };
    let renamed = build_name_with_suffix(name, suffix);
    match dir {
        Some(d) => format!("{d}/{renamed}"),
        None => renamed,
    }
}

/// Extension part of `name`: everything from the first dot after any leading dots.
/// Names ending in a dot have none.
fn extensions(name: &str) -> &str {
    if name.ends_with('.') {
        return "";
    }
    let lead = name.len() - name.trim_start_matches('.').len();
    match name[lead..].find('.') {
        Some(i) => &name[lead + i..],
        None => "",
    }
}

/// `stem + "_" + suffix + ext`, shortening the stem so the result fits in
/// [`MAX_FILENAME_LEN`] bytes.
fn build_name_with_suffix(name: &str, suffix: &str) -> String {
    let ext = extensions(name);
    let stem = &name[..name.len() - ext.len()];
    let overhead = 1 + suffix.len() + ext.len();

    let mut kept = stem;
    if stem.len() + overhead > MAX_FILENAME_LEN {
        let budget = MAX_FILENAME_LEN.saturating_sub(overhead).max(1);
        let mut end = budget.min(stem.len());
        while end > 0 && !stem.is_char_boundary(end) {
            end -= 1;
        }
        kept = if end == 0 { "f" } else { &stem[..end] };
        trace!(name, kept, "stem truncated to fit file name limit");
    }
    format!("{kept}_{suffix}{ext}")
}

/// Source display path -> disambiguated destination file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicatedFileNames {
    timestamp: i64,
    names: BTreeMap<String, String>,
}

impl DuplicatedFileNames {
    pub fn new(timestamp: i64) -> Self {
        DuplicatedFileNames {
            timestamp,
            names: BTreeMap::new(),
        }
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Record that the file at `original_path` must be written as `name` plus the job
    /// timestamp. Returns the substitute name.
    pub fn add(&mut self, original_path: &str, name: &str) -> String {
        let renamed = append_suffix(name, &self.timestamp.to_string());
        self.names.insert(original_path.to_string(), renamed.clone());
        renamed
    }

    pub fn get(&self, original_path: &str) -> Option<&str> {
        self.names.get(original_path).map(String::as_str)
    }

    /// The substitute name for `original_path`, or `name` if it needs none.
    pub fn resolve(&self, original_path: &str, name: &str) -> String {
        self.get(original_path).unwrap_or(name).to_string()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
