//! XML configuration support.
//!
//! The file is `<config>` with one optional child per setting. Unknown elements are
//! rejected so that typos surface instead of silently falling back to defaults. A missing
//! file at the default location is replaced by a commented template; an explicitly named
//! file must exist.

use anyhow::{anyhow, bail, Context, Result};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::env;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::paths::{default_config_path, path_has_symlink_ancestor};
use super::types::{Config, LogLevel};
use super::{
    CONFIG_ENV, COPIED_TAG_DEFAULT, CORE_PREFIX_DEFAULT, DATA_ROOT_DEFAULT,
    GREENROOM_PREFIX_DEFAULT, LARGE_OBJECT_THRESHOLD, OBJECT_ENDPOINT_DEFAULT,
};

#[derive(Debug, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    data_root: Option<String>,
    staging_dir: Option<String>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    large_object_threshold: Option<u64>,
    greenroom_prefix: Option<String>,
    core_prefix: Option<String>,
    object_endpoint: Option<String>,
    copied_tag: Option<String>,
    log_level: Option<String>,
    log_file: Option<String>,
}

fn de_u64_trimmed_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s
            .replace('_', "")
            .parse::<u64>()
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("large_object_threshold '{s}': {e}"))),
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn xml_to_config(parsed: XmlConfig) -> Result<Config> {
    let data_root = non_empty(parsed.data_root).unwrap_or_else(|| DATA_ROOT_DEFAULT.to_string());
    let mut cfg = Config::new(data_root);

    if let Some(s) = non_empty(parsed.staging_dir) {
        cfg.staging_dir = PathBuf::from(s);
    }
    if let Some(t) = parsed.large_object_threshold {
        cfg.large_object_threshold = t;
    }
    if let Some(p) = non_empty(parsed.greenroom_prefix) {
        cfg.greenroom_prefix = p;
    }
    if let Some(p) = non_empty(parsed.core_prefix) {
        cfg.core_prefix = p;
    }
    if let Some(e) = non_empty(parsed.object_endpoint) {
        cfg.object_endpoint = e;
    }
    if let Some(t) = non_empty(parsed.copied_tag) {
        cfg.copied_tag = t;
    }
    if let Some(l) = non_empty(parsed.log_level) {
        cfg.log_level = l.parse::<LogLevel>().map_err(|e| anyhow!(e))?;
    }
    cfg.log_file = non_empty(parsed.log_file).map(PathBuf::from);
    Ok(cfg)
}

/// Load a Config from a specific XML file.
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig = from_xml_str(&contents)
        .with_context(|| format!("parse config xml '{}'", path.display()))?;
    let cfg = xml_to_config(parsed).with_context(|| format!("config xml '{}'", path.display()))?;
    debug!(path = %path.display(), data_root = %cfg.data_root.display(), "config loaded");
    Ok(cfg)
}

/// Outcome of [`load_or_init`].
#[derive(Debug)]
pub enum LoadResult {
    Loaded(Config, PathBuf),
    /// No config existed at the default path; a template was written there.
    CreatedTemplate(PathBuf),
    /// No config path could be determined; built-in defaults apply.
    Defaults,
}

/// Load configuration from `explicit`, else `$ZONE_TRANSFER_CONFIG`, else the default path.
pub fn load_or_init(explicit: Option<&Path>) -> Result<LoadResult> {
    let named = explicit
        .map(Path::to_path_buf)
        .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from));
    if let Some(path) = named {
        if !path.exists() {
            bail!("config file '{}' does not exist", path.display());
        }
        let cfg = load_config_from_xml_path(&path)?;
        return Ok(LoadResult::Loaded(cfg, path));
    }

    let Ok(path) = default_config_path() else {
        return Ok(LoadResult::Defaults);
    };
    if path.exists() {
        let cfg = load_config_from_xml_path(&path)?;
        return Ok(LoadResult::Loaded(cfg, path));
    }
    create_template_config(&path)?;
    Ok(LoadResult::CreatedTemplate(path))
}

fn template() -> String {
    format!(
        "<!--\n  zone_transfer configuration (XML)\n\n  data_root               -> root of the local stores (locks, objects, graph, journals)\n  staging_dir             -> scratch space for objects above the threshold\n  large_object_threshold  -> bytes; larger objects are staged instead of copied server-side\n  greenroom_prefix        -> bucket prefix of the greenroom zone\n  core_prefix             -> bucket prefix of the core zone\n  object_endpoint         -> object store endpoint recorded in node locations\n  copied_tag              -> system tag added to copied source nodes\n  log_level               -> quiet | normal | info | debug\n  log_file                -> optional log file (console output is kept)\n\n  CLI flags override these values.\n-->\n<config>\n  <data_root>{}</data_root>\n  <staging_dir>{}/staging</staging_dir>\n  <large_object_threshold>{}</large_object_threshold>\n  <greenroom_prefix>{}</greenroom_prefix>\n  <core_prefix>{}</core_prefix>\n  <object_endpoint>{}</object_endpoint>\n  <copied_tag>{}</copied_tag>\n  <log_level>normal</log_level>\n  <log_file></log_file>\n</config>\n",
        DATA_ROOT_DEFAULT,
        DATA_ROOT_DEFAULT,
        LARGE_OBJECT_THRESHOLD,
        GREENROOM_PREFIX_DEFAULT,
        CORE_PREFIX_DEFAULT,
        OBJECT_ENDPOINT_DEFAULT,
        COPIED_TAG_DEFAULT,
    )
}

/// Write the commented template to `path`. Refuses symlinked ancestors and existing files.
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        bail!(
            "refusing to create config: an ancestor of {} is a symlink",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create config directory '{}'", parent.display()))?;
    }

    let mut opts = OpenOptions::new();
    opts.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    let mut f = opts
        .open(path)
        .with_context(|| format!("create template config '{}'", path.display()))?;
    f.write_all(template().as_bytes())
        .with_context(|| format!("write template config '{}'", path.display()))?;

    info!(path = %path.display(), "created template config");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_all_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.xml");
        fs::write(
            &path,
            "<config>\n  <data_root> /srv/zt </data_root>\n  <large_object_threshold>1_000</large_object_threshold>\n  <core_prefix>cr-</core_prefix>\n  <copied_tag>copied-with-approval</copied_tag>\n  <log_level>debug</log_level>\n  <log_file></log_file>\n</config>\n",
        )
        .unwrap();
        let cfg = load_config_from_xml_path(&path).unwrap();
        assert_eq!(cfg.data_root, PathBuf::from("/srv/zt"));
        assert_eq!(cfg.staging_dir, PathBuf::from("/srv/zt/staging"));
        assert_eq!(cfg.large_object_threshold, 1000);
        assert_eq!(cfg.core_prefix, "cr-");
        assert_eq!(cfg.greenroom_prefix, "gr-");
        assert_eq!(cfg.copied_tag, "copied-with-approval");
        assert_eq!(cfg.log_level, LogLevel::Debug);
        assert!(cfg.log_file.is_none());
    }

    #[test]
    fn unknown_field_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.xml");
        fs::write(&path, "<config><download_base>/x</download_base></config>").unwrap();
        let err = load_config_from_xml_path(&path).unwrap_err();
        assert!(format!("{err:#}").contains("unknown field"));
    }

    #[test]
    fn template_parses_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/config.xml");
        create_template_config(&path).unwrap();
        let cfg = load_config_from_xml_path(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(create_template_config(&path).is_err());
    }
}
