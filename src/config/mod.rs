//! Configuration: types, default paths, XML loading and validation.
//!
//! A `Config` is built once (defaults, then XML, then CLI overrides) and passed by reference
//! to every component; nothing reads configuration from global state.

pub mod paths;
pub mod types;
mod validate;
pub mod xml;

pub use paths::{default_config_path, default_log_path, path_has_symlink_ancestor};
pub use types::{Config, LogLevel};
pub use xml::{create_template_config, load_config_from_xml_path, load_or_init, LoadResult};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "ZONE_TRANSFER_CONFIG";

pub const DATA_ROOT_DEFAULT: &str = "/var/lib/zone_transfer";
/// Largest object copied server-side; larger ones are staged through local disk.
pub const LARGE_OBJECT_THRESHOLD: u64 = 5_000_000_000;
pub const GREENROOM_PREFIX_DEFAULT: &str = "gr-";
pub const CORE_PREFIX_DEFAULT: &str = "core-";
pub const OBJECT_ENDPOINT_DEFAULT: &str = "http://localhost:9000";
/// System tag added to every source node that has been copied to core.
pub const COPIED_TAG_DEFAULT: &str = "copied-to-core";
