//! Host template config file resolution.
//!
//! A template's config file can have per-host overrides sitting next to it:
//! `<host>.host.json` files in the config's own directory (non-recursive).
//! The current host identifier wins; otherwise the host's fallback names are
//! tried in their supplied order.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::fs::Filesystem;
use crate::hive::EngineHost;

/// File name suffix identifying host template config files.
pub const HOST_CONFIG_SUFFIX: &str = ".host.json";

pub(super) fn find_best_host_config(
    filesystem: &dyn Filesystem,
    host: &EngineHost,
    config: &Path,
) -> Option<PathBuf> {
    let dir = config.parent()?;

    let mut host_files: HashMap<String, PathBuf> = HashMap::new();
    for file in filesystem.list_files(dir).ok()? {
        let Some(name) = file.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if name.ends_with(HOST_CONFIG_SUFFIX) {
            host_files.insert(name.to_string(), file);
        }
    }

    let preferred = format!("{}{HOST_CONFIG_SUFFIX}", host.host_identifier);
    if let Some(file) = host_files.get(&preferred) {
        return Some(file.clone());
    }

    for fallback in &host.fallback_host_names {
        if let Some(file) = host_files.get(&format!("{fallback}{HOST_CONFIG_SUFFIX}")) {
            return Some(file.clone());
        }
    }

    None
}
