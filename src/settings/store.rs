//! Persistent key-value settings store.
//!
//! The settings file records the schema version, the registered mount
//! points, and the probing paths. An absent file is treated as `{}`, so
//! every field tolerates being missing. The version string is advanced to
//! [`SettingsStore::CURRENT_VERSION`] only after cache content has been
//! durably written; the loader owns that ordering.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::mount::MountPointInfo;

/// Durable record of mount points, probing paths, and the schema version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsStore {
    /// Schema tag the in-memory structures were built against. Empty on
    /// first run.
    pub version: String,

    /// Registered mount points. Written only through the mount point
    /// registry.
    pub mount_points: Vec<MountPointInfo>,

    /// Additional filesystem roots searched for components and templates.
    pub probing_paths: BTreeSet<String>,
}

impl SettingsStore {
    /// The schema tag this implementation writes.
    pub const CURRENT_VERSION: &'static str = "v1.0";

    /// Parse a settings payload. `"{}"` yields an empty store.
    pub fn load(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Serialize the store for persistence.
    pub fn serialize(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// First-run bootstrap: if no probing paths were loaded, insert the
    /// default content directory. Returns whether an insert happened.
    pub fn ensure_probing_path_default(&mut self, default: &Path) -> bool {
        if !self.probing_paths.is_empty() {
            return false;
        }
        self.probing_paths
            .insert(default.to_string_lossy().into_owned())
    }

    /// Insert a probing path; duplicates are silently absorbed. Returns
    /// whether the set changed.
    pub fn add_probing_path(&mut self, path: &str) -> bool {
        self.probing_paths.insert(path.to_string())
    }

    /// Advance the version to the current schema tag.
    pub fn set_version_to_current(&mut self) {
        self.version = Self::CURRENT_VERSION.to_string();
    }

    /// Whether the stored version matches the current schema tag,
    /// ASCII case-insensitively. An empty version is never current.
    pub fn is_version_current(&self) -> bool {
        !self.version.is_empty() && self.version.eq_ignore_ascii_case(Self::CURRENT_VERSION)
    }
}
