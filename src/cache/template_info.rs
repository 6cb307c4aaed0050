//! Cached template metadata records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata for one discovered template.
///
/// Identity is structural equality over all fields; the planner and
/// `get_templates` deduplicate through hash sets. `config_mount_point_id`
/// must reference a registered mount point; entries that do not are pruned
/// on the next cache write.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInfo {
    /// Display name of the template.
    pub name: String,

    /// Generator that can build this template from its config.
    pub generator_id: Uuid,

    /// Mount point the config file lives in.
    pub config_mount_point_id: Uuid,

    /// Place of the config file, relative to its mount point.
    pub config_place: String,

    /// Last-write time of the config file recorded at scan time. Absent for
    /// sources without meaningful timestamps.
    #[serde(default)]
    pub config_timestamp_utc: Option<DateTime<Utc>>,

    /// Mount point of the locale config file, if any.
    #[serde(default)]
    pub locale_config_mount_point_id: Option<Uuid>,

    /// Place of the locale config file, if any.
    #[serde(default)]
    pub locale_config_place: Option<String>,

    /// Mount point of the host config file, if any.
    #[serde(default)]
    pub host_config_mount_point_id: Option<Uuid>,

    /// Place of the host config file, if any.
    #[serde(default)]
    pub host_config_place: Option<String>,
}

impl TemplateInfo {
    /// A minimal record for a template discovered at `config_place` inside
    /// a mount point.
    pub fn new(
        name: impl Into<String>,
        generator_id: Uuid,
        config_mount_point_id: Uuid,
        config_place: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            generator_id,
            config_mount_point_id,
            config_place: config_place.into(),
            config_timestamp_utc: None,
            locale_config_mount_point_id: None,
            locale_config_place: None,
            host_config_mount_point_id: None,
            host_config_place: None,
        }
    }

    /// Whether a locale config reference is present and non-empty.
    pub fn has_locale_config(&self) -> bool {
        self.locale_config_mount_point_id.is_some()
            && self
                .locale_config_place
                .as_deref()
                .is_some_and(|place| !place.is_empty())
    }

    /// Drop the locale config reference, keeping the primary record intact.
    pub fn clear_locale_config(&mut self) {
        self.locale_config_mount_point_id = None;
        self.locale_config_place = None;
    }

    /// Drop the host config reference, keeping the primary record intact.
    pub fn clear_host_config(&mut self) {
        self.host_config_mount_point_id = None;
        self.host_config_place = None;
    }
}
