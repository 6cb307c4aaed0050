//! In-memory template cache instances.

use serde::{Deserialize, Serialize};

use crate::components::TemplateDiscovery;
use crate::settings::SettingsStore;

use super::TemplateInfo;

/// One locale's template inventory.
///
/// Instances are mutated wholesale: a rescan fills a fresh working cache,
/// and a reload discards the old instance entirely. The locale is carried by
/// the file name on disk, not the serialized payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TemplateCache {
    /// Schema tag embedded in the cache file.
    pub schema_version: String,

    /// Locale this cache was loaded for; `None` is the locale-neutral cache.
    #[serde(skip)]
    pub locale: Option<String>,

    /// Discovered template metadata, in scan order.
    pub templates: Vec<TemplateInfo>,
}

impl TemplateCache {
    /// An empty working cache for a locale, tagged with the current schema.
    pub fn new(locale: Option<&str>) -> Self {
        Self {
            schema_version: SettingsStore::CURRENT_VERSION.to_string(),
            locale: locale.map(str::to_string),
            templates: Vec::new(),
        }
    }

    /// Parse a serialized cache.
    ///
    /// A payload whose embedded schema tag disagrees with the current one is
    /// still loaded; the mismatch is the rescan planner's signal, not a
    /// failure.
    pub fn load(text: &str, locale: Option<&str>) -> serde_json::Result<Self> {
        let mut cache: Self = serde_json::from_str(text)?;
        cache.locale = locale.map(str::to_string);
        Ok(cache)
    }

    /// Serialize for persistence. Always writes the complete template
    /// sequence; there is no incremental mode.
    pub fn serialize(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Whether the embedded schema tag matches `expected`,
    /// ASCII case-insensitively.
    pub fn matches_version(&self, expected: &str) -> bool {
        self.schema_version.eq_ignore_ascii_case(expected)
    }

    /// Walk `place` through the discovery collaborator and append what it
    /// finds. Pure enumeration; persisted state is untouched.
    pub fn scan(&mut self, place: &str, discovery: &dyn TemplateDiscovery) {
        self.templates.extend(discovery.scan(place));
    }
}
