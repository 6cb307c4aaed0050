//! On-disk template cache files.
//!
//! One cache file exists per locale plus one locale-neutral file, all in the
//! hive root. Loading a locale that has no file of its own falls back to the
//! neutral cache and writes a copy under the locale's filename, so repeated
//! loads of the same locale become direct hits.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{HiveError, Result};
use crate::fs::Filesystem;
use crate::hive::Paths;
use crate::mount::MountPointRegistry;

use super::{TemplateCache, TemplateInfo};

/// Reads and writes per-locale template cache files.
pub struct CacheFiles {
    paths: Paths,
    filesystem: Arc<dyn Filesystem>,
}

impl CacheFiles {
    pub fn new(paths: Paths, filesystem: Arc<dyn Filesystem>) -> Self {
        Self { paths, filesystem }
    }

    /// Load the cache for a locale.
    ///
    /// Resolution order: exact locale file, then the neutral file (cloned
    /// under the locale's filename on the way), then an empty cache.
    pub fn load_for_locale(&self, locale: Option<&str>) -> Result<TemplateCache> {
        let exact = self.paths.template_cache_file(locale);
        let neutral = self.paths.template_cache_file(None);

        let text = if self.filesystem.exists(&exact) {
            self.filesystem.read_to_string_or(&exact, "{}")?
        } else if locale.is_some() && self.filesystem.exists(&neutral) {
            // Clone the neutral cache so the next load of this locale is a
            // direct hit. This should only happen before any langpack for
            // the locale is installed.
            let text = self.filesystem.read_to_string_or(&neutral, "{}")?;
            self.filesystem.write(&exact, &text)?;
            text
        } else {
            "{}".to_string()
        };

        TemplateCache::load(&text, locale).map_err(|err| HiveError::CacheParse {
            path: exact,
            message: err.to_string(),
        })
    }

    /// The stored inventory for a locale, as a set.
    ///
    /// A cache whose embedded schema tag disagrees with `expected_version`
    /// is still returned; the planner handles the mismatch.
    pub fn templates_for_locale(
        &self,
        locale: Option<&str>,
        expected_version: &str,
    ) -> Result<HashSet<TemplateInfo>> {
        let file = self.paths.template_cache_file(locale);
        let text = self.filesystem.read_to_string_or(&file, "{}")?;
        let cache = TemplateCache::load(&text, locale).map_err(|err| HiveError::CacheParse {
            path: file.clone(),
            message: err.to_string(),
        })?;

        if !cache.schema_version.is_empty() && !cache.matches_version(expected_version) {
            debug!(
                file = %file.display(),
                embedded = %cache.schema_version,
                expected = %expected_version,
                "cache schema version mismatch; rescan owed"
            );
        }

        Ok(cache.templates.into_iter().collect())
    }

    /// Locales that have a cache file of their own on disk.
    pub fn all_locales_with_cache_files(&self) -> Vec<String> {
        let Ok(files) = self.filesystem.list_files(self.paths.root()) else {
            return Vec::new();
        };

        files
            .iter()
            .filter_map(|file| file.file_name()?.to_str())
            .filter_map(Paths::locale_from_cache_file_name)
            .collect()
    }

    /// Persist a cache under its locale's filename, whole-file.
    pub fn write(&self, cache: &TemplateCache) -> Result<()> {
        let file = self.paths.template_cache_file(cache.locale.as_deref());
        let text = cache.serialize().map_err(|err| HiveError::CacheParse {
            path: file.clone(),
            message: err.to_string(),
        })?;
        self.filesystem.write(&file, &text)?;
        Ok(())
    }

    /// Drop entries whose primary mount point is unregistered and clear
    /// secondary references that dangle. Returns whether anything changed.
    ///
    /// Clearing only the dangling secondary reference keeps a torn
    /// mount-point removal from corrupting the primary template record.
    pub fn prune_dangling(templates: &mut Vec<TemplateInfo>, registry: &MountPointRegistry) -> bool {
        let before = templates.len();
        templates.retain(|template| {
            let keep = registry.contains(template.config_mount_point_id);
            if !keep {
                warn!(
                    template = %template.name,
                    mount_point = %template.config_mount_point_id,
                    "dropping cache entry for unregistered mount point"
                );
            }
            keep
        });
        let mut changed = templates.len() != before;

        for template in templates.iter_mut() {
            if let Some(id) = template.host_config_mount_point_id {
                if !registry.contains(id) {
                    template.clear_host_config();
                    changed = true;
                }
            }
            if let Some(id) = template.locale_config_mount_point_id {
                if !registry.contains(id) {
                    template.clear_locale_config();
                    changed = true;
                }
            }
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::PhysicalFileSystem;
    use crate::mount::MountPointInfo;
    use crate::settings::SettingsStore;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn cache_files(temp: &TempDir) -> CacheFiles {
        CacheFiles::new(Paths::new(temp.path()), Arc::new(PhysicalFileSystem))
    }

    fn sample_cache(locale: Option<&str>, names: &[&str]) -> TemplateCache {
        let mount = Uuid::new_v4();
        let generator = Uuid::new_v4();
        let mut cache = TemplateCache::new(locale);
        for name in names {
            cache
                .templates
                .push(TemplateInfo::new(*name, generator, mount, format!("/{name}.json")));
        }
        cache
    }

    #[test]
    fn missing_files_load_as_empty_cache() {
        let temp = TempDir::new().unwrap();
        let files = cache_files(&temp);

        let cache = files.load_for_locale(Some("fr-FR")).unwrap();
        assert!(cache.templates.is_empty());
        assert_eq!(cache.locale.as_deref(), Some("fr-FR"));
    }

    #[test]
    fn locale_miss_clones_neutral_cache() {
        let temp = TempDir::new().unwrap();
        let files = cache_files(&temp);
        let fs = PhysicalFileSystem;

        files.write(&sample_cache(None, &["web"])).unwrap();

        let loaded = files.load_for_locale(Some("fr-FR")).unwrap();
        assert_eq!(loaded.templates.len(), 1);

        // The clone is byte-identical to the neutral file.
        let paths = Paths::new(temp.path());
        let neutral = fs
            .read_to_string_or(&paths.template_cache_file(None), "")
            .unwrap();
        let cloned = fs
            .read_to_string_or(&paths.template_cache_file(Some("fr-FR")), "")
            .unwrap();
        assert_eq!(neutral, cloned);
    }

    #[test]
    fn second_locale_load_reads_the_clone_directly() {
        let temp = TempDir::new().unwrap();
        let files = cache_files(&temp);
        let fs = PhysicalFileSystem;
        let paths = Paths::new(temp.path());

        files.write(&sample_cache(None, &["web"])).unwrap();
        files.load_for_locale(Some("fr-FR")).unwrap();

        // Replace the neutral file; the locale load must not pick it up.
        files.write(&sample_cache(None, &["web", "api"])).unwrap();
        let second = files.load_for_locale(Some("fr-FR")).unwrap();
        assert_eq!(second.templates.len(), 1);

        let cloned = fs
            .read_to_string_or(&paths.template_cache_file(Some("fr-FR")), "")
            .unwrap();
        assert!(cloned.contains("web"));
        assert!(!cloned.contains("api"));
    }

    #[test]
    fn exact_locale_file_wins_over_neutral() {
        let temp = TempDir::new().unwrap();
        let files = cache_files(&temp);

        files.write(&sample_cache(None, &["neutral-only"])).unwrap();
        files
            .write(&sample_cache(Some("de-DE"), &["german"]))
            .unwrap();

        let loaded = files.load_for_locale(Some("de-DE")).unwrap();
        assert_eq!(loaded.templates[0].name, "german");
    }

    #[test]
    fn all_locales_excludes_the_neutral_file() {
        let temp = TempDir::new().unwrap();
        let files = cache_files(&temp);

        files.write(&sample_cache(None, &["a"])).unwrap();
        files.write(&sample_cache(Some("fr-FR"), &["b"])).unwrap();
        files.write(&sample_cache(Some("de-DE"), &["c"])).unwrap();

        let mut locales = files.all_locales_with_cache_files();
        locales.sort();
        assert_eq!(locales, vec!["de-DE", "fr-FR"]);
    }

    #[test]
    fn templates_for_locale_tolerates_version_mismatch() {
        let temp = TempDir::new().unwrap();
        let files = cache_files(&temp);

        let mut cache = sample_cache(None, &["old"]);
        cache.schema_version = "v0.1".to_string();
        files.write(&cache).unwrap();

        let templates = files
            .templates_for_locale(None, SettingsStore::CURRENT_VERSION)
            .unwrap();
        assert_eq!(templates.len(), 1);
    }

    #[test]
    fn malformed_cache_file_is_fatal() {
        let temp = TempDir::new().unwrap();
        let files = cache_files(&temp);
        let paths = Paths::new(temp.path());

        PhysicalFileSystem
            .write(&paths.template_cache_file(None), "{broken")
            .unwrap();

        let err = files.load_for_locale(None).unwrap_err();
        assert!(matches!(err, HiveError::CacheParse { .. }));
    }

    #[test]
    fn prune_drops_entries_with_unregistered_primary_mount() {
        let registered = MountPointInfo::filesystem("/registered");
        let registry = MountPointRegistry::index(&[registered.clone()]);
        let generator = Uuid::new_v4();

        let mut templates = vec![
            TemplateInfo::new("kept", generator, registered.id, "/kept.json"),
            TemplateInfo::new("dropped", generator, Uuid::new_v4(), "/dropped.json"),
        ];

        let changed = CacheFiles::prune_dangling(&mut templates, &registry);
        assert!(changed);
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].name, "kept");
    }

    #[test]
    fn prune_clears_only_dangling_secondary_refs() {
        let registered = MountPointInfo::filesystem("/registered");
        let registry = MountPointRegistry::index(&[registered.clone()]);

        let mut info = TemplateInfo::new("web", Uuid::new_v4(), registered.id, "/c.json");
        info.host_config_mount_point_id = Some(Uuid::new_v4());
        info.host_config_place = Some("/h.json".into());
        info.locale_config_mount_point_id = Some(registered.id);
        info.locale_config_place = Some("/l.json".into());
        let mut templates = vec![info];

        let changed = CacheFiles::prune_dangling(&mut templates, &registry);
        assert!(changed);
        assert_eq!(templates.len(), 1);
        assert!(templates[0].host_config_place.is_none());
        assert_eq!(templates[0].locale_config_place.as_deref(), Some("/l.json"));
    }

    #[test]
    fn prune_is_noop_when_everything_is_registered() {
        let registered = MountPointInfo::filesystem("/registered");
        let registry = MountPointRegistry::index(&[registered.clone()]);

        let mut templates = vec![TemplateInfo::new(
            "web",
            Uuid::new_v4(),
            registered.id,
            "/c.json",
        )];

        assert!(!CacheFiles::prune_dangling(&mut templates, &registry));
        assert_eq!(templates.len(), 1);
    }
}
