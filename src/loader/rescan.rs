//! Staleness detection and rescan planning.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

use crate::cache::TemplateInfo;
use crate::error::Result;
use crate::fs::Filesystem;
use crate::mount::MountPointInfo;

use super::SettingsLoader;

impl SettingsLoader {
    /// Whether the store's version matches the current schema tag.
    pub fn is_version_current(&self) -> bool {
        self.settings.is_version_current()
    }

    /// Decide which mount points need rescanning.
    ///
    /// An out-of-date store version or `force_rebuild` selects every mount
    /// point referenced by any cached template across all locales.
    /// Otherwise a mount point is selected when any of its filesystem-backed
    /// templates has no recorded timestamp or is older than the file on
    /// disk. Selection is mount-point-granular: one stale template rescans
    /// its whole mount point.
    pub fn plan_rescan(&mut self, force_rebuild: bool) -> Result<Vec<MountPointInfo>> {
        self.ensure_loaded()?;
        self.plan_rescan_inner(force_rebuild)
    }

    pub(super) fn plan_rescan_inner(&self, force_rebuild: bool) -> Result<Vec<MountPointInfo>> {
        let force_scan_all = !self.is_version_current() || force_rebuild;

        let files = self.cache_files();
        let version = &self.settings.version;

        // Locale-independent superset: the neutral cache plus every
        // per-locale cache file on disk.
        let mut all_templates: HashSet<TemplateInfo> = files.templates_for_locale(None, version)?;
        for locale in files.all_locales_with_cache_files() {
            all_templates.extend(files.templates_for_locale(Some(&locale), version)?);
        }

        let mut selected: HashMap<Uuid, MountPointInfo> = HashMap::new();
        for template in &all_templates {
            let Some(mount_point) = self.registry.get(template.config_mount_point_id) else {
                // Already-invalid reference; the next cache write prunes it.
                debug!(
                    template = %template.name,
                    mount_point = %template.config_mount_point_id,
                    "cached template references an unregistered mount point"
                );
                continue;
            };
            if selected.contains_key(&mount_point.id) {
                continue;
            }

            if force_scan_all {
                selected.insert(mount_point.id, mount_point.clone());
                continue;
            }

            // Only filesystem-backed mount points have a meaningful on-disk
            // timestamp; other sources are assumed always current.
            if !mount_point.is_filesystem_backed() {
                continue;
            }

            let config_path = Path::new(&mount_point.place)
                .join(template.config_place.trim_start_matches(['/', '\\']));
            let on_disk = self.host.filesystem.last_write_time_utc(&config_path);

            let stale = match (template.config_timestamp_utc, on_disk) {
                (None, _) => true,
                (Some(cached), Some(disk)) => disk > cached,
                (Some(_), None) => false,
            };
            if stale {
                selected.insert(mount_point.id, mount_point.clone());
            }
        }

        Ok(selected.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TemplateCache;
    use crate::components::TemplateDiscovery;
    use crate::fs::{Filesystem, PhysicalFileSystem};
    use crate::hive::{EngineHost, Paths};
    use chrono::{Duration, Utc};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct NoDiscovery;

    impl TemplateDiscovery for NoDiscovery {
        fn scan(&self, _place: &str) -> Vec<TemplateInfo> {
            Vec::new()
        }
    }

    fn loader(temp: &TempDir) -> SettingsLoader {
        SettingsLoader::new(
            EngineHost::new("test-host"),
            temp.path(),
            Vec::new(),
            Arc::new(NoDiscovery),
        )
    }

    /// Hive with one filesystem mount point, one template config on disk,
    /// and a neutral cache referencing it with the given recorded timestamp.
    fn hive_with_template(
        temp: &TempDir,
        cached_timestamp: Option<chrono::DateTime<Utc>>,
        current_version: bool,
    ) -> (SettingsLoader, MountPointInfo) {
        let fs = PhysicalFileSystem;
        let mount_dir = temp.path().join("mount");
        fs.write(&mount_dir.join("web/config.json"), "{}").unwrap();

        let mount = MountPointInfo::filesystem(mount_dir.to_string_lossy());

        let mut settings = crate::settings::SettingsStore::default();
        if current_version {
            settings.set_version_to_current();
        }
        settings.mount_points.push(mount.clone());
        fs.write(
            &temp.path().join("settings.json"),
            &settings.serialize().unwrap(),
        )
        .unwrap();

        let mut info = TemplateInfo::new("web", Uuid::new_v4(), mount.id, "/web/config.json");
        info.config_timestamp_utc = cached_timestamp;
        let mut cache = TemplateCache::new(None);
        cache.templates.push(info);
        let paths = Paths::new(temp.path());
        fs.write(
            &paths.template_cache_file(None),
            &cache.serialize().unwrap(),
        )
        .unwrap();

        (loader(temp), mount)
    }

    #[test]
    fn on_disk_newer_than_cached_selects_mount_point() {
        let temp = TempDir::new().unwrap();
        let stale = Some(Utc::now() - Duration::hours(1));
        let (mut loader, mount) = hive_with_template(&temp, stale, true);

        let plan = loader.plan_rescan(false).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].id, mount.id);
    }

    #[test]
    fn cached_newer_than_disk_is_not_selected() {
        let temp = TempDir::new().unwrap();
        let fresh = Some(Utc::now() + Duration::hours(1));
        let (mut loader, _) = hive_with_template(&temp, fresh, true);

        let plan = loader.plan_rescan(false).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn missing_recorded_timestamp_selects_mount_point() {
        let temp = TempDir::new().unwrap();
        let (mut loader, _) = hive_with_template(&temp, None, true);

        let plan = loader.plan_rescan(false).unwrap();
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn non_filesystem_factory_is_never_selected_by_timestamps() {
        let temp = TempDir::new().unwrap();
        let fs = PhysicalFileSystem;
        let archive_file = temp.path().join("pack.zip");
        fs.write(&archive_file, "zip").unwrap();

        let mount = MountPointInfo::archive(archive_file.to_string_lossy(), None);
        let mut settings = crate::settings::SettingsStore::default();
        settings.set_version_to_current();
        settings.mount_points.push(mount.clone());
        fs.write(
            &temp.path().join("settings.json"),
            &settings.serialize().unwrap(),
        )
        .unwrap();

        // No recorded timestamp would select a filesystem mount point.
        let mut cache = TemplateCache::new(None);
        cache
            .templates
            .push(TemplateInfo::new("packed", Uuid::new_v4(), mount.id, "/config.json"));
        fs.write(
            &Paths::new(temp.path()).template_cache_file(None),
            &cache.serialize().unwrap(),
        )
        .unwrap();

        let mut loader = loader(&temp);
        let plan = loader.plan_rescan(false).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn force_rebuild_selects_every_referenced_mount_point() {
        let temp = TempDir::new().unwrap();
        let fresh = Some(Utc::now() + Duration::hours(1));
        let (mut loader, mount) = hive_with_template(&temp, fresh, true);

        let plan = loader.plan_rescan(true).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].id, mount.id);
    }

    #[test]
    fn stale_store_version_forces_full_rescan() {
        let temp = TempDir::new().unwrap();
        let fresh = Some(Utc::now() + Duration::hours(1));
        let (mut loader, _) = hive_with_template(&temp, fresh, false);

        assert!(!loader.plan_rescan(false).unwrap().is_empty());
    }

    #[test]
    fn unregistered_mount_point_reference_is_skipped() {
        let temp = TempDir::new().unwrap();
        let fs = PhysicalFileSystem;

        let mut cache = TemplateCache::new(None);
        cache
            .templates
            .push(TemplateInfo::new("orphan", Uuid::new_v4(), Uuid::new_v4(), "/c.json"));
        fs.write(
            &Paths::new(temp.path()).template_cache_file(None),
            &cache.serialize().unwrap(),
        )
        .unwrap();

        let mut loader = loader(&temp);
        let plan = loader.plan_rescan(true).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn templates_from_all_locale_caches_are_considered() {
        let temp = TempDir::new().unwrap();
        let fs = PhysicalFileSystem;
        let mount_dir = temp.path().join("mount");
        fs.write(&mount_dir.join("web/config.json"), "{}").unwrap();

        let mount = MountPointInfo::filesystem(mount_dir.to_string_lossy());
        let mut settings = crate::settings::SettingsStore::default();
        settings.set_version_to_current();
        settings.mount_points.push(mount.clone());
        fs.write(
            &temp.path().join("settings.json"),
            &settings.serialize().unwrap(),
        )
        .unwrap();

        // The only reference to the mount point lives in a locale cache.
        let mut info = TemplateInfo::new("web", Uuid::new_v4(), mount.id, "/web/config.json");
        info.config_timestamp_utc = None;
        let mut cache = TemplateCache::new(Some("fr-FR"));
        cache.templates.push(info);
        fs.write(
            &Paths::new(temp.path()).template_cache_file(Some("fr-FR")),
            &cache.serialize().unwrap(),
        )
        .unwrap();

        let mut loader = loader(&temp);
        let plan = loader.plan_rescan(false).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].id, mount.id);
    }
}
