//! Loader orchestration.
//!
//! [`SettingsLoader`] is the lazy-initialization façade over the whole
//! subsystem. Loading sequences: settings read (with bounded retry on
//! contention) → parse → probing-path bootstrap → mount point indexing →
//! component/mount-point manager construction → template cache
//! materialization. The template cache and the install-descriptor cache are
//! each behind their own lazy flag and can be re-entered independently.
//!
//! Callers must serialize access; none of the state transitions are atomic
//! across steps. The retry loops exist for *cross-process* contention on the
//! settings file, not for intra-process concurrency.

mod host_config;
mod rescan;

pub use host_config::HOST_CONFIG_SUFFIX;

use anyhow::Context;
use std::collections::HashSet;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::{CacheFiles, TemplateCache, TemplateInfo};
use crate::components::{ComponentManager, Generator, Template, TemplateDiscovery};
use crate::error::{HiveError, Result};
use crate::fs::Filesystem;
use crate::hive::{EngineHost, Paths};
use crate::mount::{MountPoint, MountPointInfo, MountPointManager, MountPointRegistry};
use crate::retry::with_retry;
use crate::settings::{InstallDescriptorCache, SettingsStore};

/// Attempt ceiling for reading the settings file under contention.
pub const MAX_LOAD_ATTEMPTS: usize = 20;

/// Attempt ceiling for the probing-path save loop.
pub const MAX_SAVE_ATTEMPTS: usize = 10;

const LOAD_RETRY_DELAY: Duration = Duration::from_millis(2);
const SAVE_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Initialization state of a [`SettingsLoader`].
///
/// `ensure_loaded` drives `Unloaded -> Loading -> Loaded`; `reload` resets
/// to `Unloaded` first. A failed load lands back in `Unloaded` so the next
/// attempt starts clean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Loaded,
}

/// Lazy-loading façade over the settings store, mount point registry, and
/// template cache.
pub struct SettingsLoader {
    host: EngineHost,
    paths: Paths,
    discovery: Arc<dyn TemplateDiscovery>,
    generators: Vec<Arc<dyn Generator>>,

    state: LoadState,
    templates_loaded: bool,
    descriptors_loaded: bool,

    settings: SettingsStore,
    registry: MountPointRegistry,
    template_cache: TemplateCache,
    descriptors: InstallDescriptorCache,
    components: ComponentManager,
    mounts: MountPointManager,
}

impl SettingsLoader {
    /// Create an unloaded loader over a hive directory.
    ///
    /// Nothing is read from disk until the first operation that needs state.
    pub fn new(
        host: EngineHost,
        hive_root: impl Into<PathBuf>,
        generators: Vec<Arc<dyn Generator>>,
        discovery: Arc<dyn TemplateDiscovery>,
    ) -> Self {
        let paths = Paths::new(hive_root);
        let mounts = MountPointManager::new(Arc::clone(&host.filesystem));
        Self {
            host,
            paths,
            discovery,
            generators,
            state: LoadState::Unloaded,
            templates_loaded: false,
            descriptors_loaded: false,
            settings: SettingsStore::default(),
            registry: MountPointRegistry::default(),
            template_cache: TemplateCache::default(),
            descriptors: InstallDescriptorCache::default(),
            components: ComponentManager::default(),
            mounts,
        }
    }

    /// Current initialization state.
    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Load the hive if it is not loaded yet. No-op when already `Loaded`.
    pub fn ensure_loaded(&mut self) -> Result<()> {
        if self.state == LoadState::Loaded {
            return Ok(());
        }

        self.state = LoadState::Loading;
        match self.load_settings() {
            Ok(()) => {
                self.state = LoadState::Loaded;
                Ok(())
            }
            Err(err) => {
                self.state = LoadState::Unloaded;
                Err(err)
            }
        }
    }

    /// Discard loaded state and load again.
    pub fn reload(&mut self) -> Result<()> {
        self.state = LoadState::Unloaded;
        self.ensure_loaded()
    }

    fn load_settings(&mut self) -> Result<()> {
        let settings_path = self.paths.settings_file();
        let filesystem = Arc::clone(&self.host.filesystem);

        // Another process may hold a transient write lock on the settings
        // file; retry with a short fixed delay before treating it as fatal.
        let text = with_retry(MAX_LOAD_ATTEMPTS, LOAD_RETRY_DELAY, || {
            filesystem.read_to_string_or(&settings_path, "{}")
        })
        .map_err(|source| HiveError::SettingsRead {
            path: settings_path.clone(),
            source,
        })?;

        let mut settings =
            SettingsStore::load(&text).map_err(|err| HiveError::SettingsParse {
                path: settings_path,
                message: err.to_string(),
            })?;
        settings.ensure_probing_path_default(&self.paths.content_dir());

        self.registry = MountPointRegistry::index(&settings.mount_points);
        self.settings = settings;

        // Managers need the loaded store, so they are (re)built here rather
        // than at construction.
        self.components = ComponentManager::new(self.generators.iter().cloned());
        self.mounts = MountPointManager::new(Arc::clone(&self.host.filesystem));

        self.ensure_templates_loaded()
    }

    /// Materialize the template cache if it is not loaded yet.
    pub fn ensure_templates_loaded(&mut self) -> Result<()> {
        if self.templates_loaded {
            return Ok(());
        }

        self.template_cache = self
            .cache_files()
            .load_for_locale(self.host.locale.as_deref())?;
        self.templates_loaded = true;
        Ok(())
    }

    /// Discard the in-memory template cache and load a fresh instance.
    pub fn reload_templates(&mut self) -> Result<()> {
        self.templates_loaded = false;
        self.ensure_templates_loaded()
    }

    fn ensure_descriptors_loaded(&mut self) -> Result<()> {
        if self.descriptors_loaded {
            return Ok(());
        }

        let path = self.paths.install_descriptors_file();
        let text = self.host.filesystem.read_to_string_or(&path, "{}")?;
        self.descriptors =
            InstallDescriptorCache::load(&text).map_err(|err| HiveError::CacheParse {
                path,
                message: err.to_string(),
            })?;
        self.descriptors_loaded = true;
        Ok(())
    }

    fn cache_files(&self) -> CacheFiles {
        CacheFiles::new(self.paths.clone(), Arc::clone(&self.host.filesystem))
    }

    // --- Persistence ---

    /// Persist the settings store and the current template cache.
    pub fn save(&mut self) -> Result<()> {
        self.ensure_loaded()?;
        let cache = self.template_cache.clone();
        self.save_with_cache(cache, false)
    }

    /// Write `cache_to_save`, advance the settings version, and persist the
    /// settings and descriptor files.
    ///
    /// Ordering contract: cache content reaches disk before the version flag
    /// advances. A crash in between leaves an old-version settings file,
    /// which the planner reads as "full rescan owed".
    fn save_with_cache(&mut self, cache_to_save: TemplateCache, is_working_cache: bool) -> Result<()> {
        let mut templates = cache_to_save.templates;
        if CacheFiles::prune_dangling(&mut templates, &self.registry) {
            debug!("cache entries pruned while saving");
        }
        let cache = TemplateCache {
            schema_version: SettingsStore::CURRENT_VERSION.to_string(),
            locale: cache_to_save.locale,
            templates,
        };
        self.cache_files().write(&cache)?;

        self.settings.set_version_to_current();
        self.write_settings_file()?;
        self.write_descriptor_cache()?;

        if is_working_cache {
            self.reload_templates()?;
        }
        Ok(())
    }

    fn write_settings_file(&self) -> Result<()> {
        let text = self
            .settings
            .serialize()
            .context("serializing settings store")?;
        self.host
            .filesystem
            .write(&self.paths.settings_file(), &text)?;
        Ok(())
    }

    // Descriptors are loaded on demand, so force the load before rewriting
    // the file wholesale.
    fn write_descriptor_cache(&mut self) -> Result<()> {
        self.ensure_descriptors_loaded()?;
        let text = self
            .descriptors
            .serialize()
            .context("serializing install descriptor cache")?;
        self.host
            .filesystem
            .write(&self.paths.install_descriptors_file(), &text)?;
        Ok(())
    }

    /// Add a probing path and persist the store.
    ///
    /// Returns immediately without writing when the path is already present.
    /// On a save failure the store is fully reloaded (to pick up concurrent
    /// external changes) and the attempt repeats, up to a fixed ceiling;
    /// exhausting the ceiling surfaces the last error.
    pub fn add_probing_path(&mut self, path: &str) -> Result<()> {
        self.ensure_loaded()?;

        let mut last_err = None;
        for _ in 0..MAX_SAVE_ATTEMPTS {
            if !self.settings.add_probing_path(path) {
                return Ok(());
            }

            match self.save() {
                Ok(()) => return Ok(()),
                Err(err) => {
                    debug!(error = %err, "probing path save failed; reloading and retrying");
                    last_err = Some(err);
                    thread::sleep(SAVE_RETRY_DELAY);
                    self.reload()?;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            HiveError::Io(io::Error::other("probing path save retries exhausted"))
        }))
    }

    // --- Template cache operations ---

    /// Rescan whatever the planner selects and persist a fresh cache.
    ///
    /// Does nothing when the planner selects no mount points.
    ///
    /// Only the host locale's cache file is rewritten. Other locale files,
    /// the neutral one included, keep their entries until their own next
    /// write, and those entries keep participating in rescan planning.
    pub fn rebuild_cache_from_settings_if_not_current(&mut self, force_rebuild: bool) -> Result<()> {
        self.ensure_loaded()?;

        let to_scan = self.plan_rescan_inner(force_rebuild)?;
        if to_scan.is_empty() {
            return Ok(());
        }

        let mut working = TemplateCache::new(self.host.locale.as_deref());
        let discovery = Arc::clone(&self.discovery);
        for mount_point in &to_scan {
            working.scan(&mount_point.place, discovery.as_ref());
        }

        self.save_with_cache(working, true)
    }

    /// Union the current cache's templates into `templates`.
    pub fn get_templates(&mut self, templates: &mut HashSet<TemplateInfo>) -> Result<()> {
        self.ensure_loaded()?;
        templates.extend(self.template_cache.templates.iter().cloned());
        Ok(())
    }

    /// Write a template list as the cache for `locale`.
    ///
    /// Entries referencing unregistered mount points are dropped; dangling
    /// secondary references are cleared. The file is only written when
    /// content or mount-point references changed, but the in-memory cache is
    /// reloaded whenever `locale` is the host's locale.
    pub fn write_template_cache(
        &mut self,
        templates: Vec<TemplateInfo>,
        locale: Option<&str>,
        has_content_changes: bool,
    ) -> Result<()> {
        self.ensure_loaded()?;

        let mut to_cache = templates;
        let has_mount_point_changes = CacheFiles::prune_dangling(&mut to_cache, &self.registry);

        if has_content_changes || has_mount_point_changes {
            let cache = TemplateCache {
                schema_version: SettingsStore::CURRENT_VERSION.to_string(),
                locale: locale.map(str::to_string),
                templates: to_cache,
            };
            self.cache_files().write(&cache)?;
        }

        let is_host_locale = match (locale, self.host.locale.as_deref()) {
            (None, None) => true,
            (Some(written), Some(current)) => written == current,
            _ => false,
        };
        if is_host_locale {
            self.reload_templates()?;
        }
        Ok(())
    }

    // --- Template loading ---

    /// Build a usable template from a cached record.
    ///
    /// Any lookup miss along the way (unknown generator, unreachable mount
    /// point, uninterpretable config) is a `None`, not an error.
    pub fn load_template(
        &mut self,
        info: &TemplateInfo,
        baseline_name: Option<&str>,
    ) -> Result<Option<Template>> {
        self.ensure_loaded()?;

        let Some(generator) = self.components.get(info.generator_id) else {
            return Ok(None);
        };
        let Some(mount) = self.demand_by_id(info.config_mount_point_id) else {
            return Ok(None);
        };
        let config = mount.file(&info.config_place);

        let locale_config = if info.has_locale_config() {
            let locale_mount_id = info
                .locale_config_mount_point_id
                .unwrap_or(info.config_mount_point_id);
            let Some(locale_mount) = self.demand_by_id(locale_mount_id) else {
                self.mounts.release(mount);
                return Ok(None);
            };
            let place = info.locale_config_place.as_deref().unwrap_or_default();
            let path = locale_mount.file(place);
            self.mounts.release(locale_mount);
            Some(path)
        } else {
            None
        };

        let host_config = self.find_best_host_template_config_file(&config);

        let template = generator.try_template_from_config(
            &config,
            locale_config.as_deref(),
            host_config.as_deref(),
            baseline_name,
        );
        if template.is_none() {
            warn!(
                template = %info.name,
                config = %config.display(),
                "generator could not read template config"
            );
        }

        self.mounts.release(mount);
        Ok(template)
    }

    /// Best host config file for a template config: sibling files matching
    /// the host-config suffix, preferring the current host identifier, then
    /// the host's fallback names in order.
    pub fn find_best_host_template_config_file(
        &self,
        config: &std::path::Path,
    ) -> Option<PathBuf> {
        host_config::find_best_host_config(self.host.filesystem.as_ref(), &self.host, config)
    }

    // --- Mount point surface ---

    /// All registered mount points.
    pub fn mount_points(&mut self) -> Result<Vec<MountPointInfo>> {
        self.ensure_loaded()?;
        Ok(self.registry.values().cloned().collect())
    }

    /// Register a mount point and persist the store synchronously.
    ///
    /// Returns whether anything was added; a duplicate `(place, parent_id)`
    /// is a no-op.
    pub fn add_mount_point(&mut self, info: MountPointInfo) -> Result<bool> {
        self.ensure_loaded()?;
        if !self.registry.add(&mut self.settings, info) {
            return Ok(false);
        }
        self.write_settings_file()?;
        Ok(true)
    }

    /// Remove mount points from the registry and the store. Unknown ids are
    /// ignored. The store is persisted on the next save.
    pub fn remove_mount_points(&mut self, ids: &[Uuid]) -> Result<()> {
        self.ensure_loaded()?;
        self.registry.remove(&mut self.settings, ids);
        Ok(())
    }

    /// Look up a mount point record by id.
    pub fn try_get_mount_point_info(&mut self, id: Uuid) -> Result<Option<MountPointInfo>> {
        self.ensure_loaded()?;
        Ok(self.registry.get(id).cloned())
    }

    /// Look up a mount point record by place, ASCII case-insensitively.
    pub fn try_get_mount_point_info_from_place(
        &mut self,
        place: &str,
    ) -> Result<Option<MountPointInfo>> {
        self.ensure_loaded()?;
        Ok(self.registry.lookup_by_place(place).cloned())
    }

    /// Open a live connection to a registered mount point.
    pub fn try_demand_mount_point(&mut self, id: Uuid) -> Result<Option<MountPoint>> {
        self.ensure_loaded()?;
        Ok(self.demand_by_id(id))
    }

    /// Place lookup chained to a live connection demand.
    pub fn try_demand_mount_point_from_place(
        &mut self,
        place: &str,
    ) -> Result<Option<MountPoint>> {
        self.ensure_loaded()?;
        let Some(info) = self.registry.lookup_by_place(place).cloned() else {
            return Ok(None);
        };
        Ok(self.mounts.demand(&info))
    }

    /// Resolve a (mount point id, place) pair to a concrete file.
    ///
    /// The returned connection is the caller's to release. An absent file
    /// releases the connection internally and reports `None`.
    pub fn try_get_file_from_id_and_place(
        &mut self,
        mount_point_id: Uuid,
        place: &str,
    ) -> Result<Option<(PathBuf, MountPoint)>> {
        self.ensure_loaded()?;
        if place.is_empty() {
            return Ok(None);
        }
        let Some(mount) = self.demand_by_id(mount_point_id) else {
            return Ok(None);
        };

        let file = mount.file(place);
        if self.host.filesystem.exists(&file) {
            Ok(Some((file, mount)))
        } else {
            self.mounts.release(mount);
            Ok(None)
        }
    }

    /// Return a live connection to the manager.
    pub fn release_mount_point(&mut self, mount_point: MountPoint) {
        self.mounts.release(mount_point);
    }

    /// Release a live connection, then remove its registry entry.
    ///
    /// Teardown runs before the structural removal so the registry can never
    /// hand out a freed connection.
    pub fn remove_and_release(&mut self, mount_point: MountPoint) -> Result<()> {
        let id = mount_point.id();
        self.mounts.release(mount_point);
        self.remove_mount_points(&[id])
    }

    fn demand_by_id(&mut self, id: Uuid) -> Option<MountPoint> {
        let info = self.registry.get(id).cloned()?;
        self.mounts.demand(&info)
    }

    // --- Loaded-state accessors ---

    /// The loaded settings store.
    pub fn settings(&mut self) -> Result<&SettingsStore> {
        self.ensure_loaded()?;
        Ok(&self.settings)
    }

    /// The current in-memory template cache.
    pub fn templates(&mut self) -> Result<&TemplateCache> {
        self.ensure_loaded()?;
        Ok(&self.template_cache)
    }

    /// The generator registry.
    pub fn components(&mut self) -> Result<&ComponentManager> {
        self.ensure_loaded()?;
        Ok(&self.components)
    }

    /// The install-descriptor cache, loaded on demand.
    pub fn install_descriptors(&mut self) -> Result<&InstallDescriptorCache> {
        self.ensure_loaded()?;
        self.ensure_descriptors_loaded()?;
        Ok(&self.descriptors)
    }

    /// The live-connection manager, mainly for inspecting open connections.
    pub fn mount_point_manager(&self) -> &MountPointManager {
        &self.mounts
    }
}

impl std::fmt::Debug for SettingsLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsLoader")
            .field("state", &self.state)
            .field("templates_loaded", &self.templates_loaded)
            .field("hive", &self.paths.root())
            .finish_non_exhaustive()
    }
}
