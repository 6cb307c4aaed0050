//! Hive layout and host environment.
//!
//! A "hive" is the directory holding the engine's durable state: the
//! settings file, the per-locale template cache files, and the
//! install-descriptor cache. [`Paths`] derives every filename from the hive
//! root so callers never build paths by hand. [`EngineHost`] carries the
//! identity of the embedding host: its identifier (used to pick host config
//! files), its locale, and the filesystem it operates against.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::fs::{Filesystem, PhysicalFileSystem};

/// File name of the locale-neutral template cache.
const NEUTRAL_CACHE_FILE: &str = "templatecache.json";

/// Suffix shared by per-locale template cache files.
const LOCALE_CACHE_SUFFIX: &str = ".templatecache.json";

/// Derives the well-known file locations inside a hive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    root: PathBuf,
}

impl Paths {
    /// Create paths rooted at a hive directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The hive root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    /// The install-descriptor cache file.
    pub fn install_descriptors_file(&self) -> PathBuf {
        self.root.join("installDescriptors.json")
    }

    /// Default content directory, used to bootstrap the probing-path set on
    /// first run.
    pub fn content_dir(&self) -> PathBuf {
        self.root.join("content")
    }

    /// Template cache file for a locale; `None` is the locale-neutral cache.
    pub fn template_cache_file(&self, locale: Option<&str>) -> PathBuf {
        match locale {
            Some(locale) => self.root.join(format!("{locale}{LOCALE_CACHE_SUFFIX}")),
            None => self.root.join(NEUTRAL_CACHE_FILE),
        }
    }

    /// Extract the locale from a cache file name.
    ///
    /// The neutral cache file does not carry a locale, so it never matches
    /// the locale suffix.
    pub fn locale_from_cache_file_name(file_name: &str) -> Option<String> {
        let locale = file_name.strip_suffix(LOCALE_CACHE_SUFFIX)?;
        if locale.is_empty() {
            return None;
        }
        Some(locale.to_string())
    }
}

/// Identity and environment of the embedding host.
#[derive(Clone)]
pub struct EngineHost {
    /// Host identifier, preferred when resolving host template config files.
    pub host_identifier: String,

    /// Ordered fallback host names for host config resolution.
    pub fallback_host_names: Vec<String>,

    /// Locale the host is running under, if any.
    pub locale: Option<String>,

    /// Filesystem all hive and mount-point access goes through.
    pub filesystem: Arc<dyn Filesystem>,
}

impl EngineHost {
    /// Create a host with the physical filesystem, no locale, and no
    /// fallback host names.
    pub fn new(host_identifier: impl Into<String>) -> Self {
        Self {
            host_identifier: host_identifier.into(),
            fallback_host_names: Vec::new(),
            locale: None,
            filesystem: Arc::new(PhysicalFileSystem),
        }
    }

    /// Set the host locale.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Set the ordered fallback host names.
    pub fn with_fallback_host_names(mut self, names: Vec<String>) -> Self {
        self.fallback_host_names = names;
        self
    }

    /// Replace the filesystem implementation.
    pub fn with_filesystem(mut self, filesystem: Arc<dyn Filesystem>) -> Self {
        self.filesystem = filesystem;
        self
    }
}

impl std::fmt::Debug for EngineHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHost")
            .field("host_identifier", &self.host_identifier)
            .field("fallback_host_names", &self.fallback_host_names)
            .field("locale", &self.locale)
            .finish_non_exhaustive()
    }
}
