//! hiveload - settings and template-cache loader for template-engine hives.
//!
//! A hive is the directory a template engine keeps its durable state in:
//! the registry of mount points templates are read from, the probing paths
//! searched for components, and the per-locale caches of discovered
//! template metadata. This crate loads that state lazily, keeps the caches
//! current, and decides when a rescan of the underlying sources is owed.
//!
//! # Modules
//!
//! - [`cache`] - Per-locale template metadata caches and their files
//! - [`components`] - Generator and template-discovery collaborator traits
//! - [`error`] - Error types and result alias
//! - [`fs`] - Filesystem capability trait and the physical implementation
//! - [`hive`] - Hive path layout and host environment
//! - [`loader`] - The lazy-loading orchestrator and rescan planner
//! - [`mount`] - Mount point records, registry, and live connections
//! - [`retry`] - Bounded retry for contended file access
//! - [`settings`] - The durable settings store and descriptor cache
//!
//! # Example
//!
//! ```
//! use hiveload::hive::Paths;
//!
//! let paths = Paths::new("/var/lib/engine/hive");
//! assert!(paths.template_cache_file(Some("fr-FR")).ends_with("fr-FR.templatecache.json"));
//! ```

pub mod cache;
pub mod components;
pub mod error;
pub mod fs;
pub mod hive;
pub mod loader;
pub mod mount;
pub mod retry;
pub mod settings;

pub use cache::{CacheFiles, TemplateCache, TemplateInfo};
pub use components::{ComponentManager, Generator, Template, TemplateDiscovery};
pub use error::{HiveError, Result};
pub use hive::{EngineHost, Paths};
pub use loader::{LoadState, SettingsLoader};
pub use mount::{MountPoint, MountPointInfo, MountPointManager, MountPointRegistry};
pub use settings::{InstallDescriptorCache, SettingsStore};
