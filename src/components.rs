//! Generator components and template discovery.
//!
//! Generators and discovery are external collaborators: the loader only
//! needs to look a generator up by id and hand it the located config files,
//! and to ask discovery to enumerate templates under a place during a
//! rescan. Both are consumed through traits.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::cache::TemplateInfo;

/// A usable template, built by a generator from its located config files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Display name of the template.
    pub name: String,

    /// Generator that built it.
    pub generator_id: Uuid,

    /// Resolved path of the primary config file.
    pub config_file: std::path::PathBuf,

    /// Resolved path of the locale config file, if one applied.
    pub locale_config_file: Option<std::path::PathBuf>,

    /// Resolved path of the host config file, if one applied.
    pub host_config_file: Option<std::path::PathBuf>,
}

/// Turns located config files into a usable template.
pub trait Generator: Send + Sync {
    /// Identity of this generator, referenced by cached template records.
    fn id(&self) -> Uuid;

    /// Build a template from a config file plus optional locale and host
    /// configs. `None` means the config could not be interpreted; the
    /// caller decides whether that is acceptable.
    fn try_template_from_config(
        &self,
        config: &Path,
        locale_config: Option<&Path>,
        host_config: Option<&Path>,
        baseline_name: Option<&str>,
    ) -> Option<Template>;
}

/// Enumerates template metadata under a mount point place during a rescan.
pub trait TemplateDiscovery: Send + Sync {
    fn scan(&self, place: &str) -> Vec<TemplateInfo>;
}

/// Registry mapping generator ids to generator implementations.
#[derive(Default)]
pub struct ComponentManager {
    generators: HashMap<Uuid, Arc<dyn Generator>>,
}

impl ComponentManager {
    /// Build a manager over a set of generators.
    pub fn new(generators: impl IntoIterator<Item = Arc<dyn Generator>>) -> Self {
        let mut map = HashMap::new();
        for generator in generators {
            map.insert(generator.id(), generator);
        }
        Self { generators: map }
    }

    /// Look up a generator by id.
    pub fn get(&self, id: Uuid) -> Option<Arc<dyn Generator>> {
        self.generators.get(&id).cloned()
    }

    /// Register an additional generator; replaces any previous one with the
    /// same id.
    pub fn register(&mut self, generator: Arc<dyn Generator>) {
        self.generators.insert(generator.id(), generator);
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}

impl std::fmt::Debug for ComponentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentManager")
            .field("generators", &self.generators.keys().collect::<Vec<_>>())
            .finish()
    }
}
