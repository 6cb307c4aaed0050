//! Install-descriptor cache.
//!
//! A free-form JSON object keyed by descriptor id. The file is read
//! permissively (absent file = empty object) and rewritten wholesale on
//! every settings save. Loaded on demand, not at loader initialization.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `{}`-shaped store of install descriptors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstallDescriptorCache {
    entries: Map<String, Value>,
}

impl InstallDescriptorCache {
    /// Parse the cache file contents.
    pub fn load(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Serialize for persistence.
    pub fn serialize(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
