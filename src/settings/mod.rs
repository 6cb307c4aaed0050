//! Durable settings: the source of truth for where templates live.

pub mod descriptors;
pub mod store;

pub use descriptors::InstallDescriptorCache;
pub use store::SettingsStore;
