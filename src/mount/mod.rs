//! Mount points: registered locations template sources are read from.
//!
//! A mount point is an addressable place (filesystem directory, archive)
//! recorded durably in the settings store and indexed in memory by the
//! [`MountPointRegistry`]. Live connections to mount points are scoped
//! resources handed out and reclaimed by the [`MountPointManager`].

pub mod info;
pub mod manager;
pub mod registry;

pub use info::{MountPointInfo, ARCHIVE_FACTORY_ID, FILESYSTEM_FACTORY_ID};
pub use manager::{MountPoint, MountPointManager};
pub use registry::MountPointRegistry;
