//! Live mount point connections.
//!
//! Demanding a mount point produces a [`MountPoint`], a scoped resource that
//! resolves relative places to concrete paths. Connections are returned to
//! the manager with [`MountPointManager::release`]; the loader's
//! `remove_and_release` releases before the registry entry is removed so a
//! freed connection can never be reached through the registry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::fs::Filesystem;

use super::{MountPointInfo, ARCHIVE_FACTORY_ID, FILESYSTEM_FACTORY_ID};

/// A live connection to a mount point.
#[derive(Debug, Clone)]
pub struct MountPoint {
    info: MountPointInfo,
}

impl MountPoint {
    /// The durable record this connection was opened from.
    pub fn info(&self) -> &MountPointInfo {
        &self.info
    }

    /// Identity of the underlying mount point.
    pub fn id(&self) -> Uuid {
        self.info.id
    }

    /// Resolve a relative place inside this mount point to a path.
    ///
    /// A leading path separator on `place` is stripped so cache entries
    /// recorded as `/templates/x/config.json` join cleanly.
    pub fn file(&self, place: &str) -> PathBuf {
        Path::new(&self.info.place).join(place.trim_start_matches(['/', '\\']))
    }
}

/// Hands out and reclaims live mount point connections.
pub struct MountPointManager {
    filesystem: Arc<dyn Filesystem>,
    open: HashMap<Uuid, usize>,
}

impl MountPointManager {
    pub fn new(filesystem: Arc<dyn Filesystem>) -> Self {
        Self {
            filesystem,
            open: HashMap::new(),
        }
    }

    /// Connect to a mount point.
    ///
    /// Returns `None` for unknown factories or when nothing exists at the
    /// recorded place; absence is a negative result, not an error.
    pub fn demand(&mut self, info: &MountPointInfo) -> Option<MountPoint> {
        if info.factory_id != FILESYSTEM_FACTORY_ID && info.factory_id != ARCHIVE_FACTORY_ID {
            return None;
        }
        if !self.filesystem.exists(Path::new(&info.place)) {
            return None;
        }

        *self.open.entry(info.id).or_insert(0) += 1;
        Some(MountPoint { info: info.clone() })
    }

    /// Return a connection to the manager.
    pub fn release(&mut self, mount_point: MountPoint) {
        let id = mount_point.id();
        match self.open.get(&id).copied() {
            Some(count) if count > 1 => {
                self.open.insert(id, count - 1);
            }
            Some(_) => {
                self.open.remove(&id);
            }
            None => warn!(
                mount_point = %id,
                "released a mount point that was not demanded"
            ),
        }
    }

    /// Number of distinct mount points with outstanding connections.
    pub fn open_connections(&self) -> usize {
        self.open.len()
    }
}

impl std::fmt::Debug for MountPointManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountPointManager")
            .field("open", &self.open)
            .finish_non_exhaustive()
    }
}
