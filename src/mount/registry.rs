//! In-memory mount point index, mirroring the settings store.
//!
//! The registry is the only writer of the store's mount-point collection;
//! the store never reaches back into the registry. Re-indexing happens when
//! the loader (re)loads the store.

use std::collections::HashMap;
use uuid::Uuid;

use crate::settings::SettingsStore;

use super::MountPointInfo;

/// Index of mount points by id, kept consistent with a [`SettingsStore`].
#[derive(Debug, Default)]
pub struct MountPointRegistry {
    by_id: HashMap<Uuid, MountPointInfo>,
}

impl MountPointRegistry {
    /// Build an index from a sequence of mount points.
    ///
    /// Duplicate ids resolve last-write-wins.
    pub fn index(mount_points: &[MountPointInfo]) -> Self {
        let mut by_id = HashMap::new();
        for info in mount_points {
            by_id.insert(info.id, info.clone());
        }
        Self { by_id }
    }

    /// Look up a mount point by id.
    pub fn get(&self, id: Uuid) -> Option<&MountPointInfo> {
        self.by_id.get(&id)
    }

    /// Whether a mount point with this id is registered.
    pub fn contains(&self, id: Uuid) -> bool {
        self.by_id.contains_key(&id)
    }

    /// All registered mount points, in no particular order.
    pub fn values(&self) -> impl Iterator<Item = &MountPointInfo> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Register a mount point in both the index and the durable store.
    ///
    /// A mount point whose `(place, parent_id)` pair is already registered
    /// is a no-op; returns whether anything was inserted. The caller is
    /// responsible for persisting the store afterwards.
    pub fn add(&mut self, store: &mut SettingsStore, info: MountPointInfo) -> bool {
        let duplicate = self
            .by_id
            .values()
            .any(|existing| existing.place == info.place && existing.parent_id == info.parent_id);
        if duplicate {
            return false;
        }

        store.mount_points.push(info.clone());
        self.by_id.insert(info.id, info);
        true
    }

    /// Remove mount points from both the index and the durable store.
    ///
    /// Ids that are not registered are ignored.
    pub fn remove(&mut self, store: &mut SettingsStore, ids: &[Uuid]) {
        for id in ids {
            if self.by_id.remove(id).is_some() {
                store.mount_points.retain(|info| info.id != *id);
            }
        }
    }

    /// Find a mount point by place, ASCII case-insensitively.
    pub fn lookup_by_place(&self, place: &str) -> Option<&MountPointInfo> {
        self.by_id
            .values()
            .find(|info| info.place.eq_ignore_ascii_case(place))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(mount_points: Vec<MountPointInfo>) -> SettingsStore {
        SettingsStore {
            mount_points,
            ..Default::default()
        }
    }

    #[test]
    fn index_last_write_wins_on_duplicate_ids() {
        let mut first = MountPointInfo::filesystem("/a");
        let mut second = MountPointInfo::filesystem("/b");
        second.id = first.id;
        first.place = "/a".into();

        let registry = MountPointRegistry::index(&[first.clone(), second.clone()]);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(first.id).unwrap().place, "/b");
    }

    #[test]
    fn add_inserts_into_index_and_store() {
        let mut store = store_with(vec![]);
        let mut registry = MountPointRegistry::default();

        let info = MountPointInfo::filesystem("/templates");
        assert!(registry.add(&mut store, info.clone()));

        assert!(registry.contains(info.id));
        assert_eq!(store.mount_points.len(), 1);
    }

    #[test]
    fn add_same_place_and_parent_is_noop() {
        let mut store = store_with(vec![]);
        let mut registry = MountPointRegistry::default();

        registry.add(&mut store, MountPointInfo::filesystem("/templates"));
        let added = registry.add(&mut store, MountPointInfo::filesystem("/templates"));

        assert!(!added);
        assert_eq!(registry.len(), 1);
        assert_eq!(store.mount_points.len(), 1);
    }

    #[test]
    fn add_same_place_different_parent_is_allowed() {
        let mut store = store_with(vec![]);
        let mut registry = MountPointRegistry::default();

        let parent = MountPointInfo::filesystem("/outer");
        registry.add(&mut store, parent.clone());
        registry.add(&mut store, MountPointInfo::archive("/pack.zip", None));
        let added = registry.add(
            &mut store,
            MountPointInfo::archive("/pack.zip", Some(parent.id)),
        );

        assert!(added);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn remove_deletes_from_index_and_store() {
        let info = MountPointInfo::filesystem("/templates");
        let mut store = store_with(vec![info.clone()]);
        let mut registry = MountPointRegistry::index(&store.mount_points.clone());

        registry.remove(&mut store, &[info.id]);

        assert!(registry.is_empty());
        assert!(store.mount_points.is_empty());
    }

    #[test]
    fn remove_unknown_id_is_ignored() {
        let info = MountPointInfo::filesystem("/templates");
        let mut store = store_with(vec![info.clone()]);
        let mut registry = MountPointRegistry::index(&store.mount_points.clone());

        registry.remove(&mut store, &[Uuid::new_v4()]);

        assert_eq!(registry.len(), 1);
        assert_eq!(store.mount_points.len(), 1);
    }

    #[test]
    fn lookup_by_place_is_case_insensitive() {
        let info = MountPointInfo::filesystem("/Templates/Web");
        let registry = MountPointRegistry::index(&[info.clone()]);

        let found = registry.lookup_by_place("/templates/web").unwrap();
        assert_eq!(found.id, info.id);
        assert!(registry.lookup_by_place("/other").is_none());
    }
}
