//! Durable mount point records.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Factory id for filesystem-backed mount points. Only these participate in
/// timestamp-based staleness checks.
pub const FILESYSTEM_FACTORY_ID: Uuid = Uuid::from_u128(0x8C19221B_DEA3_4250_86FE_2D4E189A11D2);

/// Factory id for archive-backed mount points, which hold a live connection
/// that must be released before the registry entry is removed.
pub const ARCHIVE_FACTORY_ID: Uuid = Uuid::from_u128(0x94E92610_CF4C_4F6D_AEB6_9E42DDE1899D);

/// A registered location template sources are read from.
///
/// Identity is `id`; the `(place, parent_id)` pair is unique within a
/// registry, enforced by [`MountPointRegistry::add`].
///
/// [`MountPointRegistry::add`]: super::MountPointRegistry::add
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountPointInfo {
    /// Identity of this mount point.
    pub id: Uuid,

    /// Factory that created (and knows how to connect) this mount point.
    pub factory_id: Uuid,

    /// Mount point this one was discovered inside, if any.
    #[serde(default)]
    pub parent_id: Option<Uuid>,

    /// Path or URI of the mounted location.
    pub place: String,

    /// Change counter of the factory at registration time.
    #[serde(default)]
    pub last_change_count_for_factory: i64,
}

impl MountPointInfo {
    /// A new filesystem-backed mount point at `place`.
    pub fn filesystem(place: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            factory_id: FILESYSTEM_FACTORY_ID,
            parent_id: None,
            place: place.into(),
            last_change_count_for_factory: 0,
        }
    }

    /// A new archive-backed mount point at `place`, optionally nested under
    /// a parent mount point.
    pub fn archive(place: impl Into<String>, parent_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            factory_id: ARCHIVE_FACTORY_ID,
            parent_id,
            place: place.into(),
            last_change_count_for_factory: 0,
        }
    }

    /// Whether this mount point resolves against the physical filesystem.
    pub fn is_filesystem_backed(&self) -> bool {
        self.factory_id == FILESYSTEM_FACTORY_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filesystem_constructor_uses_filesystem_factory() {
        let info = MountPointInfo::filesystem("/templates");
        assert!(info.is_filesystem_backed());
        assert_eq!(info.place, "/templates");
        assert!(info.parent_id.is_none());
    }

    #[test]
    fn archive_constructor_is_not_filesystem_backed() {
        let parent = MountPointInfo::filesystem("/templates");
        let info = MountPointInfo::archive("/templates/pack.zip", Some(parent.id));
        assert!(!info.is_filesystem_backed());
        assert_eq!(info.parent_id, Some(parent.id));
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let info = MountPointInfo::filesystem("/templates");
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"factoryId\""));
        assert!(json.contains("\"lastChangeCountForFactory\""));
    }

    #[test]
    fn deserializes_without_optional_fields() {
        let json = format!(
            "{{\"id\":\"{}\",\"factoryId\":\"{}\",\"place\":\"/t\"}}",
            Uuid::new_v4(),
            FILESYSTEM_FACTORY_ID
        );
        let info: MountPointInfo = serde_json::from_str(&json).unwrap();
        assert!(info.parent_id.is_none());
        assert_eq!(info.last_change_count_for_factory, 0);
    }
}
