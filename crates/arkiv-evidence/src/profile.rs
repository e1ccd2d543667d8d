//! Per-kind behavior of the audit.

use arkiv_core::EntityKind;
use arkiv_storage::DataCategory;

/// What differs between auditing a unit and auditing an object group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityProfile {
    /// The kind this profile describes.
    pub kind: EntityKind,
    /// Storage category holding the entity's backups.
    pub category: DataCategory,
    /// Name used in messages.
    pub label: &'static str,
}

const PROFILES: [EntityProfile; 2] = [
    EntityProfile {
        kind: EntityKind::Unit,
        category: DataCategory::Unit,
        label: "unit",
    },
    EntityProfile {
        kind: EntityKind::ObjectGroup,
        category: DataCategory::ObjectGroup,
        label: "object group",
    },
];

impl EntityProfile {
    /// Resolve the profile of a kind.
    #[must_use]
    pub fn of(kind: EntityKind) -> &'static Self {
        match kind {
            EntityKind::Unit => &PROFILES[0],
            EntityKind::ObjectGroup => &PROFILES[1],
        }
    }

    /// Name of the entity's backup object.
    #[must_use]
    pub fn backup_object_name(&self, id: &str) -> String {
        format!("{id}.json")
    }

    pub(crate) fn missing_metadata(&self, id: &str) -> String {
        format!("No such {} metadata '{id}'", self.label)
    }

    pub(crate) fn missing_lifecycle(&self, id: &str) -> String {
        format!("No such lifecycle {} found '{id}'", self.label)
    }

    pub(crate) fn metadata_failure(&self) -> String {
        format!("An error occurred during {} metadata retrieval", self.label)
    }

    pub(crate) fn lifecycle_failure(&self) -> String {
        format!("An error occurred during {} lifecycle retrieval", self.label)
    }
}
