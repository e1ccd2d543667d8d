//! Offer-based object storage interface.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::str::FromStr;

use arkiv_core::TenantContext;
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};
use crate::workspace::Workspace;

/// Category (folder) an object is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataCategory {
    /// Backed-up archive unit snapshots.
    Unit,
    /// Backed-up object group snapshots.
    ObjectGroup,
    /// Sealed traceability archives and other logbook files.
    Logbook,
    /// Backed-up journal operation documents.
    BackupOperation,
}

impl DataCategory {
    /// Folder name used by storage backends.
    #[must_use]
    pub fn folder(self) -> &'static str {
        match self {
            Self::Unit => "units",
            Self::ObjectGroup => "objectgroups",
            Self::Logbook => "logbooks",
            Self::BackupOperation => "backup_operations",
        }
    }
}

impl fmt::Display for DataCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.folder())
    }
}

/// Kind of mutation recorded in the write log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WriteAction {
    /// An object was written (created or overwritten).
    Write,
    /// An object was deleted.
    Delete,
}

/// One entry of a storage write log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteLogEntry {
    /// Strictly increasing sequence number within the log.
    pub sequence: u64,
    /// Name of the object the mutation applied to.
    pub object_name: String,
    /// Kind of mutation.
    pub action: WriteAction,
}

impl WriteLogEntry {
    /// Build a `WRITE` entry.
    #[must_use]
    pub fn write(sequence: u64, object_name: impl Into<String>) -> Self {
        Self {
            sequence,
            object_name: object_name.into(),
            action: WriteAction::Write,
        }
    }

    /// Build a `DELETE` entry.
    #[must_use]
    pub fn delete(sequence: u64, object_name: impl Into<String>) -> Self {
        Self {
            sequence,
            object_name: object_name.into(),
            action: WriteAction::Delete,
        }
    }
}

/// Listing order for write-log reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Oldest first.
    #[default]
    Asc,
    /// Newest first.
    Desc,
}

impl FromStr for Order {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ASC" => Ok(Self::Asc),
            "DESC" => Ok(Self::Desc),
            _ => Err(StorageError::InvalidKey(format!("unknown order: {s}"))),
        }
    }
}

/// Location of a staged object in the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDescription {
    /// Workspace container name.
    pub container: String,
    /// Object path inside the container.
    pub path: String,
}

/// Digest reported by each requested offer, keyed by offer id.
///
/// `None` means the offer answered but does not hold the object.
pub type ReplicaDigests = BTreeMap<String, Option<String>>;

/// Offer-based, content-addressable object storage.
///
/// Implementations are synchronous; any retry and timeout policy belongs
/// to the implementation.
pub trait ObjectStorage: Send + Sync {
    /// List write-log entries for a strategy and category.
    ///
    /// With `from_offset` set, returns up to `limit` entries whose sequence is
    /// strictly greater than it, oldest first. Without it, returns the most
    /// recent `limit` entries in the requested order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached. An empty log is
    /// `Ok(vec![])`.
    fn list_writes(
        &self,
        ctx: &TenantContext,
        strategy: &str,
        category: DataCategory,
        from_offset: Option<u64>,
        limit: usize,
        order: Order,
    ) -> StorageResult<Vec<WriteLogEntry>>;

    /// Open an object for reading.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if no offer holds the object.
    fn get_object(
        &self,
        ctx: &TenantContext,
        strategy: &str,
        category: DataCategory,
        object_name: &str,
    ) -> StorageResult<Box<dyn Read + Send>>;

    /// Ask each offer for the digest of an object.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    fn get_replica_digests(
        &self,
        ctx: &TenantContext,
        strategy: &str,
        category: DataCategory,
        object_name: &str,
        offer_ids: &[String],
    ) -> StorageResult<ReplicaDigests>;

    /// Copy a staged workspace object into every offer of a strategy.
    ///
    /// Returns the write-log sequence of the stored object.
    ///
    /// # Errors
    ///
    /// Returns an error if the staged object is missing or the write fails.
    fn store_from_workspace(
        &self,
        ctx: &TenantContext,
        strategy: &str,
        category: DataCategory,
        object_name: &str,
        workspace: &dyn Workspace,
        source: &ObjectDescription,
    ) -> StorageResult<u64>;

    /// Offers that make up a strategy.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] for an unknown strategy.
    fn offer_ids(&self, strategy: &str) -> StorageResult<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_folders() {
        assert_eq!(DataCategory::Unit.folder(), "units");
        assert_eq!(DataCategory::BackupOperation.to_string(), "backup_operations");
    }

    #[test]
    fn test_write_log_entry_serde() {
        let entry = WriteLogEntry::delete(12, "aeaaaa.json");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["action"], "DELETE");
        assert_eq!(json["sequence"], 12);
    }

    #[test]
    fn test_order_parse() {
        assert_eq!("asc".parse::<Order>().unwrap(), Order::Asc);
        assert_eq!("DESC".parse::<Order>().unwrap(), Order::Desc);
        assert!("sideways".parse::<Order>().is_err());
    }
}
