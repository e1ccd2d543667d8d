//! Reading backups back out of object storage.

use std::sync::Arc;

use std::io::Read;

use arkiv_core::{EntityKind, TenantContext};
use arkiv_journal::OperationEntry;
use arkiv_storage::{DataCategory, ObjectStorage, Order, StorageError, WriteLogEntry};
use serde_json::Value;

use crate::error::{ReconstructionError, ReconstructionResult};
use crate::model::{BackupSnapshot, Collection, category_of};

/// Lists and loads the backups of units, object groups and operations.
pub struct RestoreBackupService {
    storage: Arc<dyn ObjectStorage>,
}

impl std::fmt::Debug for RestoreBackupService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestoreBackupService").finish_non_exhaustive()
    }
}

impl RestoreBackupService {
    /// Create a service over an object storage.
    #[must_use]
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    /// List write-log entries of a collection.
    ///
    /// # Errors
    ///
    /// Returns [`ReconstructionError::Runtime`] if the storage cannot be read.
    /// An empty log is `Ok(vec![])`.
    pub fn list_writes(
        &self,
        ctx: &TenantContext,
        strategy: &str,
        collection: Collection,
        from_offset: Option<u64>,
        limit: usize,
        order: Order,
    ) -> ReconstructionResult<Vec<WriteLogEntry>> {
        self.storage
            .list_writes(ctx, strategy, collection.category(), from_offset, limit, order)
            .map_err(|e| ReconstructionError::Runtime(e.to_string()))
    }

    /// Fetch and parse one backup object.
    ///
    /// Returns `Ok(None)` when the document lacks its metadata or lifecycle
    /// part.
    ///
    /// # Errors
    ///
    /// Returns [`ReconstructionError::Snapshot`] if the object is gone or is
    /// not a usable backup, and [`ReconstructionError::Runtime`] if the
    /// storage cannot be reached.
    pub fn load_snapshot(
        &self,
        ctx: &TenantContext,
        strategy: &str,
        kind: EntityKind,
        object_name: &str,
        offset: u64,
    ) -> ReconstructionResult<Option<BackupSnapshot>> {
        let snapshot_error = |reason: String| ReconstructionError::Snapshot {
            object: object_name.to_string(),
            reason,
        };

        let reader = self.fetch(ctx, strategy, category_of(kind), object_name)?;
        let document: Value =
            serde_json::from_reader(reader).map_err(|e| snapshot_error(e.to_string()))?;

        let (Some(metadata), Some(lifecycle)) = (part(&document, "metadata"), part(&document, "lifecycle"))
        else {
            return Ok(None);
        };
        for (name, doc) in [("metadata", &metadata), ("lifecycle", &lifecycle)] {
            if doc.get("_id").and_then(Value::as_str).is_none() {
                return Err(snapshot_error(format!("{name} has no _id")));
            }
        }

        Ok(Some(BackupSnapshot {
            metadata,
            lifecycle,
            offset,
        }))
    }

    /// Fetch and parse the backup of one journal entry.
    ///
    /// # Errors
    ///
    /// Returns [`ReconstructionError::Snapshot`] if the object is gone or is
    /// not a journal entry, and [`ReconstructionError::Runtime`] if the
    /// storage cannot be reached.
    pub fn load_operation(
        &self,
        ctx: &TenantContext,
        strategy: &str,
        object_name: &str,
    ) -> ReconstructionResult<OperationEntry> {
        let reader = self.fetch(ctx, strategy, DataCategory::BackupOperation, object_name)?;
        serde_json::from_reader(reader).map_err(|e| ReconstructionError::Snapshot {
            object: object_name.to_string(),
            reason: e.to_string(),
        })
    }

    fn fetch(
        &self,
        ctx: &TenantContext,
        strategy: &str,
        category: DataCategory,
        object_name: &str,
    ) -> ReconstructionResult<Box<dyn Read + Send>> {
        match self.storage.get_object(ctx, strategy, category, object_name) {
            Ok(reader) => Ok(reader),
            Err(StorageError::NotFound(_)) => Err(ReconstructionError::Snapshot {
                object: object_name.to_string(),
                reason: "not found in storage".into(),
            }),
            Err(e) => Err(ReconstructionError::Runtime(e.to_string())),
        }
    }
}

fn part(document: &Value, name: &str) -> Option<Value> {
    document.get(name).filter(|v| !v.is_null()).cloned()
}
