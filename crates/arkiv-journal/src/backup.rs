//! Mirroring of journal entries to object storage.

use std::sync::Arc;

use arkiv_core::{OperationId, TenantContext};
use arkiv_storage::{DataCategory, ObjectDescription, ObjectStorage, Workspace};
use serde_json::Value;

use crate::error::{JournalError, JournalResult};

/// Pushes the full document of a journal entry to object storage.
///
/// A backup is staged in the tenant's `{tenant}_backup_operation` workspace
/// container, stored into the [`DataCategory::BackupOperation`] category as
/// `{id}.json`, then removed from the workspace.
#[derive(Clone)]
pub struct OperationBackup {
    storage: Arc<dyn ObjectStorage>,
    workspace: Arc<dyn Workspace>,
    strategy: String,
}

impl std::fmt::Debug for OperationBackup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationBackup")
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

impl OperationBackup {
    /// Create a backup writer for a storage strategy.
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        workspace: Arc<dyn Workspace>,
        strategy: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            workspace,
            strategy: strategy.into(),
        }
    }

    /// Workspace container used for a tenant's staged backups.
    #[must_use]
    pub fn container_name(ctx: &TenantContext) -> String {
        format!("{}_backup_operation", ctx.tenant_id())
    }

    /// Object name of an operation's backup.
    #[must_use]
    pub fn object_name(id: OperationId) -> String {
        format!("{id}.json")
    }

    /// Stage, store and unstage one document.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Database`] if staging or storing fails. A
    /// failure to remove the staged copy afterwards is only logged.
    pub fn backup(&self, ctx: &TenantContext, id: OperationId, document: &Value) -> JournalResult<()> {
        let container = Self::container_name(ctx);
        let name = Self::object_name(id);
        let bytes = serde_json::to_vec(document)
            .map_err(|e| JournalError::Serialization(e.to_string()))?;

        self.workspace
            .create_container(&container)
            .and_then(|()| self.workspace.put_object(&container, &name, bytes))
            .map_err(|e| JournalError::Database(format!("cannot stage backup of {id}: {e}")))?;

        let source = ObjectDescription {
            container: container.clone(),
            path: name.clone(),
        };
        let stored = self.storage.store_from_workspace(
            ctx,
            &self.strategy,
            DataCategory::BackupOperation,
            &name,
            self.workspace.as_ref(),
            &source,
        );

        if let Err(e) = self.workspace.delete_object(&container, &name) {
            tracing::warn!(operation_id = %id, error = %e, "Failed to remove staged backup");
        }

        let sequence = stored
            .map_err(|e| JournalError::Database(format!("cannot store backup of {id}: {e}")))?;
        tracing::debug!(operation_id = %id, sequence, "Operation backed up");
        Ok(())
    }
}
