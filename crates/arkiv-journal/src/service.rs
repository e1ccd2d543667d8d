//! Journal service: durable write, then backup.

use std::sync::Arc;

use arkiv_core::{OperationId, TenantContext};
use arkiv_repository::Query;
use serde_json::Value;

use crate::backup::OperationBackup;
use crate::entry::{OperationEntry, OperationParameters};
use crate::error::{JournalError, JournalResult};
use crate::indexation::{IndexParameters, IndexationHelper, ReindexationResult};
use crate::journal::{OPERATION_COLLECTION, OperationJournal, external_field_names};
use crate::store::JournalStore;

/// The [`OperationJournal`] implementation.
///
/// Each write goes to the [`JournalStore`] first; the stored document is then
/// re-read and mirrored through [`OperationBackup`]. A backup failure is
/// reported as [`JournalError::Database`] even though the durable write
/// already happened.
pub struct JournalService {
    store: Arc<dyn JournalStore>,
    backup: OperationBackup,
    indexation: Option<Arc<dyn IndexationHelper>>,
}

impl std::fmt::Debug for JournalService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalService")
            .field("backup", &self.backup)
            .finish_non_exhaustive()
    }
}

impl JournalService {
    /// Create a journal over a store and a backup writer.
    #[must_use]
    pub fn new(store: Arc<dyn JournalStore>, backup: OperationBackup) -> Self {
        Self {
            store,
            backup,
            indexation: None,
        }
    }

    /// Attach the helper that serves `reindex` and `switch_index`.
    #[must_use]
    pub fn with_indexation(mut self, helper: Arc<dyn IndexationHelper>) -> Self {
        self.indexation = Some(helper);
        self
    }

    fn backup_operation(&self, ctx: &TenantContext, id: OperationId) -> JournalResult<()> {
        let document = self.store.get_raw(ctx, id)?.ok_or_else(|| {
            JournalError::Database(format!("operation {id} vanished before backup"))
        })?;
        self.backup.backup(ctx, id, &document)
    }

    fn apply_each(
        items: &[OperationParameters],
        mut apply: impl FnMut(&OperationParameters) -> JournalResult<()>,
    ) -> JournalResult<()> {
        for (applied, item) in items.iter().enumerate() {
            if let Err(source) = apply(item) {
                tracing::warn!(applied, operation_id = %item.operation_id, error = %source, "Bulk journal write stopped");
                return Err(JournalError::Bulk {
                    applied,
                    source: Box::new(source),
                });
            }
        }
        Ok(())
    }
}

impl OperationJournal for JournalService {
    fn create(&self, ctx: &TenantContext, params: &OperationParameters) -> JournalResult<()> {
        let entry = OperationEntry::create(ctx, params);
        self.store.insert(ctx, &entry)?;
        tracing::debug!(operation_id = %entry.id, ev_type = %entry.event_type, "Operation created");
        self.backup_operation(ctx, entry.id)
    }

    fn update(&self, ctx: &TenantContext, params: &OperationParameters) -> JournalResult<()> {
        let entry = self.store.append(ctx, params)?;
        tracing::debug!(
            operation_id = %entry.id,
            version = entry.version,
            outcome = %entry.outcome,
            "Operation updated"
        );
        self.backup_operation(ctx, entry.id)
    }

    fn create_bulk(
        &self,
        ctx: &TenantContext,
        items: &[OperationParameters],
    ) -> JournalResult<()> {
        Self::apply_each(items, |item| self.create(ctx, item))
    }

    fn update_bulk(
        &self,
        ctx: &TenantContext,
        items: &[OperationParameters],
    ) -> JournalResult<()> {
        Self::apply_each(items, |item| self.update(ctx, item))
    }

    fn select(&self, ctx: &TenantContext, query: &Value) -> JournalResult<Vec<Value>> {
        let query = Query::parse(query).map_err(|e| JournalError::InvalidQuery(e.to_string()))?;
        let docs = self.store.select_raw(ctx, &query)?;
        Ok(docs.into_iter().map(external_field_names).collect())
    }

    fn get_by_id(&self, ctx: &TenantContext, id: OperationId) -> JournalResult<OperationEntry> {
        let document = self
            .store
            .get_raw(ctx, id)?
            .ok_or_else(|| JournalError::NotFound(id.to_string()))?;
        serde_json::from_value(document).map_err(|e| JournalError::Serialization(e.to_string()))
    }

    fn reindex(&self, params: &IndexParameters) -> ReindexationResult {
        if !params.collection.eq_ignore_ascii_case(OPERATION_COLLECTION) {
            return ReindexationResult::ko(
                params,
                format!(
                    "Collection {} is not handled by the operation journal",
                    params.collection
                ),
            );
        }
        if params.tenants.is_empty() {
            return ReindexationResult::ko(params, "No tenant given for reindexation");
        }
        let Some(helper) = &self.indexation else {
            return ReindexationResult::ko(params, "No indexation helper configured");
        };
        match helper.reindex(params) {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(collection = %params.collection, error = %e, "Reindexation failed");
                ReindexationResult::ko(params, e.to_string())
            },
        }
    }

    fn switch_index(&self, alias: &str, new_index: &str) -> JournalResult<()> {
        let prefix = OPERATION_COLLECTION.to_lowercase();
        if !alias.to_lowercase().starts_with(&prefix) {
            return Err(JournalError::InvalidArgument(format!(
                "alias {alias} does not belong to collection {OPERATION_COLLECTION}"
            )));
        }
        let helper = self
            .indexation
            .as_ref()
            .ok_or_else(|| JournalError::InvalidArgument("no indexation helper configured".into()))?;
        helper.switch_index(alias, new_index)
    }
}
