//! In-memory collaborators.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use arkiv_core::{EntityKind, TenantContext};
use serde_json::Value;

use crate::error::{RepositoryError, RepositoryResult};
use crate::query::Query;
use crate::traits::{LifecycleRepository, MetadataRepository, SearchIndex, document_id};

type TableKey = (u32, EntityKind);

/// Documents per (tenant, kind), keyed by `_id`, with failure injection.
#[derive(Debug, Default)]
struct DocumentTable {
    docs: RwLock<HashMap<TableKey, BTreeMap<String, Value>>>,
    failure: RwLock<Option<String>>,
}

impl DocumentTable {
    fn check(&self) -> RepositoryResult<()> {
        let failure = self
            .failure
            .read()
            .map_err(|e| RepositoryError::Unavailable(e.to_string()))?;
        match failure.as_ref() {
            Some(message) => Err(RepositoryError::Unavailable(message.clone())),
            None => Ok(()),
        }
    }

    fn set_failure(&self, failure: Option<String>) {
        if let Ok(mut slot) = self.failure.write() {
            *slot = failure;
        }
    }

    fn get(&self, ctx: &TenantContext, kind: EntityKind, id: &str) -> RepositoryResult<Option<Value>> {
        self.check()?;
        let docs = self
            .docs
            .read()
            .map_err(|e| RepositoryError::Unavailable(e.to_string()))?;
        Ok(docs
            .get(&(ctx.tenant_id(), kind))
            .and_then(|table| table.get(id))
            .cloned())
    }

    fn all(&self, ctx: &TenantContext, kind: EntityKind) -> RepositoryResult<Vec<Value>> {
        self.check()?;
        let docs = self
            .docs
            .read()
            .map_err(|e| RepositoryError::Unavailable(e.to_string()))?;
        Ok(docs
            .get(&(ctx.tenant_id(), kind))
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default())
    }

    fn upsert(&self, ctx: &TenantContext, kind: EntityKind, batch: &[Value]) -> RepositoryResult<()> {
        self.check()?;
        let ids = batch
            .iter()
            .map(|doc| document_id(doc).map(String::from))
            .collect::<RepositoryResult<Vec<_>>>()?;
        let mut docs = self
            .docs
            .write()
            .map_err(|e| RepositoryError::Unavailable(e.to_string()))?;
        let table = docs.entry((ctx.tenant_id(), kind)).or_default();
        for (id, doc) in ids.into_iter().zip(batch) {
            table.insert(id, doc.clone());
        }
        Ok(())
    }

    fn remove(&self, ctx: &TenantContext, kind: EntityKind, ids: &[String]) -> RepositoryResult<()> {
        self.check()?;
        let mut docs = self
            .docs
            .write()
            .map_err(|e| RepositoryError::Unavailable(e.to_string()))?;
        if let Some(table) = docs.get_mut(&(ctx.tenant_id(), kind)) {
            for id in ids {
                table.remove(id);
            }
        }
        Ok(())
    }

    fn len(&self, ctx: &TenantContext, kind: EntityKind) -> usize {
        self.docs
            .read()
            .ok()
            .and_then(|docs| docs.get(&(ctx.tenant_id(), kind)).map(BTreeMap::len))
            .unwrap_or(0)
    }
}

macro_rules! failure_controls {
    ($ty:ty) => {
        impl $ty {
            /// Create an empty collaborator.
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }

            /// Make every subsequent call fail with the given message.
            pub fn fail_with(&self, message: impl Into<String>) {
                self.table.set_failure(Some(message.into()));
            }

            /// Clear an injected failure.
            pub fn recover(&self) {
                self.table.set_failure(None);
            }

            /// Number of documents held for a tenant and kind.
            #[must_use]
            pub fn count(&self, ctx: &TenantContext, kind: EntityKind) -> usize {
                self.table.len(ctx, kind)
            }
        }
    };
}

/// In-memory [`MetadataRepository`].
#[derive(Debug, Default)]
pub struct MemoryMetadataRepository {
    table: DocumentTable,
}

failure_controls!(MemoryMetadataRepository);

impl MetadataRepository for MemoryMetadataRepository {
    fn get_by_id(
        &self,
        ctx: &TenantContext,
        kind: EntityKind,
        id: &str,
    ) -> RepositoryResult<Option<Value>> {
        self.table.get(ctx, kind, id)
    }

    fn select(
        &self,
        ctx: &TenantContext,
        kind: EntityKind,
        query: &Query,
    ) -> RepositoryResult<Vec<Value>> {
        Ok(query.apply(self.table.all(ctx, kind)?))
    }

    fn get_raw_bulk(
        &self,
        ctx: &TenantContext,
        kind: EntityKind,
        ids: &[String],
    ) -> RepositoryResult<Vec<Value>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            out.extend(self.table.get(ctx, kind, id)?);
        }
        Ok(out)
    }

    fn save_bulk(
        &self,
        ctx: &TenantContext,
        kind: EntityKind,
        docs: &[Value],
    ) -> RepositoryResult<()> {
        self.table.upsert(ctx, kind, docs)
    }

    fn delete_bulk(
        &self,
        ctx: &TenantContext,
        kind: EntityKind,
        ids: &[String],
    ) -> RepositoryResult<()> {
        self.table.remove(ctx, kind, ids)
    }
}

/// In-memory [`LifecycleRepository`].
#[derive(Debug, Default)]
pub struct MemoryLifecycleRepository {
    table: DocumentTable,
}

failure_controls!(MemoryLifecycleRepository);

impl LifecycleRepository for MemoryLifecycleRepository {
    fn get_by_id(
        &self,
        ctx: &TenantContext,
        kind: EntityKind,
        id: &str,
    ) -> RepositoryResult<Option<Value>> {
        self.table.get(ctx, kind, id)
    }

    fn create_raw_bulk(
        &self,
        ctx: &TenantContext,
        kind: EntityKind,
        docs: &[Value],
    ) -> RepositoryResult<()> {
        self.table.upsert(ctx, kind, docs)
    }

    fn delete_bulk(
        &self,
        ctx: &TenantContext,
        kind: EntityKind,
        ids: &[String],
    ) -> RepositoryResult<()> {
        self.table.remove(ctx, kind, ids)
    }
}

/// In-memory [`SearchIndex`].
#[derive(Debug, Default)]
pub struct MemorySearchIndex {
    table: DocumentTable,
}

failure_controls!(MemorySearchIndex);

impl MemorySearchIndex {
    /// Read an indexed document.
    ///
    /// # Errors
    ///
    /// Returns an error if a failure has been injected.
    pub fn get(
        &self,
        ctx: &TenantContext,
        kind: EntityKind,
        id: &str,
    ) -> RepositoryResult<Option<Value>> {
        self.table.get(ctx, kind, id)
    }
}

impl SearchIndex for MemorySearchIndex {
    fn index_bulk(
        &self,
        ctx: &TenantContext,
        kind: EntityKind,
        docs: &[Value],
    ) -> RepositoryResult<()> {
        self.table.upsert(ctx, kind, docs)
    }

    fn delete_bulk(
        &self,
        ctx: &TenantContext,
        kind: EntityKind,
        ids: &[String],
    ) -> RepositoryResult<()> {
        self.table.remove(ctx, kind, ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metadata_save_and_read() {
        let ctx = TenantContext::new(1);
        let repo = MemoryMetadataRepository::new();
        repo.save_bulk(
            &ctx,
            EntityKind::Unit,
            &[json!({"_id": "u1", "Title": "a"}), json!({"_id": "u2", "Title": "b"})],
        )
        .unwrap();

        assert_eq!(
            repo.get_by_id(&ctx, EntityKind::Unit, "u1").unwrap().unwrap()["Title"],
            "a"
        );
        assert!(repo.get_by_id(&ctx, EntityKind::ObjectGroup, "u1").unwrap().is_none());

        let bulk = repo
            .get_raw_bulk(&ctx, EntityKind::Unit, &["u2".into(), "zz".into()])
            .unwrap();
        assert_eq!(bulk.len(), 1);

        let query = Query::parse(&json!({"$query": {"$eq": {"Title": "b"}}})).unwrap();
        assert_eq!(repo.select(&ctx, EntityKind::Unit, &query).unwrap().len(), 1);
    }

    #[test]
    fn test_save_rejects_document_without_id() {
        let repo = MemoryMetadataRepository::new();
        let err = repo
            .save_bulk(&TenantContext::new(0), EntityKind::Unit, &[json!({"x": 1})])
            .unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidDocument(_)));
    }

    #[test]
    fn test_injected_failure() {
        let ctx = TenantContext::new(0);
        let index = MemorySearchIndex::new();
        index.fail_with("index is read-only");
        assert!(matches!(
            index.index_bulk(&ctx, EntityKind::Unit, &[json!({"_id": "a"})]),
            Err(RepositoryError::Unavailable(_))
        ));
        index.recover();
        index
            .index_bulk(&ctx, EntityKind::Unit, &[json!({"_id": "a"})])
            .unwrap();
        assert_eq!(index.count(&ctx, EntityKind::Unit), 1);
    }

    #[test]
    fn test_lifecycle_upsert_and_delete() {
        let ctx = TenantContext::new(0);
        let repo = MemoryLifecycleRepository::new();
        repo.create_raw_bulk(&ctx, EntityKind::ObjectGroup, &[json!({"_id": "g", "_v": 1})])
            .unwrap();
        repo.create_raw_bulk(&ctx, EntityKind::ObjectGroup, &[json!({"_id": "g", "_v": 2})])
            .unwrap();
        assert_eq!(
            repo.get_by_id(&ctx, EntityKind::ObjectGroup, "g").unwrap().unwrap()["_v"],
            2
        );
        repo.delete_bulk(&ctx, EntityKind::ObjectGroup, &["g".into()])
            .unwrap();
        assert_eq!(repo.count(&ctx, EntityKind::ObjectGroup), 0);
    }
}
