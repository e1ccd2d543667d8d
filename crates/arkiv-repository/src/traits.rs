//! Collaborator interfaces.

use arkiv_core::{EntityKind, TenantContext};
use serde_json::Value;

use crate::error::{RepositoryError, RepositoryResult};
use crate::query::Query;

/// Extract the `_id` of a document.
///
/// # Errors
///
/// Returns [`RepositoryError::InvalidDocument`] if the field is missing or
/// not a string.
pub fn document_id(doc: &Value) -> RepositoryResult<&str> {
    doc.get("_id")
        .and_then(Value::as_str)
        .ok_or_else(|| RepositoryError::InvalidDocument("missing string field _id".into()))
}

/// Primary document store for units and object groups.
pub trait MetadataRepository: Send + Sync {
    /// Read the current document by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails. A missing document is `Ok(None)`.
    fn get_by_id(
        &self,
        ctx: &TenantContext,
        kind: EntityKind,
        id: &str,
    ) -> RepositoryResult<Option<Value>>;

    /// Read documents matching a query.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn select(
        &self,
        ctx: &TenantContext,
        kind: EntityKind,
        query: &Query,
    ) -> RepositoryResult<Vec<Value>>;

    /// Read many documents by id, skipping unknown ids.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn get_raw_bulk(
        &self,
        ctx: &TenantContext,
        kind: EntityKind,
        ids: &[String],
    ) -> RepositoryResult<Vec<Value>>;

    /// Insert or replace documents by `_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if a document is invalid or the backend fails.
    fn save_bulk(
        &self,
        ctx: &TenantContext,
        kind: EntityKind,
        docs: &[Value],
    ) -> RepositoryResult<()>;

    /// Delete documents by id. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn delete_bulk(
        &self,
        ctx: &TenantContext,
        kind: EntityKind,
        ids: &[String],
    ) -> RepositoryResult<()>;
}

/// Per-entity lifecycle log.
pub trait LifecycleRepository: Send + Sync {
    /// Read the current lifecycle of an entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails. A missing lifecycle is `Ok(None)`.
    fn get_by_id(
        &self,
        ctx: &TenantContext,
        kind: EntityKind,
        id: &str,
    ) -> RepositoryResult<Option<Value>>;

    /// Insert raw lifecycle documents, replacing existing ones with the same id.
    ///
    /// # Errors
    ///
    /// Returns an error if a document is invalid or the backend fails.
    fn create_raw_bulk(
        &self,
        ctx: &TenantContext,
        kind: EntityKind,
        docs: &[Value],
    ) -> RepositoryResult<()>;

    /// Delete lifecycles by id. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn delete_bulk(
        &self,
        ctx: &TenantContext,
        kind: EntityKind,
        ids: &[String],
    ) -> RepositoryResult<()>;
}

/// Search index mirroring the primary document store.
pub trait SearchIndex: Send + Sync {
    /// Index documents, replacing existing entries with the same id.
    ///
    /// # Errors
    ///
    /// Returns an error if the index rejects the batch.
    fn index_bulk(
        &self,
        ctx: &TenantContext,
        kind: EntityKind,
        docs: &[Value],
    ) -> RepositoryResult<()>;

    /// Remove documents from the index. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the index rejects the batch.
    fn delete_bulk(
        &self,
        ctx: &TenantContext,
        kind: EntityKind,
        ids: &[String],
    ) -> RepositoryResult<()>;
}
