//! The operation journal interface.

use arkiv_core::{OperationId, TenantContext};
use serde_json::{Map, Value, json};

use crate::entry::{OperationEntry, OperationParameters};
use crate::error::JournalResult;
use crate::indexation::{IndexParameters, ReindexationResult};

/// Name of the journal's own collection, the only one it administers.
pub const OPERATION_COLLECTION: &str = "Operation";

const FIELD_RENAMES: [(&str, &str); 4] = [
    ("_id", "#id"),
    ("_tenant", "#tenant"),
    ("_v", "#version"),
    ("_lastPersistedDate", "#lastPersistedDate"),
];

/// Rewrite internal field names of a persisted document to their stable
/// external form (`_id` becomes `#id`, `_v` becomes `#version`, ...).
#[must_use]
pub fn external_field_names(doc: Value) -> Value {
    match doc {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                let key = FIELD_RENAMES
                    .iter()
                    .find(|(internal, _)| *internal == key)
                    .map_or(key, |(_, external)| (*external).to_string());
                out.insert(key, value);
            }
            Value::Object(out)
        },
        other => other,
    }
}

/// Append-only journal of system operations.
///
/// Every write is durable and mirrored to object storage before it returns.
pub trait OperationJournal: Send + Sync {
    /// Create an operation from its first event.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::AlreadyExists`](crate::JournalError::AlreadyExists)
    /// if the id is taken and
    /// [`JournalError::Database`](crate::JournalError::Database) if the
    /// write or its backup fails.
    fn create(&self, ctx: &TenantContext, params: &OperationParameters) -> JournalResult<()>;

    /// Append an event to an existing operation.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::NotFound`](crate::JournalError::NotFound) for an
    /// unknown id and
    /// [`JournalError::Database`](crate::JournalError::Database) if the
    /// write or its backup fails.
    fn update(&self, ctx: &TenantContext, params: &OperationParameters) -> JournalResult<()>;

    /// Create operations one after the other.
    ///
    /// Not atomic: items before the first failure stay written.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Bulk`](crate::JournalError::Bulk) with the
    /// number of applied items.
    fn create_bulk(&self, ctx: &TenantContext, items: &[OperationParameters])
    -> JournalResult<()>;

    /// Append events one after the other.
    ///
    /// Not atomic: items before the first failure stay written.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Bulk`](crate::JournalError::Bulk) with the
    /// number of applied items.
    fn update_bulk(&self, ctx: &TenantContext, items: &[OperationParameters])
    -> JournalResult<()>;

    /// Select operations with a JSON query, in external field names.
    ///
    /// Zero matches is `Ok(vec![])`.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::InvalidQuery`](crate::JournalError::InvalidQuery)
    /// for a malformed query and
    /// [`JournalError::CollectionUnavailable`](crate::JournalError::CollectionUnavailable)
    /// when the collection is not live.
    fn select(&self, ctx: &TenantContext, query: &Value) -> JournalResult<Vec<Value>>;

    /// Read one operation.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::NotFound`](crate::JournalError::NotFound) for an
    /// unknown id.
    fn get_by_id(&self, ctx: &TenantContext, id: OperationId) -> JournalResult<OperationEntry>;

    /// Rebuild the journal's search index for some tenants.
    ///
    /// Never fails: rejected requests and helper failures come back as a
    /// `KO` result.
    fn reindex(&self, params: &IndexParameters) -> ReindexationResult;

    /// Point a journal alias at a new index.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::InvalidArgument`](crate::JournalError::InvalidArgument)
    /// if the alias does not belong to the journal's collection.
    fn switch_index(&self, alias: &str, new_index: &str) -> JournalResult<()>;

    /// Most recent operation of a type whose events include `{event_type}.OK`.
    ///
    /// # Errors
    ///
    /// Propagates [`select`](Self::select) errors.
    fn find_last_successful(
        &self,
        ctx: &TenantContext,
        event_type: &str,
    ) -> JournalResult<Option<Value>> {
        let query = json!({
            "$query": {"$and": [
                {"$eq": {"evType": event_type}},
                {"$eq": {"events.outDetail": format!("{event_type}.OK")}}
            ]},
            "$filter": {"$limit": 1, "$orderby": {"events.evDateTime": -1}}
        });
        Ok(self.select(ctx, &query)?.into_iter().next())
    }

    /// Most recent successful operation of a type whose covered window
    /// `[StartDate, EndDate]` contains `date`.
    ///
    /// # Errors
    ///
    /// Propagates [`select`](Self::select) errors.
    fn find_covering_successful(
        &self,
        ctx: &TenantContext,
        event_type: &str,
        date: &str,
    ) -> JournalResult<Option<Value>> {
        let query = json!({
            "$query": {"$and": [
                {"$eq": {"evType": event_type}},
                {"$eq": {"events.outDetail": format!("{event_type}.OK")}},
                {"$lte": {"events.evDetData.StartDate": date}},
                {"$gte": {"events.evDetData.EndDate": date}}
            ]},
            "$filter": {"$limit": 1, "$orderby": {"events.evDateTime": -1}}
        });
        Ok(self.select(ctx, &query)?.into_iter().next())
    }
}
