//! Durable storage of journal entries.

use std::sync::{Arc, Mutex};

use arkiv_core::{OperationId, TenantContext, format_timestamp, now};
use arkiv_repository::Query;
use arkiv_storage::{KvStore, MemoryKvStore, StorageError, block_on};
use serde_json::Value;

use crate::entry::{OperationEntry, OperationParameters};
use crate::error::{JournalError, JournalResult};

/// Durable storage backend for journal entries.
///
/// Implementations must be thread-safe; `insert` must never overwrite.
pub trait JournalStore: Send + Sync {
    /// Insert a new entry.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::AlreadyExists`] if the id is taken, even when
    /// two inserts race.
    fn insert(&self, ctx: &TenantContext, entry: &OperationEntry) -> JournalResult<()>;

    /// Append an event to an existing entry and return the updated entry.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::NotFound`] if the entry does not exist.
    fn append(
        &self,
        ctx: &TenantContext,
        params: &OperationParameters,
    ) -> JournalResult<OperationEntry>;

    /// Read an entry as its persisted document.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails. A missing entry is `Ok(None)`.
    fn get_raw(&self, ctx: &TenantContext, id: OperationId) -> JournalResult<Option<Value>>;

    /// Read the persisted documents matching a query.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::CollectionUnavailable`] if the collection is
    /// not live.
    fn select_raw(&self, ctx: &TenantContext, query: &Query) -> JournalResult<Vec<Value>>;

    /// Put back entries recovered from their backups.
    ///
    /// An entry replaces the stored copy unless that copy is at a higher
    /// version, so replaying the same backups twice changes nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn restore(&self, ctx: &TenantContext, entries: &[OperationEntry]) -> JournalResult<()>;
}

// -- Namespace constants --

const NS_OPERATIONS: &str = "journal:operations";
const NS_META: &str = "journal:meta";
const KEY_COLLECTION: &str = "collection";

fn entry_key(tenant: u32, id: OperationId) -> String {
    format!("{tenant}/{id}")
}

fn map_storage(e: StorageError) -> JournalError {
    JournalError::Database(e.to_string())
}

/// [`JournalStore`] over a raw [`KvStore`].
///
/// Inserts rely on the store's atomic `insert`; appends are serialized by an
/// internal lock so concurrent updates of one entry never lose an event.
pub struct KvJournalStore {
    store: Arc<dyn KvStore>,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for KvJournalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvJournalStore").finish_non_exhaustive()
    }
}

impl KvJournalStore {
    /// Open the journal collection on a KV store, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection marker cannot be written.
    pub fn open(store: Arc<dyn KvStore>) -> JournalResult<Self> {
        let journal = Self {
            store,
            write_lock: Mutex::new(()),
        };
        journal.create_collection()?;
        Ok(journal)
    }

    /// Create an in-memory journal store (for testing).
    #[must_use]
    pub fn in_memory() -> Self {
        let journal = Self {
            store: Arc::new(MemoryKvStore::new()),
            write_lock: Mutex::new(()),
        };
        if let Err(e) = journal.create_collection() {
            tracing::error!(error = %e, "Failed to open in-memory journal collection");
        }
        journal
    }

    /// Mark the collection live.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker cannot be written.
    pub fn create_collection(&self) -> JournalResult<()> {
        let marker = format_timestamp(&now()).into_bytes();
        block_on(self.store.set(NS_META, KEY_COLLECTION, marker))
            .map_err(map_storage)?
            .map_err(map_storage)
    }

    /// Take the collection offline; selects fail until it is recreated.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker cannot be removed.
    pub fn drop_collection(&self) -> JournalResult<()> {
        block_on(self.store.delete(NS_META, KEY_COLLECTION))
            .map_err(map_storage)?
            .map_err(map_storage)?;
        Ok(())
    }

    fn read_entry(&self, tenant: u32, id: OperationId) -> JournalResult<Option<OperationEntry>> {
        let bytes = block_on(self.store.get(NS_OPERATIONS, &entry_key(tenant, id)))
            .map_err(map_storage)?
            .map_err(map_storage)?;
        bytes
            .map(|b| {
                serde_json::from_slice(&b).map_err(|e| JournalError::Serialization(e.to_string()))
            })
            .transpose()
    }
}

impl JournalStore for KvJournalStore {
    fn insert(&self, ctx: &TenantContext, entry: &OperationEntry) -> JournalResult<()> {
        let bytes =
            serde_json::to_vec(entry).map_err(|e| JournalError::Serialization(e.to_string()))?;
        let key = entry_key(ctx.tenant_id(), entry.id);
        match block_on(self.store.insert(NS_OPERATIONS, &key, bytes)).map_err(map_storage)? {
            Ok(()) => Ok(()),
            Err(StorageError::AlreadyExists(_)) => Err(JournalError::AlreadyExists(entry.id)),
            Err(e) => Err(map_storage(e)),
        }
    }

    fn append(
        &self,
        ctx: &TenantContext,
        params: &OperationParameters,
    ) -> JournalResult<OperationEntry> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| JournalError::Database(e.to_string()))?;
        let mut entry = self
            .read_entry(ctx.tenant_id(), params.operation_id)?
            .ok_or_else(|| JournalError::NotFound(params.operation_id.to_string()))?;
        entry.append(params);
        let bytes =
            serde_json::to_vec(&entry).map_err(|e| JournalError::Serialization(e.to_string()))?;
        block_on(self.store.set(
            NS_OPERATIONS,
            &entry_key(ctx.tenant_id(), entry.id),
            bytes,
        ))
        .map_err(map_storage)?
        .map_err(map_storage)?;
        Ok(entry)
    }

    fn get_raw(&self, ctx: &TenantContext, id: OperationId) -> JournalResult<Option<Value>> {
        let bytes = block_on(self.store.get(NS_OPERATIONS, &entry_key(ctx.tenant_id(), id)))
            .map_err(map_storage)?
            .map_err(map_storage)?;
        bytes
            .map(|b| {
                serde_json::from_slice(&b).map_err(|e| JournalError::Serialization(e.to_string()))
            })
            .transpose()
    }

    fn select_raw(&self, ctx: &TenantContext, query: &Query) -> JournalResult<Vec<Value>> {
        let live = block_on(self.store.exists(NS_META, KEY_COLLECTION))
            .map_err(map_storage)?
            .map_err(map_storage)?;
        if !live {
            return Err(JournalError::CollectionUnavailable(NS_OPERATIONS.into()));
        }

        let prefix = format!("{}/", ctx.tenant_id());
        let keys = block_on(self.store.list_keys(NS_OPERATIONS))
            .map_err(map_storage)?
            .map_err(map_storage)?;
        let mut docs = Vec::new();
        for key in keys.iter().filter(|k| k.starts_with(&prefix)) {
            let bytes = block_on(self.store.get(NS_OPERATIONS, key))
                .map_err(map_storage)?
                .map_err(map_storage)?;
            if let Some(bytes) = bytes {
                docs.push(
                    serde_json::from_slice(&bytes)
                        .map_err(|e| JournalError::Serialization(e.to_string()))?,
                );
            }
        }
        Ok(query.apply(docs))
    }

    fn restore(&self, ctx: &TenantContext, entries: &[OperationEntry]) -> JournalResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| JournalError::Database(e.to_string()))?;
        for entry in entries {
            if let Some(current) = self.read_entry(ctx.tenant_id(), entry.id)?
                && current.version > entry.version
            {
                tracing::debug!(
                    operation_id = %entry.id,
                    stored = current.version,
                    restored = entry.version,
                    "Newer entry kept"
                );
                continue;
            }
            let bytes = serde_json::to_vec(entry)
                .map_err(|e| JournalError::Serialization(e.to_string()))?;
            block_on(self.store.set(
                NS_OPERATIONS,
                &entry_key(ctx.tenant_id(), entry.id),
                bytes,
            ))
            .map_err(map_storage)?
            .map_err(map_storage)?;
        }
        Ok(())
    }
}
