//! Persisted reconstruction cursors.

use std::sync::{Arc, Mutex};

use arkiv_core::{TenantContext, format_timestamp, now};
use arkiv_storage::{KvStore, MemoryKvStore, StorageError, block_on};
use serde::{Deserialize, Serialize};

use crate::error::{ReconstructionError, ReconstructionResult};
use crate::model::Collection;

/// Stores, per (tenant, strategy, collection), the last replayed sequence.
pub trait OffsetRepository: Send + Sync {
    /// Read the cursor. A cursor never written is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn get(
        &self,
        ctx: &TenantContext,
        strategy: &str,
        collection: Collection,
    ) -> ReconstructionResult<Option<u64>>;

    /// Move the cursor forward to `offset` and return the stored value.
    ///
    /// A cursor never moves backwards; an older offset leaves it unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn advance(
        &self,
        ctx: &TenantContext,
        strategy: &str,
        collection: Collection,
        offset: u64,
    ) -> ReconstructionResult<u64>;
}

const NS_OFFSETS: &str = "reconstruction:offsets";

fn cursor_key(tenant: u32, strategy: &str, collection: Collection) -> String {
    format!("{tenant}/{strategy}/{collection}")
}

fn map_storage(e: StorageError) -> ReconstructionError {
    ReconstructionError::Runtime(e.to_string())
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CursorRecord {
    offset: u64,
    last_update: String,
}

/// [`OffsetRepository`] over a raw [`KvStore`].
pub struct KvOffsetRepository {
    store: Arc<dyn KvStore>,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for KvOffsetRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvOffsetRepository").finish_non_exhaustive()
    }
}

impl KvOffsetRepository {
    /// Create a repository over a KV store.
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Create an in-memory repository (for testing).
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKvStore::new()))
    }

    fn read(&self, key: &str) -> ReconstructionResult<Option<CursorRecord>> {
        let bytes = block_on(self.store.get(NS_OFFSETS, key))
            .map_err(map_storage)?
            .map_err(map_storage)?;
        bytes
            .map(|b| {
                serde_json::from_slice(&b).map_err(|e| ReconstructionError::Runtime(e.to_string()))
            })
            .transpose()
    }
}

impl OffsetRepository for KvOffsetRepository {
    fn get(
        &self,
        ctx: &TenantContext,
        strategy: &str,
        collection: Collection,
    ) -> ReconstructionResult<Option<u64>> {
        Ok(self
            .read(&cursor_key(ctx.tenant_id(), strategy, collection))?
            .map(|record| record.offset))
    }

    fn advance(
        &self,
        ctx: &TenantContext,
        strategy: &str,
        collection: Collection,
        offset: u64,
    ) -> ReconstructionResult<u64> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| ReconstructionError::Runtime(e.to_string()))?;
        let key = cursor_key(ctx.tenant_id(), strategy, collection);
        if let Some(current) = self.read(&key)?
            && current.offset >= offset
        {
            return Ok(current.offset);
        }

        let record = CursorRecord {
            offset,
            last_update: format_timestamp(&now()),
        };
        let bytes = serde_json::to_vec(&record)
            .map_err(|e| ReconstructionError::Runtime(e.to_string()))?;
        block_on(self.store.set(NS_OFFSETS, &key, bytes))
            .map_err(map_storage)?
            .map_err(map_storage)?;
        tracing::debug!(tenant = ctx.tenant_id(), strategy, %collection, offset, "cursor advanced");
        Ok(offset)
    }
}
