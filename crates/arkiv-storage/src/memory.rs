//! In-memory object storage with replicated offers and a write log.

use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read};
use std::sync::RwLock;

use arkiv_core::TenantContext;
use arkiv_crypto::{Digest, DigestType};

use crate::error::{StorageError, StorageResult};
use crate::object::{
    DataCategory, ObjectDescription, ObjectStorage, Order, ReplicaDigests, WriteLogEntry,
};
use crate::workspace::Workspace;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ObjectKey {
    tenant: u32,
    category: DataCategory,
    name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LogKey {
    tenant: u32,
    strategy: String,
    category: DataCategory,
}

#[derive(Debug, Default)]
struct Inner {
    strategies: BTreeMap<String, Vec<String>>,
    offers: HashMap<String, HashMap<ObjectKey, Vec<u8>>>,
    logs: HashMap<LogKey, Vec<WriteLogEntry>>,
    next_sequence: HashMap<LogKey, u64>,
    unavailable: bool,
}

impl Inner {
    fn offers_of(&self, strategy: &str) -> StorageResult<Vec<String>> {
        self.strategies
            .get(strategy)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("strategy {strategy}")))
    }

    fn check_available(&self) -> StorageResult<()> {
        if self.unavailable {
            return Err(StorageError::Connection("storage offers unreachable".into()));
        }
        Ok(())
    }

    fn append_log(&mut self, key: LogKey, entry_for: impl FnOnce(u64) -> WriteLogEntry) -> u64 {
        let next = self.next_sequence.entry(key.clone()).or_insert(1);
        let sequence = *next;
        *next = next.saturating_add(1);
        self.logs.entry(key).or_default().push(entry_for(sequence));
        sequence
    }
}

/// In-memory [`ObjectStorage`] for tests and single-node deployments.
///
/// Every strategy maps to a list of offers; each offer keeps its own copy of
/// every object so replicas can diverge. Sequences start at 1 per
/// (tenant, strategy, category) log.
#[derive(Debug)]
pub struct MemoryObjectStorage {
    digest_type: DigestType,
    inner: RwLock<Inner>,
}

impl Default for MemoryObjectStorage {
    fn default() -> Self {
        Self {
            digest_type: DigestType::default(),
            inner: RwLock::new(Inner::default()),
        }
    }
}

impl MemoryObjectStorage {
    /// Create a storage with no strategies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy replicated to the given offers.
    #[must_use]
    pub fn with_strategy<I, S>(self, strategy: impl Into<String>, offers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let offers: Vec<String> = offers.into_iter().map(Into::into).collect();
        if let Ok(mut inner) = self.inner.write() {
            for offer in &offers {
                inner.offers.entry(offer.clone()).or_default();
            }
            inner.strategies.insert(strategy.into(), offers);
        }
        self
    }

    /// Algorithm used to report replica digests.
    #[must_use]
    pub fn with_digest_type(mut self, digest_type: DigestType) -> Self {
        self.digest_type = digest_type;
        self
    }

    /// Digest of `data` as offers report it.
    #[must_use]
    pub fn digest_of(&self, data: &[u8]) -> String {
        Digest::compute(self.digest_type, data).to_base64()
    }

    fn write_inner(&self) -> StorageResult<std::sync::RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))
    }

    fn read_inner(&self) -> StorageResult<std::sync::RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))
    }

    /// Write an object to every offer of a strategy and log a `WRITE`.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown strategy or an unavailable backend.
    pub fn put_object(
        &self,
        ctx: &TenantContext,
        strategy: &str,
        category: DataCategory,
        object_name: &str,
        data: Vec<u8>,
    ) -> StorageResult<u64> {
        if object_name.is_empty() {
            return Err(StorageError::InvalidKey("object name must not be empty".into()));
        }
        let mut inner = self.write_inner()?;
        inner.check_available()?;
        let key = ObjectKey {
            tenant: ctx.tenant_id(),
            category,
            name: object_name.to_string(),
        };
        for offer in inner.offers_of(strategy)? {
            inner
                .offers
                .entry(offer)
                .or_default()
                .insert(key.clone(), data.clone());
        }
        let log_key = LogKey {
            tenant: ctx.tenant_id(),
            strategy: strategy.to_string(),
            category,
        };
        let sequence = inner.append_log(log_key, |seq| WriteLogEntry::write(seq, object_name));
        tracing::debug!(strategy, %category, object_name, sequence, "object stored");
        Ok(sequence)
    }

    /// Remove an object from every offer of a strategy and log a `DELETE`.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown strategy or an unavailable backend.
    pub fn delete_object(
        &self,
        ctx: &TenantContext,
        strategy: &str,
        category: DataCategory,
        object_name: &str,
    ) -> StorageResult<u64> {
        let mut inner = self.write_inner()?;
        inner.check_available()?;
        let key = ObjectKey {
            tenant: ctx.tenant_id(),
            category,
            name: object_name.to_string(),
        };
        for offer in inner.offers_of(strategy)? {
            if let Some(objects) = inner.offers.get_mut(&offer) {
                objects.remove(&key);
            }
        }
        let log_key = LogKey {
            tenant: ctx.tenant_id(),
            strategy: strategy.to_string(),
            category,
        };
        Ok(inner.append_log(log_key, |seq| WriteLogEntry::delete(seq, object_name)))
    }

    /// Set the sequence the next mutation of a log will receive.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    pub fn set_next_sequence(
        &self,
        ctx: &TenantContext,
        strategy: &str,
        category: DataCategory,
        sequence: u64,
    ) -> StorageResult<()> {
        let mut inner = self.write_inner()?;
        inner.next_sequence.insert(
            LogKey {
                tenant: ctx.tenant_id(),
                strategy: strategy.to_string(),
                category,
            },
            sequence,
        );
        Ok(())
    }

    /// Replace the copy held by a single offer, bypassing the write log.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    pub fn overwrite_replica(
        &self,
        ctx: &TenantContext,
        offer: &str,
        category: DataCategory,
        object_name: &str,
        data: Vec<u8>,
    ) -> StorageResult<()> {
        let mut inner = self.write_inner()?;
        inner.offers.entry(offer.to_string()).or_default().insert(
            ObjectKey {
                tenant: ctx.tenant_id(),
                category,
                name: object_name.to_string(),
            },
            data,
        );
        Ok(())
    }

    /// Drop the copy held by a single offer, bypassing the write log.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    pub fn remove_replica(
        &self,
        ctx: &TenantContext,
        offer: &str,
        category: DataCategory,
        object_name: &str,
    ) -> StorageResult<()> {
        let mut inner = self.write_inner()?;
        if let Some(objects) = inner.offers.get_mut(offer) {
            objects.remove(&ObjectKey {
                tenant: ctx.tenant_id(),
                category,
                name: object_name.to_string(),
            });
        }
        Ok(())
    }

    /// Simulate an outage: every trait operation fails with a connection error.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    pub fn set_unavailable(&self, unavailable: bool) -> StorageResult<()> {
        self.write_inner()?.unavailable = unavailable;
        Ok(())
    }

    /// Raw copy held by one offer, if any.
    #[must_use]
    pub fn replica(
        &self,
        ctx: &TenantContext,
        offer: &str,
        category: DataCategory,
        object_name: &str,
    ) -> Option<Vec<u8>> {
        let inner = self.inner.read().ok()?;
        inner.offers.get(offer)?.get(&ObjectKey {
            tenant: ctx.tenant_id(),
            category,
            name: object_name.to_string(),
        })
        .cloned()
    }
}

impl ObjectStorage for MemoryObjectStorage {
    fn list_writes(
        &self,
        ctx: &TenantContext,
        strategy: &str,
        category: DataCategory,
        from_offset: Option<u64>,
        limit: usize,
        order: Order,
    ) -> StorageResult<Vec<WriteLogEntry>> {
        let inner = self.read_inner()?;
        inner.check_available()?;
        inner.offers_of(strategy)?;
        let log_key = LogKey {
            tenant: ctx.tenant_id(),
            strategy: strategy.to_string(),
            category,
        };
        let Some(log) = inner.logs.get(&log_key) else {
            return Ok(Vec::new());
        };
        let window = log
            .iter()
            .filter(|entry| from_offset.is_none_or(|offset| entry.sequence > offset));
        let entries = match order {
            Order::Asc => window.take(limit).cloned().collect(),
            Order::Desc => window.rev().take(limit).cloned().collect(),
        };
        Ok(entries)
    }

    fn get_object(
        &self,
        ctx: &TenantContext,
        strategy: &str,
        category: DataCategory,
        object_name: &str,
    ) -> StorageResult<Box<dyn Read + Send>> {
        let inner = self.read_inner()?;
        inner.check_available()?;
        let key = ObjectKey {
            tenant: ctx.tenant_id(),
            category,
            name: object_name.to_string(),
        };
        inner
            .offers_of(strategy)?
            .iter()
            .find_map(|offer| inner.offers.get(offer).and_then(|o| o.get(&key)))
            .map(|data| Box::new(Cursor::new(data.clone())) as Box<dyn Read + Send>)
            .ok_or_else(|| StorageError::NotFound(format!("{category}/{object_name}")))
    }

    fn get_replica_digests(
        &self,
        ctx: &TenantContext,
        strategy: &str,
        category: DataCategory,
        object_name: &str,
        offer_ids: &[String],
    ) -> StorageResult<ReplicaDigests> {
        let inner = self.read_inner()?;
        inner.check_available()?;
        inner.offers_of(strategy)?;
        let key = ObjectKey {
            tenant: ctx.tenant_id(),
            category,
            name: object_name.to_string(),
        };
        Ok(offer_ids
            .iter()
            .map(|offer| {
                let digest = inner
                    .offers
                    .get(offer)
                    .and_then(|o| o.get(&key))
                    .map(|data| self.digest_of(data));
                (offer.clone(), digest)
            })
            .collect())
    }

    fn store_from_workspace(
        &self,
        ctx: &TenantContext,
        strategy: &str,
        category: DataCategory,
        object_name: &str,
        workspace: &dyn Workspace,
        source: &ObjectDescription,
    ) -> StorageResult<u64> {
        let data = workspace.get_object(&source.container, &source.path)?;
        self.put_object(ctx, strategy, category, object_name, data)
    }

    fn offer_ids(&self, strategy: &str) -> StorageResult<Vec<String>> {
        self.read_inner()?.offers_of(strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::MemoryWorkspace;

    fn storage() -> MemoryObjectStorage {
        MemoryObjectStorage::new().with_strategy("default", ["offer-1", "offer-2"])
    }

    fn read_all(mut reader: Box<dyn Read + Send>) -> Vec<u8> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_put_get_and_log() {
        let ctx = TenantContext::new(0);
        let storage = storage();
        let seq = storage
            .put_object(&ctx, "default", DataCategory::Unit, "u1.json", b"a".to_vec())
            .unwrap();
        assert_eq!(seq, 1);

        let data = read_all(
            storage
                .get_object(&ctx, "default", DataCategory::Unit, "u1.json")
                .unwrap(),
        );
        assert_eq!(data, b"a");

        let log = storage
            .list_writes(&ctx, "default", DataCategory::Unit, None, 10, Order::Asc)
            .unwrap();
        assert_eq!(log, vec![WriteLogEntry::write(1, "u1.json")]);
    }

    #[test]
    fn test_list_writes_windows() {
        let ctx = TenantContext::new(0);
        let storage = storage();
        storage
            .set_next_sequence(&ctx, "default", DataCategory::Unit, 100)
            .unwrap();
        for name in ["a.json", "b.json", "c.json"] {
            storage
                .put_object(&ctx, "default", DataCategory::Unit, name, vec![1])
                .unwrap();
        }

        let after: Vec<u64> = storage
            .list_writes(&ctx, "default", DataCategory::Unit, Some(100), 10, Order::Asc)
            .unwrap()
            .iter()
            .map(|e| e.sequence)
            .collect();
        assert_eq!(after, vec![101, 102]);

        let latest: Vec<u64> = storage
            .list_writes(&ctx, "default", DataCategory::Unit, None, 2, Order::Desc)
            .unwrap()
            .iter()
            .map(|e| e.sequence)
            .collect();
        assert_eq!(latest, vec![102, 101]);
    }

    #[test]
    fn test_tenants_are_isolated() {
        let storage = storage();
        storage
            .put_object(&TenantContext::new(1), "default", DataCategory::Unit, "x", vec![1])
            .unwrap();
        let other = TenantContext::new(2);
        assert!(
            storage
                .list_writes(&other, "default", DataCategory::Unit, None, 10, Order::Asc)
                .unwrap()
                .is_empty()
        );
        assert!(matches!(
            storage.get_object(&other, "default", DataCategory::Unit, "x"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_replica_digests_diverge() {
        let ctx = TenantContext::new(0);
        let storage = storage();
        storage
            .put_object(&ctx, "default", DataCategory::ObjectGroup, "g.json", b"g".to_vec())
            .unwrap();
        storage
            .overwrite_replica(&ctx, "offer-2", DataCategory::ObjectGroup, "g.json", b"x".to_vec())
            .unwrap();

        let offers = storage.offer_ids("default").unwrap();
        let digests = storage
            .get_replica_digests(&ctx, "default", DataCategory::ObjectGroup, "g.json", &offers)
            .unwrap();
        assert_eq!(digests["offer-1"], Some(storage.digest_of(b"g")));
        assert_eq!(digests["offer-2"], Some(storage.digest_of(b"x")));

        storage
            .remove_replica(&ctx, "offer-1", DataCategory::ObjectGroup, "g.json")
            .unwrap();
        let digests = storage
            .get_replica_digests(&ctx, "default", DataCategory::ObjectGroup, "g.json", &offers)
            .unwrap();
        assert_eq!(digests["offer-1"], None);
    }

    #[test]
    fn test_delete_logs_delete_action() {
        let ctx = TenantContext::new(0);
        let storage = storage();
        storage
            .put_object(&ctx, "default", DataCategory::Unit, "u.json", vec![1])
            .unwrap();
        storage
            .delete_object(&ctx, "default", DataCategory::Unit, "u.json")
            .unwrap();
        let log = storage
            .list_writes(&ctx, "default", DataCategory::Unit, Some(1), 10, Order::Asc)
            .unwrap();
        assert_eq!(log, vec![WriteLogEntry::delete(2, "u.json")]);
        assert!(storage.replica(&ctx, "offer-1", DataCategory::Unit, "u.json").is_none());
    }

    #[test]
    fn test_store_from_workspace() {
        let ctx = TenantContext::new(0);
        let storage = storage();
        let ws = MemoryWorkspace::new();
        ws.create_container("c").unwrap();
        ws.put_object("c", "op.json", b"{}".to_vec()).unwrap();

        let source = ObjectDescription {
            container: "c".into(),
            path: "op.json".into(),
        };
        storage
            .store_from_workspace(&ctx, "default", DataCategory::BackupOperation, "op.json", &ws, &source)
            .unwrap();
        assert_eq!(
            storage.replica(&ctx, "offer-2", DataCategory::BackupOperation, "op.json"),
            Some(b"{}".to_vec())
        );
    }

    #[test]
    fn test_unavailable_backend() {
        let ctx = TenantContext::new(0);
        let storage = storage();
        storage.set_unavailable(true).unwrap();
        assert!(matches!(
            storage.list_writes(&ctx, "default", DataCategory::Unit, None, 1, Order::Asc),
            Err(StorageError::Connection(_))
        ));
    }

    #[test]
    fn test_unknown_strategy() {
        assert!(matches!(
            storage().offer_ids("nope"),
            Err(StorageError::NotFound(_))
        ));
    }
}
