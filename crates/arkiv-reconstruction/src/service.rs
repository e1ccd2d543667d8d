//! Replays backup write logs into the primary stores.

use std::collections::HashMap;
use std::sync::Arc;

use arkiv_core::{EntityKind, StatusCode, TenantContext};
use arkiv_journal::{JournalStore, OperationEntry};
use arkiv_repository::{LifecycleRepository, MetadataRepository, SearchIndex};
use arkiv_storage::{ObjectStorage, Order, WriteAction, WriteLogEntry};
use arkiv_telemetry::RunGuard;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::{ReconstructionError, ReconstructionResult};
use crate::model::{
    BackupSnapshot, Collection, ReconstructionRequest, ReconstructionResponse, entity_id,
    parse_collection,
};
use crate::offset::OffsetRepository;
use crate::restore::RestoreBackupService;

/// Default number of write-log entries replayed together.
pub const DEFAULT_BULK_SIZE: usize = 1000;

/// Where the stores of one bulk ended up.
enum BulkOutcome {
    /// Every store accepted the bulk (primary-store failures are tolerated).
    Indexed,
    /// The search index rejected part of the bulk.
    IndexFailed,
}

/// Rebuilds the metadata store, lifecycle log and search index of units and
/// object groups from their backups, and the operation journal from its own
/// backups when a journal store is attached.
///
/// Each call replays one window of the write log. The window is cut into
/// bulks; a bulk's commit point is reached once its lifecycles (or journal
/// entries) are written, and the returned offset is the last sequence of the
/// last committed bulk.
pub struct ReconstructionService {
    restore: RestoreBackupService,
    journal: Option<Arc<dyn JournalStore>>,
    metadata: Arc<dyn MetadataRepository>,
    lifecycles: Arc<dyn LifecycleRepository>,
    index: Arc<dyn SearchIndex>,
    offsets: Arc<dyn OffsetRepository>,
    strategy: String,
    bulk_size: usize,
}

impl std::fmt::Debug for ReconstructionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconstructionService")
            .field("strategy", &self.strategy)
            .field("bulk_size", &self.bulk_size)
            .field("journal", &self.journal.is_some())
            .finish_non_exhaustive()
    }
}

impl ReconstructionService {
    /// Create a service reading backups of `strategy`.
    #[must_use]
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        metadata: Arc<dyn MetadataRepository>,
        lifecycles: Arc<dyn LifecycleRepository>,
        index: Arc<dyn SearchIndex>,
        offsets: Arc<dyn OffsetRepository>,
        strategy: impl Into<String>,
    ) -> Self {
        Self {
            restore: RestoreBackupService::new(storage),
            journal: None,
            metadata,
            lifecycles,
            index,
            offsets,
            strategy: strategy.into(),
            bulk_size: DEFAULT_BULK_SIZE,
        }
    }

    /// Set the number of entries replayed together (at least one).
    #[must_use]
    pub fn with_bulk_size(mut self, bulk_size: usize) -> Self {
        self.bulk_size = bulk_size.max(1);
        self
    }

    /// Rebuild the operation journal into `journal` as well.
    #[must_use]
    pub fn with_journal(mut self, journal: Arc<dyn JournalStore>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// The backup reader used by this service.
    #[must_use]
    pub fn restore(&self) -> &RestoreBackupService {
        &self.restore
    }

    /// Replay the window of the write log that follows `request.offset`.
    ///
    /// Operational failures are reported as a `KO` response, never as an
    /// error. The reached offset is persisted as the collection's cursor.
    ///
    /// # Errors
    ///
    /// Returns [`ReconstructionError::InvalidArgument`] for an unknown
    /// collection, a missing tenant or a negative limit, and for the
    /// operation collection when no journal store is attached.
    pub fn reconstruct(
        &self,
        ctx: &TenantContext,
        request: &ReconstructionRequest,
    ) -> ReconstructionResult<ReconstructionResponse> {
        let (collection, tenant, limit) = self.validate(request)?;
        Ok(self.run(&ctx.for_tenant(tenant), collection, request.offset, limit))
    }

    /// Replay from the persisted cursor of a collection.
    ///
    /// # Errors
    ///
    /// Returns [`ReconstructionError::InvalidArgument`] for an unknown
    /// collection or a negative limit, and [`ReconstructionError::Runtime`]
    /// if the cursor cannot be read.
    pub fn reconstruct_tracked(
        &self,
        ctx: &TenantContext,
        collection: &str,
        limit: i64,
    ) -> ReconstructionResult<ReconstructionResponse> {
        let parsed = parse_collection(collection)?;
        let offset = self
            .offsets
            .get(ctx, &self.strategy, parsed)?
            .unwrap_or_default();
        self.reconstruct(
            ctx,
            &ReconstructionRequest::new(collection, ctx.tenant_id(), offset, limit),
        )
    }

    /// Replay several windows in order.
    ///
    /// Every request is validated before any is run.
    ///
    /// # Errors
    ///
    /// Returns [`ReconstructionError::InvalidArgument`] if any request is
    /// invalid.
    pub fn reconstruct_all(
        &self,
        ctx: &TenantContext,
        requests: &[ReconstructionRequest],
    ) -> ReconstructionResult<Vec<ReconstructionResponse>> {
        let validated = requests
            .iter()
            .map(|request| self.validate(request).map(|v| (v, request.offset)))
            .collect::<ReconstructionResult<Vec<_>>>()?;
        Ok(validated
            .into_iter()
            .map(|((collection, tenant, limit), offset)| {
                self.run(&ctx.for_tenant(tenant), collection, offset, limit)
            })
            .collect())
    }

    fn validate(
        &self,
        request: &ReconstructionRequest,
    ) -> ReconstructionResult<(Collection, u32, usize)> {
        let validated = request.validate()?;
        if validated.0 == Collection::Operation && self.journal.is_none() {
            return Err(ReconstructionError::InvalidArgument(
                "operation collection requires a journal store".into(),
            ));
        }
        Ok(validated)
    }

    fn run(
        &self,
        ctx: &TenantContext,
        collection: Collection,
        offset: u64,
        limit: usize,
    ) -> ReconstructionResponse {
        let _run = RunGuard::enter("reconstruction", ctx.span());
        info!(%collection, offset, limit, "reconstruction started");

        let (reached, mut status) = self.replay(ctx, collection, offset, limit);
        if reached > offset
            && let Err(e) = self.offsets.advance(ctx, &self.strategy, collection, reached)
        {
            error!(%collection, offset = reached, error = %e, "failed to persist cursor");
            status = StatusCode::Ko;
        }

        info!(%collection, offset = reached, %status, "reconstruction finished");
        ReconstructionResponse {
            collection,
            tenant: ctx.tenant_id(),
            offset: reached,
            status,
        }
    }

    fn replay(
        &self,
        ctx: &TenantContext,
        collection: Collection,
        offset: u64,
        limit: usize,
    ) -> (u64, StatusCode) {
        if limit == 0 {
            return (offset, StatusCode::Ok);
        }
        let entries = match self.restore.list_writes(
            ctx,
            &self.strategy,
            collection,
            Some(offset),
            limit,
            Order::Asc,
        ) {
            Ok(entries) => entries,
            Err(e) => {
                error!(%collection, offset, error = %e, "cannot list backups");
                return (offset, StatusCode::Ko);
            },
        };

        let mut committed = offset;
        for bulk in entries.chunks(self.bulk_size) {
            let Some(last) = bulk.last().map(|entry| entry.sequence) else {
                continue;
            };
            let outcome = match collection.entity_kind() {
                Some(kind) => self.replay_bulk(ctx, kind, bulk),
                None => self.replay_operations(ctx, bulk),
            };
            match outcome {
                Ok(BulkOutcome::Indexed) => committed = last,
                Ok(BulkOutcome::IndexFailed) => return (last, StatusCode::Ko),
                Err(e) => {
                    error!(%collection, offset = committed, error = %e, "bulk abandoned");
                    return (committed, StatusCode::Ko);
                },
            }
        }
        (committed, StatusCode::Ok)
    }

    fn replay_operations(
        &self,
        ctx: &TenantContext,
        bulk: &[WriteLogEntry],
    ) -> ReconstructionResult<BulkOutcome> {
        let journal = self.journal.as_ref().ok_or_else(|| {
            ReconstructionError::InvalidArgument("operation collection requires a journal store".into())
        })?;

        let mut entries: Vec<OperationEntry> = Vec::new();
        for entry in latest_actions(bulk) {
            if entry.action == WriteAction::Delete {
                debug!(object = %entry.object_name, "journal entries are never deleted");
                continue;
            }
            match self
                .restore
                .load_operation(ctx, &self.strategy, &entry.object_name)
            {
                Ok(operation) if operation.tenant == ctx.tenant_id() => entries.push(operation),
                Ok(operation) => {
                    warn!(
                        operation_id = %operation.id,
                        tenant = operation.tenant,
                        "backup of another tenant skipped"
                    );
                },
                Err(ReconstructionError::Snapshot { object, reason }) => {
                    warn!(%object, %reason, sequence = entry.sequence, "unusable backup skipped");
                },
                Err(e) => return Err(e),
            }
        }

        if !entries.is_empty() {
            journal
                .restore(ctx, &entries)
                .map_err(|e| ReconstructionError::Runtime(format!("journal write: {e}")))?;
        }
        debug!(restored = entries.len(), "operation bulk replayed");
        Ok(BulkOutcome::Indexed)
    }

    fn replay_bulk(
        &self,
        ctx: &TenantContext,
        kind: EntityKind,
        bulk: &[WriteLogEntry],
    ) -> ReconstructionResult<BulkOutcome> {
        let mut snapshots = Vec::new();
        let mut deleted = Vec::new();
        for entry in latest_actions(bulk) {
            let id = entity_id(&entry.object_name);
            match entry.action {
                WriteAction::Write => {
                    if let Some(snapshot) = self.load(ctx, kind, entry)? {
                        snapshots.push(snapshot);
                    }
                },
                WriteAction::Delete => deleted.push(id.to_string()),
            }
        }

        let (metadata, lifecycles): (Vec<Value>, Vec<Value>) = snapshots
            .into_iter()
            .map(|snapshot| (snapshot.metadata, snapshot.lifecycle))
            .unzip();

        if !lifecycles.is_empty() {
            self.lifecycles
                .create_raw_bulk(ctx, kind, &lifecycles)
                .map_err(|e| ReconstructionError::Runtime(format!("lifecycle write: {e}")))?;
        }
        if !deleted.is_empty() {
            self.lifecycles
                .delete_bulk(ctx, kind, &deleted)
                .map_err(|e| ReconstructionError::Runtime(format!("lifecycle delete: {e}")))?;
        }

        if !metadata.is_empty()
            && let Err(e) = self.metadata.save_bulk(ctx, kind, &metadata)
        {
            warn!(collection = %kind, error = %e, "primary store rejected bulk");
        }
        if !deleted.is_empty()
            && let Err(e) = self.metadata.delete_bulk(ctx, kind, &deleted)
        {
            warn!(collection = %kind, error = %e, "primary store rejected deletions");
        }

        let mut outcome = BulkOutcome::Indexed;
        if !metadata.is_empty()
            && let Err(e) = self.index.index_bulk(ctx, kind, &metadata)
        {
            error!(collection = %kind, error = %e, "search index rejected bulk");
            outcome = BulkOutcome::IndexFailed;
        }
        if !deleted.is_empty()
            && let Err(e) = self.index.delete_bulk(ctx, kind, &deleted)
        {
            error!(collection = %kind, error = %e, "search index rejected deletions");
            outcome = BulkOutcome::IndexFailed;
        }

        debug!(
            collection = %kind,
            written = metadata.len(),
            deleted = deleted.len(),
            "bulk replayed"
        );
        Ok(outcome)
    }

    fn load(
        &self,
        ctx: &TenantContext,
        kind: EntityKind,
        entry: &WriteLogEntry,
    ) -> ReconstructionResult<Option<BackupSnapshot>> {
        match self.restore.load_snapshot(
            ctx,
            &self.strategy,
            kind,
            &entry.object_name,
            entry.sequence,
        ) {
            Ok(Some(snapshot)) => Ok(Some(snapshot)),
            Ok(None) => {
                warn!(object = %entry.object_name, sequence = entry.sequence, "incomplete backup skipped");
                Ok(None)
            },
            Err(ReconstructionError::Snapshot { object, reason }) => {
                warn!(%object, %reason, sequence = entry.sequence, "unusable backup skipped");
                Ok(None)
            },
            Err(e) => Err(e),
        }
    }
}

/// The last action on each object within a bulk, in write-log order.
fn latest_actions(bulk: &[WriteLogEntry]) -> impl Iterator<Item = &WriteLogEntry> {
    let latest: HashMap<&str, usize> = bulk
        .iter()
        .enumerate()
        .map(|(i, entry)| (entity_id(&entry.object_name), i))
        .collect();
    bulk.iter().enumerate().filter_map(move |(i, entry)| {
        if latest.get(entity_id(&entry.object_name)) == Some(&i) {
            Some(entry)
        } else {
            debug!(object = %entry.object_name, sequence = entry.sequence, "superseded within bulk");
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use arkiv_core::OperationId;
    use arkiv_journal::{
        JournalError, JournalResult, JournalService, KvJournalStore, OperationBackup,
        OperationJournal, OperationParameters, ProcessType,
    };
    use arkiv_repository::{
        MemoryLifecycleRepository, MemoryMetadataRepository, MemorySearchIndex, Query,
    };
    use arkiv_storage::{
        DataCategory, MemoryObjectStorage, ObjectDescription, ReplicaDigests, StorageError,
        MemoryWorkspace, StorageResult, Workspace,
    };
    use serde_json::json;

    use super::*;
    use crate::offset::KvOffsetRepository;

    /// Serves a fixed write log whatever the requested window.
    struct FixedLog {
        entries: Vec<WriteLogEntry>,
    }

    impl ObjectStorage for FixedLog {
        fn list_writes(
            &self,
            _ctx: &TenantContext,
            _strategy: &str,
            _category: DataCategory,
            _from_offset: Option<u64>,
            _limit: usize,
            _order: Order,
        ) -> StorageResult<Vec<WriteLogEntry>> {
            Ok(self.entries.clone())
        }

        fn get_object(
            &self,
            _ctx: &TenantContext,
            _strategy: &str,
            _category: DataCategory,
            object_name: &str,
        ) -> StorageResult<Box<dyn Read + Send>> {
            let id = entity_id(object_name);
            let doc = json!({
                "metadata": {"_id": id, "Title": format!("unit {id}")},
                "lifecycle": {"_id": id, "events": []}
            });
            Ok(Box::new(Cursor::new(doc.to_string().into_bytes())))
        }

        fn get_replica_digests(
            &self,
            _ctx: &TenantContext,
            _strategy: &str,
            _category: DataCategory,
            _object_name: &str,
            _offer_ids: &[String],
        ) -> StorageResult<ReplicaDigests> {
            Ok(ReplicaDigests::new())
        }

        fn store_from_workspace(
            &self,
            _ctx: &TenantContext,
            _strategy: &str,
            _category: DataCategory,
            _object_name: &str,
            _workspace: &dyn Workspace,
            _source: &ObjectDescription,
        ) -> StorageResult<u64> {
            Err(StorageError::Internal("read-only".into()))
        }

        fn offer_ids(&self, _strategy: &str) -> StorageResult<Vec<String>> {
            Ok(vec!["offer-1".into()])
        }
    }

    struct Fixture {
        metadata: Arc<MemoryMetadataRepository>,
        lifecycles: Arc<MemoryLifecycleRepository>,
        index: Arc<MemorySearchIndex>,
        offsets: Arc<KvOffsetRepository>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                metadata: Arc::new(MemoryMetadataRepository::new()),
                lifecycles: Arc::new(MemoryLifecycleRepository::new()),
                index: Arc::new(MemorySearchIndex::new()),
                offsets: Arc::new(KvOffsetRepository::in_memory()),
            }
        }

        fn service(&self, storage: Arc<dyn ObjectStorage>) -> ReconstructionService {
            ReconstructionService::new(
                storage,
                self.metadata.clone(),
                self.lifecycles.clone(),
                self.index.clone(),
                self.offsets.clone(),
                "default",
            )
        }
    }

    fn fixed_log(sequences: &[u64]) -> Arc<dyn ObjectStorage> {
        Arc::new(FixedLog {
            entries: sequences
                .iter()
                .map(|seq| WriteLogEntry::write(*seq, format!("u{seq}.json")))
                .collect(),
        })
    }

    fn unit_request(offset: u64, limit: i64) -> ReconstructionRequest {
        ReconstructionRequest::new("Unit", 10, offset, limit)
    }

    fn backup(storage: &MemoryObjectStorage, ctx: &TenantContext, id: &str, title: &str) -> u64 {
        let snapshot = BackupSnapshot::new(
            json!({"_id": id, "Title": title}),
            json!({"_id": id, "events": [{"evType": "LFC.CHECK"}]}),
        );
        storage
            .put_object(
                ctx,
                "default",
                DataCategory::Unit,
                &format!("{id}.json"),
                snapshot.to_bytes().unwrap(),
            )
            .unwrap()
    }

    #[test]
    fn test_reconstruct_window() {
        let fx = Fixture::new();
        let service = fx.service(fixed_log(&[100, 101]));
        let ctx = TenantContext::new(0);

        let response = service.reconstruct(&ctx, &unit_request(100, 100)).unwrap();
        assert_eq!(
            response,
            ReconstructionResponse {
                collection: Collection::Unit,
                tenant: 10,
                offset: 101,
                status: StatusCode::Ok,
            }
        );

        let tenant = ctx.for_tenant(10);
        assert_eq!(fx.metadata.count(&tenant, EntityKind::Unit), 2);
        assert_eq!(fx.lifecycles.count(&tenant, EntityKind::Unit), 2);
        assert_eq!(fx.index.count(&tenant, EntityKind::Unit), 2);
        assert_eq!(
            fx.offsets.get(&tenant, "default", Collection::Unit).unwrap(),
            Some(101)
        );
    }

    #[test]
    fn test_lifecycle_failure_keeps_offset() {
        let fx = Fixture::new();
        fx.lifecycles.fail_with("lifecycle log down");
        let service = fx.service(fixed_log(&[100, 101]));

        let response = service
            .reconstruct(&TenantContext::new(10), &unit_request(100, 100))
            .unwrap();
        assert_eq!(response.offset, 100);
        assert_eq!(response.status, StatusCode::Ko);
        assert_eq!(fx.metadata.count(&TenantContext::new(10), EntityKind::Unit), 0);
    }

    #[test]
    fn test_index_failure_advances_offset() {
        let fx = Fixture::new();
        fx.index.fail_with("index down");
        let service = fx.service(fixed_log(&[100, 101]));

        let response = service
            .reconstruct(&TenantContext::new(10), &unit_request(100, 100))
            .unwrap();
        assert_eq!(response.offset, 101);
        assert_eq!(response.status, StatusCode::Ko);
    }

    #[test]
    fn test_primary_store_failure_is_tolerated() {
        let fx = Fixture::new();
        fx.metadata.fail_with("primary store down");
        let service = fx.service(fixed_log(&[100, 101]));

        let response = service
            .reconstruct(&TenantContext::new(10), &unit_request(100, 100))
            .unwrap();
        assert_eq!(response.offset, 101);
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(fx.index.count(&TenantContext::new(10), EntityKind::Unit), 2);
    }

    #[test]
    fn test_zero_limit_is_a_no_op() {
        let fx = Fixture::new();
        let service = fx.service(fixed_log(&[100, 101]));

        let response = service
            .reconstruct(&TenantContext::new(10), &unit_request(42, 0))
            .unwrap();
        assert_eq!(response.offset, 42);
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(fx.lifecycles.count(&TenantContext::new(10), EntityKind::Unit), 0);
    }

    #[test]
    fn test_invalid_requests_are_errors() {
        let fx = Fixture::new();
        let service = fx.service(fixed_log(&[]));
        let ctx = TenantContext::new(10);

        for request in [
            ReconstructionRequest::new("Operation", 10, 0, 10),
            ReconstructionRequest::new("Unit", 10, 0, -1),
            ReconstructionRequest {
                tenant: None,
                ..unit_request(0, 10)
            },
        ] {
            assert!(matches!(
                service.reconstruct(&ctx, &request),
                Err(ReconstructionError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_bulks_commit_independently() {
        let fx = Fixture::new();
        let storage = Arc::new(MemoryObjectStorage::new().with_strategy("default", ["offer-1"]));
        let ctx = TenantContext::new(10);
        for id in ["a", "b", "c"] {
            backup(&storage, &ctx, id, id);
        }
        let service = fx.service(storage).with_bulk_size(2);

        let response = service.reconstruct(&ctx, &unit_request(0, 10)).unwrap();
        assert_eq!(response.offset, 3);
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(fx.metadata.count(&ctx, EntityKind::Unit), 3);
    }

    #[test]
    fn test_deletes_are_replayed() {
        let fx = Fixture::new();
        let storage = Arc::new(MemoryObjectStorage::new().with_strategy("default", ["offer-1"]));
        let ctx = TenantContext::new(10);
        backup(&storage, &ctx, "a", "a");
        backup(&storage, &ctx, "b", "b");
        let service = fx.service(storage.clone());
        service.reconstruct(&ctx, &unit_request(0, 10)).unwrap();
        assert_eq!(fx.metadata.count(&ctx, EntityKind::Unit), 2);

        storage
            .delete_object(&ctx, "default", DataCategory::Unit, "a.json")
            .unwrap();
        let response = service.reconstruct(&ctx, &unit_request(2, 10)).unwrap();
        assert_eq!(response.offset, 3);
        assert_eq!(fx.metadata.count(&ctx, EntityKind::Unit), 1);
        assert_eq!(fx.lifecycles.count(&ctx, EntityKind::Unit), 1);
        assert!(fx.index.get(&ctx, EntityKind::Unit, "a").unwrap().is_none());
    }

    #[test]
    fn test_latest_write_of_an_entity_wins() {
        let fx = Fixture::new();
        let storage = Arc::new(MemoryObjectStorage::new().with_strategy("default", ["offer-1"]));
        let ctx = TenantContext::new(10);
        backup(&storage, &ctx, "a", "first");
        backup(&storage, &ctx, "a", "second");
        let service = fx.service(storage);

        service.reconstruct(&ctx, &unit_request(0, 10)).unwrap();
        let doc = fx.index.get(&ctx, EntityKind::Unit, "a").unwrap().unwrap();
        assert_eq!(doc["Title"], "second");
    }

    #[test]
    fn test_unusable_backups_are_skipped() {
        let fx = Fixture::new();
        let storage = Arc::new(MemoryObjectStorage::new().with_strategy("default", ["offer-1"]));
        let ctx = TenantContext::new(10);
        storage
            .put_object(&ctx, "default", DataCategory::Unit, "x.json", b"not json".to_vec())
            .unwrap();
        storage
            .put_object(
                &ctx,
                "default",
                DataCategory::Unit,
                "y.json",
                json!({"metadata": {"_id": "y"}}).to_string().into_bytes(),
            )
            .unwrap();
        backup(&storage, &ctx, "z", "z");
        let service = fx.service(storage);

        let response = service.reconstruct(&ctx, &unit_request(0, 10)).unwrap();
        assert_eq!(response.offset, 3);
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(fx.metadata.count(&ctx, EntityKind::Unit), 1);
    }

    #[test]
    fn test_unreachable_storage_is_ko() {
        let fx = Fixture::new();
        let storage = Arc::new(MemoryObjectStorage::new().with_strategy("default", ["offer-1"]));
        let ctx = TenantContext::new(10);
        backup(&storage, &ctx, "a", "a");
        storage.set_unavailable(true).unwrap();
        let service = fx.service(storage);

        let response = service.reconstruct(&ctx, &unit_request(0, 10)).unwrap();
        assert_eq!(response.offset, 0);
        assert_eq!(response.status, StatusCode::Ko);
    }

    #[test]
    fn test_tracked_reconstruction_resumes_from_cursor() {
        let fx = Fixture::new();
        let storage = Arc::new(MemoryObjectStorage::new().with_strategy("default", ["offer-1"]));
        let ctx = TenantContext::new(10);
        backup(&storage, &ctx, "a", "a");
        backup(&storage, &ctx, "b", "b");
        let service = fx.service(storage.clone());

        let first = service.reconstruct_tracked(&ctx, "unit", 1).unwrap();
        assert_eq!(first.offset, 1);
        let second = service.reconstruct_tracked(&ctx, "unit", 10).unwrap();
        assert_eq!(second.offset, 2);
        let idle = service.reconstruct_tracked(&ctx, "unit", 10).unwrap();
        assert_eq!(idle.offset, 2);
        assert_eq!(idle.status, StatusCode::Ok);
        assert_eq!(fx.metadata.count(&ctx, EntityKind::Unit), 2);
    }

    #[test]
    fn test_reconstruct_all_validates_first() {
        let fx = Fixture::new();
        let service = fx.service(fixed_log(&[1]));
        let ctx = TenantContext::new(0);

        let result = service.reconstruct_all(
            &ctx,
            &[unit_request(0, 10), ReconstructionRequest::new("Nope", 10, 0, 10)],
        );
        assert!(matches!(result, Err(ReconstructionError::InvalidArgument(_))));
        assert_eq!(fx.metadata.count(&ctx.for_tenant(10), EntityKind::Unit), 0);

        let responses = service
            .reconstruct_all(
                &ctx,
                &[
                    unit_request(0, 10),
                    ReconstructionRequest::new("ObjectGroup", 10, 0, 10),
                ],
            )
            .unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[1].collection, Collection::ObjectGroup);
        assert!(responses.iter().all(|r| r.status == StatusCode::Ok));
    }

    /// A journal store whose backend is gone.
    struct DownJournal;

    impl JournalStore for DownJournal {
        fn insert(&self, _ctx: &TenantContext, _entry: &OperationEntry) -> JournalResult<()> {
            Err(JournalError::Database("journal down".into()))
        }

        fn append(
            &self,
            _ctx: &TenantContext,
            _params: &OperationParameters,
        ) -> JournalResult<OperationEntry> {
            Err(JournalError::Database("journal down".into()))
        }

        fn get_raw(&self, _ctx: &TenantContext, _id: OperationId) -> JournalResult<Option<Value>> {
            Err(JournalError::Database("journal down".into()))
        }

        fn select_raw(&self, _ctx: &TenantContext, _query: &Query) -> JournalResult<Vec<Value>> {
            Err(JournalError::Database("journal down".into()))
        }

        fn restore(&self, _ctx: &TenantContext, _entries: &[OperationEntry]) -> JournalResult<()> {
            Err(JournalError::Database("journal down".into()))
        }
    }

    fn journal_over(storage: &Arc<MemoryObjectStorage>, store: Arc<KvJournalStore>) -> JournalService {
        let backup = OperationBackup::new(storage.clone(), Arc::new(MemoryWorkspace::new()), "default");
        JournalService::new(store, backup)
    }

    fn step(id: OperationId, outcome: StatusCode) -> OperationParameters {
        OperationParameters::new(id, "PROCESS_SIP_UNITARY", ProcessType::Ingest, outcome, "step")
    }

    #[test]
    fn test_operations_rebuilt_from_backups() {
        let fx = Fixture::new();
        let storage = Arc::new(MemoryObjectStorage::new().with_strategy("default", ["offer-1"]));
        let ctx = TenantContext::new(10);
        let journal = journal_over(&storage, Arc::new(KvJournalStore::in_memory()));
        let (first, second) = (OperationId::new(), OperationId::new());
        journal.create(&ctx, &step(first, StatusCode::Started)).unwrap();
        journal.update(&ctx, &step(first, StatusCode::Ok)).unwrap();
        journal.create(&ctx, &step(second, StatusCode::Started)).unwrap();
        journal.update(&ctx, &step(second, StatusCode::Warning)).unwrap();

        let rebuilt = Arc::new(KvJournalStore::in_memory());
        let service = fx.service(storage.clone()).with_journal(rebuilt.clone()).with_bulk_size(3);
        let response = service.reconstruct_tracked(&ctx, "Operation", 10).unwrap();
        assert_eq!(response.collection, Collection::Operation);
        assert_eq!(response.offset, 4);
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(
            fx.offsets.get(&ctx, "default", Collection::Operation).unwrap(),
            Some(4)
        );
        assert_eq!(fx.offsets.get(&ctx, "default", Collection::Unit).unwrap(), None);

        let restored = journal_over(&storage, rebuilt);
        let entry = restored.get_by_id(&ctx, first).unwrap();
        assert_eq!(entry.version, 1);
        assert_eq!(entry.outcome, StatusCode::Ok);
        assert_eq!(restored.get_by_id(&ctx, second).unwrap().outcome, StatusCode::Warning);

        let again = service
            .reconstruct(&ctx, &ReconstructionRequest::new("Operation", 10, 0, 10))
            .unwrap();
        assert_eq!(again.offset, 4);
        assert_eq!(restored.get_by_id(&ctx, first).unwrap().version, 1);
    }

    #[test]
    fn test_operation_window_resumes_after_offset() {
        let fx = Fixture::new();
        let storage = Arc::new(MemoryObjectStorage::new().with_strategy("default", ["offer-1"]));
        let ctx = TenantContext::new(10);
        let journal = journal_over(&storage, Arc::new(KvJournalStore::in_memory()));
        let ids: Vec<OperationId> = (0..3).map(|_| OperationId::new()).collect();
        for id in &ids {
            journal.create(&ctx, &step(*id, StatusCode::Started)).unwrap();
        }

        let rebuilt = Arc::new(KvJournalStore::in_memory());
        let service = fx.service(storage.clone()).with_journal(rebuilt.clone());
        let response = service
            .reconstruct(&ctx, &ReconstructionRequest::new("operation", 10, 1, 1))
            .unwrap();
        assert_eq!(response.offset, 2);

        let restored = journal_over(&storage, rebuilt);
        assert!(restored.get_by_id(&ctx, ids[0]).is_err());
        assert!(restored.get_by_id(&ctx, ids[1]).is_ok());
        assert!(restored.get_by_id(&ctx, ids[2]).is_err());
    }

    #[test]
    fn test_operation_store_failure_keeps_offset() {
        let fx = Fixture::new();
        let storage = Arc::new(MemoryObjectStorage::new().with_strategy("default", ["offer-1"]));
        let ctx = TenantContext::new(10);
        let journal = journal_over(&storage, Arc::new(KvJournalStore::in_memory()));
        journal.create(&ctx, &step(OperationId::new(), StatusCode::Started)).unwrap();

        let service = fx.service(storage.clone()).with_journal(Arc::new(DownJournal));
        let response = service
            .reconstruct(&ctx, &ReconstructionRequest::new("Operation", 10, 0, 10))
            .unwrap();
        assert_eq!(response.offset, 0);
        assert_eq!(response.status, StatusCode::Ko);
        assert_eq!(fx.offsets.get(&ctx, "default", Collection::Operation).unwrap(), None);
    }

    #[test]
    fn test_operation_without_journal_store_is_invalid() {
        let fx = Fixture::new();
        let service = fx.service(fixed_log(&[1]));
        assert!(matches!(
            service.reconstruct_tracked(&TenantContext::new(10), "Operation", 10),
            Err(ReconstructionError::InvalidArgument(_))
        ));
    }
}
