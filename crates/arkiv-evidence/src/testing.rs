//! Shared fixture for audit tests.

use std::sync::Arc;

use arkiv_core::{EntityKind, OperationId, StatusCode, TenantContext};
use arkiv_crypto::{Digest, DigestType, digest_json};
use arkiv_journal::{
    JournalService, KvJournalStore, OperationBackup, OperationEntry, OperationJournal,
    OperationParameters, ProcessType,
};
use arkiv_repository::{
    LifecycleRepository, MemoryLifecycleRepository, MemoryMetadataRepository, MetadataRepository,
};
use arkiv_storage::{DataCategory, MemoryObjectStorage, MemoryWorkspace};
use serde_json::{Value, json};

use crate::ledger::{TraceabilityLine, encode_archive};
use crate::model::{AuditSettings, DEFAULT_SEAL_EVENT_TYPE};
use crate::service::EvidenceAuditService;

pub(crate) const PERSISTED: &str = "2026-01-15T10:00:00.000";
pub(crate) const OFFERS: [&str; 2] = ["offer-1", "offer-2"];

pub(crate) struct Fixture {
    pub(crate) ctx: TenantContext,
    pub(crate) storage: Arc<MemoryObjectStorage>,
    pub(crate) journal: Arc<JournalService>,
    pub(crate) metadata: Arc<MemoryMetadataRepository>,
    pub(crate) lifecycles: Arc<MemoryLifecycleRepository>,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let storage = Arc::new(MemoryObjectStorage::new().with_strategy("default", OFFERS));
        let backup = OperationBackup::new(storage.clone(), Arc::new(MemoryWorkspace::new()), "default");
        Self {
            ctx: TenantContext::new(3),
            journal: Arc::new(JournalService::new(Arc::new(KvJournalStore::in_memory()), backup)),
            storage,
            metadata: Arc::new(MemoryMetadataRepository::new()),
            lifecycles: Arc::new(MemoryLifecycleRepository::new()),
        }
    }

    pub(crate) fn service(&self) -> EvidenceAuditService {
        self.service_with(AuditSettings::default())
    }

    pub(crate) fn service_with(&self, settings: AuditSettings) -> EvidenceAuditService {
        EvidenceAuditService::new(
            self.journal.clone(),
            self.metadata.clone(),
            self.lifecycles.clone(),
            self.storage.clone(),
        )
        .with_settings(settings)
    }

    /// Store a unit, its lifecycle and its backup.
    pub(crate) fn put_unit(&self, id: &str, version: u64, title: &str) {
        let metadata = json!({
            "_id": id,
            "Title": title,
            "_storage": {"strategyId": "default", "offerIds": OFFERS},
        });
        let lifecycle = json!({
            "_id": id,
            "_v": version,
            "_lastPersistedDate": PERSISTED,
            "events": [{"evType": "LFC.UNIT_CHECK", "outcome": "OK"}],
        });
        self.metadata
            .save_bulk(&self.ctx, EntityKind::Unit, std::slice::from_ref(&metadata))
            .unwrap();
        self.lifecycles
            .create_raw_bulk(&self.ctx, EntityKind::Unit, std::slice::from_ref(&lifecycle))
            .unwrap();
        let backup = json!({"metadata": metadata, "lifecycle": lifecycle});
        self.storage
            .put_object(
                &self.ctx,
                "default",
                DataCategory::Unit,
                &format!("{id}.json"),
                backup.to_string().into_bytes(),
            )
            .unwrap();
    }

    /// The ledger line sealing the current state of a unit.
    pub(crate) fn line_for(&self, id: &str) -> TraceabilityLine {
        let metadata = self.doc(self.metadata.get_by_id(&self.ctx, EntityKind::Unit, id));
        let lifecycle = self.doc(self.lifecycles.get_by_id(&self.ctx, EntityKind::Unit, id));
        let backup = self
            .storage
            .replica(&self.ctx, OFFERS[0], DataCategory::Unit, &format!("{id}.json"))
            .unwrap();
        TraceabilityLine {
            entity_id: id.to_string(),
            entity_kind: EntityKind::Unit,
            version: lifecycle["_v"].as_u64().unwrap(),
            metadata_digest: digest_json(DigestType::Sha512, &metadata).to_base64(),
            lifecycle_digest: digest_json(DigestType::Sha512, &lifecycle).to_base64(),
            storage_digest: self.storage.digest_of(&backup),
        }
    }

    fn doc(&self, result: arkiv_repository::RepositoryResult<Option<Value>>) -> Value {
        result.unwrap().unwrap()
    }

    /// Record a successful seal of `lines` covering `[start, end]`.
    pub(crate) fn seal(&self, start: &str, end: &str, lines: &[TraceabilityLine]) -> OperationId {
        self.seal_archive(start, end, encode_archive(lines).unwrap(), None)
    }

    /// Record a successful seal of raw archive bytes, optionally with a
    /// recorded hash that does not match them.
    pub(crate) fn seal_archive(
        &self,
        start: &str,
        end: &str,
        archive: Vec<u8>,
        recorded_hash: Option<&str>,
    ) -> OperationId {
        // Seals are ordered by event time, which has millisecond resolution.
        std::thread::sleep(std::time::Duration::from_millis(5));
        let id = OperationId::new();
        let file_name = format!("{id}.zip");
        let hash = recorded_hash.map_or_else(
            || Digest::compute(DigestType::Sha512, &archive).to_base64(),
            str::to_string,
        );
        self.storage
            .put_object(&self.ctx, "default", DataCategory::Logbook, &file_name, archive)
            .unwrap();

        let started = OperationParameters::new(
            id,
            DEFAULT_SEAL_EVENT_TYPE,
            ProcessType::Traceability,
            StatusCode::Started,
            "Lifecycle sealing started",
        );
        self.journal.create(&self.ctx, &started).unwrap();
        let done = OperationParameters::new(
            id,
            DEFAULT_SEAL_EVENT_TYPE,
            ProcessType::Traceability,
            StatusCode::Ok,
            "Lifecycle sealing done",
        )
        .with_detail(json!({
            "StartDate": start,
            "EndDate": end,
            "FileName": file_name,
            "DigestAlgorithm": "SHA-512",
            "Hash": hash,
        }));
        self.journal.update(&self.ctx, &done).unwrap();
        id
    }

    pub(crate) fn audit_entry(&self, id: OperationId) -> OperationEntry {
        self.journal.get_by_id(&self.ctx, id).unwrap()
    }
}
