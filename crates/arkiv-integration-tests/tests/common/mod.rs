//! Shared test harness for integration tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};

use arkiv_config::Config;
use arkiv_core::{EntityKind, OperationId, StatusCode, TenantContext};
use arkiv_crypto::{Digest, DigestType, digest_json};
use arkiv_evidence::{DEFAULT_SEAL_EVENT_TYPE, EvidenceAuditService, TraceabilityLine, encode_archive};
use arkiv_journal::{
    Alert, AlertService, AlertingJournal, JournalResult, JournalService, KvJournalStore,
    OperationBackup, OperationJournal, OperationParameters, ProcessType,
};
use arkiv_reconstruction::{
    BackupSnapshot, KvOffsetRepository, ReconstructionService, category_of,
};
use arkiv_repository::{
    LifecycleRepository, MemoryLifecycleRepository, MemoryMetadataRepository, MemorySearchIndex,
    MetadataRepository, SearchIndex,
};
use arkiv_storage::{DataCategory, MemoryObjectStorage, MemoryWorkspace};
use serde_json::{Value, json};
use tempfile::TempDir;

/// Offers of the single storage strategy.
pub const OFFERS: [&str; 2] = ["offer-1", "offer-2"];
/// Date every archived lifecycle was last persisted at.
pub const PERSISTED: &str = "2026-03-10T08:00:00.000";
/// A sealing window covering [`PERSISTED`].
#[allow(dead_code)]
pub const WINDOW: (&str, &str) = ("2026-03-10T00:00:00.000", "2026-03-10T23:59:59.999");

const CONFIG: &str = r#"
[reconstruction]
bulk_size = 2

[[journal.alerts]]
event_type = "EVIDENCE_AUDIT"
outcome = "KO"
level = "error"

[[journal.alerts]]
outcome_detail = "EVIDENCE_AUDIT.FATAL"
level = "error"
"#;

static LOGGING: Once = Once::new();

/// [`AlertService`] keeping every alert it receives.
#[derive(Debug, Default)]
pub struct RecordingAlerts {
    alerts: Mutex<Vec<Alert>>,
}

#[allow(dead_code)]
impl RecordingAlerts {
    /// Alerts received so far.
    pub fn received(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }
}

impl AlertService for RecordingAlerts {
    fn send(&self, alert: &Alert) -> JournalResult<()> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

/// Primary stores: metadata, lifecycle log, search index and journal.
#[derive(Debug)]
pub struct Stores {
    pub metadata: Arc<MemoryMetadataRepository>,
    pub lifecycles: Arc<MemoryLifecycleRepository>,
    pub index: Arc<MemorySearchIndex>,
    pub journal: Arc<KvJournalStore>,
}

impl Default for Stores {
    fn default() -> Self {
        Self {
            metadata: Arc::default(),
            lifecycles: Arc::default(),
            index: Arc::default(),
            journal: Arc::new(KvJournalStore::in_memory()),
        }
    }
}

#[allow(dead_code)]
impl Stores {
    /// Metadata document of an entity.
    pub fn metadata_of(&self, ctx: &TenantContext, kind: EntityKind, id: &str) -> Option<Value> {
        self.metadata.get_by_id(ctx, kind, id).unwrap()
    }

    /// Lifecycle of an entity.
    pub fn lifecycle_of(&self, ctx: &TenantContext, kind: EntityKind, id: &str) -> Option<Value> {
        self.lifecycles.get_by_id(ctx, kind, id).unwrap()
    }
}

/// A tenant's archive: object storage, alerting journal and live stores,
/// configured from a TOML file.
#[allow(dead_code)]
pub struct ArchiveHarness {
    pub ctx: TenantContext,
    pub config: Config,
    pub storage: Arc<MemoryObjectStorage>,
    pub alerts: Arc<RecordingAlerts>,
    pub journal: Arc<AlertingJournal<JournalService>>,
    pub live: Stores,
    backup: OperationBackup,
    _config_dir: TempDir,
}

#[allow(dead_code)]
impl ArchiveHarness {
    pub fn new() -> Self {
        LOGGING.call_once(|| {
            let _ = arkiv_telemetry::setup_logging(
                &arkiv_telemetry::LogConfig::new("warn").without_timestamps(),
            );
        });

        let config_dir = TempDir::new().expect("failed to create tempdir");
        let path = config_dir.path().join("arkiv.toml");
        std::fs::write(&path, CONFIG).unwrap();
        let config = arkiv_config::loader::load_layers(
            &config_dir.path().join("no-system.toml"),
            Some(&path),
            &HashMap::<String, String>::new(),
        )
        .unwrap()
        .config;

        let storage = Arc::new(
            MemoryObjectStorage::new().with_strategy(config.storage.default_strategy.clone(), OFFERS),
        );
        let backup = OperationBackup::new(
            storage.clone(),
            Arc::new(MemoryWorkspace::new()),
            config.journal.backup_strategy.clone(),
        );
        let alerts = Arc::new(RecordingAlerts::default());
        let live = Stores::default();
        let journal = Arc::new(AlertingJournal::new(
            JournalService::new(live.journal.clone(), backup.clone()),
            alerts.clone(),
            config.journal.alerts.clone(),
        ));

        Self {
            ctx: TenantContext::new(2),
            config,
            storage,
            alerts,
            journal,
            live,
            backup,
            _config_dir: config_dir,
        }
    }

    fn strategy(&self) -> &str {
        &self.config.storage.default_strategy
    }

    /// Archive an entity: write it to the live stores and back it up.
    ///
    /// Returns the write-log sequence of the backup.
    pub fn archive(&self, kind: EntityKind, id: &str, version: u64, title: &str) -> u64 {
        let metadata = json!({
            "_id": id,
            "Title": title,
            "_storage": {"strategyId": self.strategy(), "offerIds": OFFERS},
        });
        let lifecycle = json!({
            "_id": id,
            "_v": version,
            "_lastPersistedDate": PERSISTED,
            "events": [{"evType": "LFC.CHECK", "outcome": "OK"}],
        });
        self.live
            .metadata
            .save_bulk(&self.ctx, kind, std::slice::from_ref(&metadata))
            .unwrap();
        self.live
            .lifecycles
            .create_raw_bulk(&self.ctx, kind, std::slice::from_ref(&lifecycle))
            .unwrap();
        self.live
            .index
            .index_bulk(&self.ctx, kind, std::slice::from_ref(&metadata))
            .unwrap();

        let snapshot = BackupSnapshot::new(metadata, lifecycle).to_bytes().unwrap();
        self.storage
            .put_object(&self.ctx, self.strategy(), category_of(kind), &format!("{id}.json"), snapshot)
            .unwrap()
    }

    /// Eliminate an entity everywhere.
    pub fn eliminate(&self, kind: EntityKind, id: &str) -> u64 {
        let ids = [id.to_owned()];
        self.live.metadata.delete_bulk(&self.ctx, kind, &ids).unwrap();
        self.live.lifecycles.delete_bulk(&self.ctx, kind, &ids).unwrap();
        self.live.index.delete_bulk(&self.ctx, kind, &ids).unwrap();
        self.storage
            .delete_object(&self.ctx, self.strategy(), category_of(kind), &format!("{id}.json"))
            .unwrap()
    }

    /// The ledger line sealing an entity's current live state.
    pub fn line_for(&self, kind: EntityKind, id: &str) -> TraceabilityLine {
        let metadata = self.live.metadata_of(&self.ctx, kind, id).unwrap();
        let lifecycle = self.live.lifecycle_of(&self.ctx, kind, id).unwrap();
        let backup = self
            .storage
            .replica(&self.ctx, OFFERS[0], category_of(kind), &format!("{id}.json"))
            .unwrap();
        TraceabilityLine {
            entity_id: id.to_owned(),
            entity_kind: kind,
            version: lifecycle["_v"].as_u64().unwrap(),
            metadata_digest: digest_json(DigestType::Sha512, &metadata).to_base64(),
            lifecycle_digest: digest_json(DigestType::Sha512, &lifecycle).to_base64(),
            storage_digest: self.storage.digest_of(&backup),
        }
    }

    /// Seal the current state of `entities` over `window`.
    pub fn seal(&self, window: (&str, &str), entities: &[(EntityKind, &str)]) -> OperationId {
        // Seals are ordered by event time, which has millisecond resolution.
        std::thread::sleep(std::time::Duration::from_millis(5));
        let lines: Vec<_> = entities
            .iter()
            .map(|(kind, id)| self.line_for(*kind, id))
            .collect();
        let archive = encode_archive(&lines).unwrap();
        let hash = Digest::compute(DigestType::Sha512, &archive).to_base64();

        let id = OperationId::new();
        let file_name = format!("{id}.zip");
        self.storage
            .put_object(&self.ctx, &self.config.evidence.seal_strategy, DataCategory::Logbook, &file_name, archive)
            .unwrap();

        let event_type = DEFAULT_SEAL_EVENT_TYPE;
        self.journal
            .create(
                &self.ctx,
                &OperationParameters::new(id, event_type, ProcessType::Traceability, StatusCode::Started, "Sealing started"),
            )
            .unwrap();
        self.journal
            .update(
                &self.ctx,
                &OperationParameters::new(id, event_type, ProcessType::Traceability, StatusCode::Ok, "Sealing done")
                    .with_detail(json!({
                        "StartDate": window.0,
                        "EndDate": window.1,
                        "FileName": file_name,
                        "DigestAlgorithm": "SHA-512",
                        "Hash": hash,
                    })),
            )
            .unwrap();
        id
    }

    /// A reconstruction service rebuilding `target` from this archive's backups.
    pub fn reconstruction(&self, target: &Stores) -> ReconstructionService {
        ReconstructionService::new(
            self.storage.clone(),
            target.metadata.clone(),
            target.lifecycles.clone(),
            target.index.clone(),
            Arc::new(KvOffsetRepository::in_memory()),
            self.strategy(),
        )
        .with_journal(target.journal.clone())
        .with_bulk_size(self.config.reconstruction.bulk_size)
    }

    /// A journal reading and writing the entries of `stores`.
    pub fn journal_over(&self, stores: &Stores) -> JournalService {
        JournalService::new(stores.journal.clone(), self.backup.clone())
    }

    /// An audit engine reading entities from `stores`.
    pub fn auditor(&self, stores: &Stores) -> EvidenceAuditService {
        EvidenceAuditService::new(
            self.journal.clone(),
            stores.metadata.clone(),
            stores.lifecycles.clone(),
            self.storage.clone(),
        )
        .with_settings(self.config.evidence.clone())
    }
}
