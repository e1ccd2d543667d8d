//! The evidence audit engine.

use std::collections::BTreeMap;
use std::sync::Arc;

use arkiv_core::{EntityKind, OperationId, StatusCode, TenantContext};
use arkiv_crypto::{DigestType, digest_json};
use arkiv_journal::{OperationJournal, OperationParameters, ProcessType};
use arkiv_repository::{LifecycleRepository, MetadataRepository};
use arkiv_storage::{DataCategory, ObjectStorage};
use arkiv_telemetry::RunGuard;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::artifacts::SealArtifacts;
use crate::error::{EvidenceError, EvidenceResult};
use crate::ledger::{TraceabilityLine, find_line};
use crate::model::{
    AuditRunResult, AuditSettings, EVIDENCE_AUDIT, EVIDENCE_AUDIT_DATABASE, EVIDENCE_AUDIT_STORAGE,
};
use crate::profile::EntityProfile;

const LAST_PERSISTED_DATE: &str = "_lastPersistedDate";
const VERSION: &str = "_v";

/// The seal an entity is audited against.
#[derive(Debug)]
struct Seal {
    operation_id: String,
    file_name: String,
    algorithm: DigestType,
    hash: String,
    freshest: bool,
}

/// Everything the checks compare.
#[derive(Debug)]
struct Evidence<'a> {
    profile: &'a EntityProfile,
    id: &'a str,
    metadata: Value,
    lifecycle: Value,
    seal: Seal,
    line: TraceabilityLine,
}

/// Proves that an entity's current state matches its sealed state.
///
/// Each run is recorded as an `EVIDENCE_AUDIT` operation in the journal,
/// with one sub-event per check and a final verdict.
pub struct EvidenceAuditService {
    journal: Arc<dyn OperationJournal>,
    metadata: Arc<dyn MetadataRepository>,
    lifecycles: Arc<dyn LifecycleRepository>,
    storage: Arc<dyn ObjectStorage>,
    settings: AuditSettings,
}

impl std::fmt::Debug for EvidenceAuditService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvidenceAuditService")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl EvidenceAuditService {
    /// Create an audit engine with default settings.
    #[must_use]
    pub fn new(
        journal: Arc<dyn OperationJournal>,
        metadata: Arc<dyn MetadataRepository>,
        lifecycles: Arc<dyn LifecycleRepository>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            journal,
            metadata,
            lifecycles,
            storage,
            settings: AuditSettings::default(),
        }
    }

    /// Replace the settings.
    #[must_use]
    pub fn with_settings(mut self, settings: AuditSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Audit an entity whose kind is given by name (`UNIT`, `OBJECT_GROUP`).
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError::InvalidArgument`] for an unknown kind or an
    /// empty id.
    pub fn audit_named(
        &self,
        ctx: &TenantContext,
        entity_id: &str,
        kind: &str,
    ) -> EvidenceResult<AuditRunResult> {
        let kind = kind
            .to_ascii_uppercase()
            .parse::<EntityKind>()
            .map_err(|e| EvidenceError::InvalidArgument(e.to_string()))?;
        self.audit(ctx, entity_id, kind)
    }

    /// Audit one entity.
    ///
    /// Every business or operational outcome comes back as an
    /// [`AuditRunResult`]; temporary files are removed before returning.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError::InvalidArgument`] for an empty id.
    pub fn audit(
        &self,
        ctx: &TenantContext,
        entity_id: &str,
        kind: EntityKind,
    ) -> EvidenceResult<AuditRunResult> {
        if entity_id.trim().is_empty() {
            return Err(EvidenceError::InvalidArgument("entity id must not be empty".into()));
        }
        let _run = RunGuard::enter("evidence_audit", ctx.span());
        let operation_id = OperationId::new();
        info!(%operation_id, entity_id, %kind, "evidence audit started");

        let start = OperationParameters::new(
            operation_id,
            EVIDENCE_AUDIT,
            ProcessType::Audit,
            StatusCode::Started,
            "Evidence audit started",
        )
        .with_detail(json!({"Id": entity_id, "MetadataType": kind}));
        if let Err(e) = self.journal.create(ctx, &start) {
            error!(%operation_id, error = %e, "could not create audit operation");
            return Ok(AuditRunResult::new(
                operation_id,
                StatusCode::Fatal,
                Some(format!("Could not create journal operation: {e}")),
            ));
        }

        let outcome = self
            .run_checks(ctx, operation_id, entity_id, kind)
            .and_then(|()| {
                self.record(
                    ctx,
                    operation_id,
                    EVIDENCE_AUDIT,
                    StatusCode::Ok,
                    "Evidence audit succeeded",
                    json!({}),
                )
            });

        let result = match outcome {
            Ok(()) => AuditRunResult::new(operation_id, StatusCode::Ok, None),
            Err(EvidenceError::Verdict { status, message }) => {
                warn!(%operation_id, %status, %message, "evidence audit failed");
                self.record_failure(ctx, operation_id, status, &message);
                AuditRunResult::new(operation_id, status, Some(message))
            },
            Err(EvidenceError::InvalidArgument(message)) => {
                self.record_failure(ctx, operation_id, StatusCode::Fatal, &message);
                AuditRunResult::new(operation_id, StatusCode::Fatal, Some(message))
            },
        };
        info!(%operation_id, status = %result.status, "evidence audit finished");
        Ok(result)
    }

    fn run_checks(
        &self,
        ctx: &TenantContext,
        operation_id: OperationId,
        id: &str,
        kind: EntityKind,
    ) -> EvidenceResult<()> {
        let profile = EntityProfile::of(kind);

        let metadata = self
            .metadata
            .get_by_id(ctx, kind, id)
            .map_err(|e| EvidenceError::fatal_from(&profile.metadata_failure(), e))?
            .ok_or_else(|| EvidenceError::ko(profile.missing_metadata(id)))?;
        let lifecycle = self
            .lifecycles
            .get_by_id(ctx, kind, id)
            .map_err(|e| EvidenceError::fatal_from(&profile.lifecycle_failure(), e))?
            .ok_or_else(|| EvidenceError::ko(profile.missing_lifecycle(id)))?;

        let seal = self.locate_seal(ctx, &lifecycle)?;

        // Dropped on every exit path below, removing the downloaded files.
        let mut artifacts = SealArtifacts::new(self.settings.tmp_dir.as_deref())?;
        let archive = self
            .storage
            .get_object(ctx, &self.settings.seal_strategy, DataCategory::Logbook, &seal.file_name)
            .map_err(|e| {
                EvidenceError::fatal_from(
                    &format!("Could not retrieve traceability zip file '{}'", seal.file_name),
                    e,
                )
            })?;
        artifacts.download(&seal.file_name, archive, seal.algorithm, &seal.hash)?;
        artifacts.extract_ledger()?;
        let line = find_line(artifacts.open_ledger()?, kind, id)?
            .ok_or_else(|| EvidenceError::ko("Could not find matching traceability info in the file"))?;
        drop(artifacts);

        let evidence = Evidence {
            profile,
            id,
            metadata,
            lifecycle,
            seal,
            line,
        };
        check_version(&evidence)?;

        let database_ok = self.check_database(ctx, operation_id, &evidence)?;
        let storage_ok = self.check_storage(ctx, operation_id, &evidence)?;
        if database_ok && storage_ok {
            Ok(())
        } else {
            Err(EvidenceError::ko("Traceability check failed"))
        }
    }

    fn locate_seal(&self, ctx: &TenantContext, lifecycle: &Value) -> EvidenceResult<Seal> {
        let seal_type = self.settings.seal_event_type.as_str();
        let date = lifecycle
            .get(LAST_PERSISTED_DATE)
            .and_then(Value::as_str)
            .ok_or_else(|| EvidenceError::fatal(format!("Lifecycle has no {LAST_PERSISTED_DATE}")))?;

        let covering = self
            .journal
            .find_covering_successful(ctx, seal_type, date)
            .map_err(|e| {
                EvidenceError::fatal_from("An error occurred during traceability operation retrieval", e)
            })?
            .ok_or_else(|| {
                EvidenceError::warn(format!("No traceability operation found matching date {date}"))
            })?;
        let operation_id = covering
            .get("#id")
            .and_then(Value::as_str)
            .ok_or_else(|| EvidenceError::fatal("Could not retrieve journal operation information"))?
            .to_string();

        let latest = self
            .journal
            .find_last_successful(ctx, seal_type)
            .map_err(|e| {
                EvidenceError::fatal_from(
                    "An error occurred during last traceability operation retrieval",
                    e,
                )
            })?;
        let freshest = latest
            .as_ref()
            .and_then(|op| op.get("#id"))
            .and_then(Value::as_str)
            == Some(operation_id.as_str());

        let detail = covering.get("evDetData");
        let field = |name: &str| {
            detail
                .and_then(|d| d.get(name))
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| EvidenceError::fatal("Could not retrieve journal operation information"))
        };
        let algorithm = field("DigestAlgorithm")?
            .parse::<DigestType>()
            .map_err(|e| EvidenceError::fatal_from("Could not retrieve journal operation information", e))?;

        Ok(Seal {
            file_name: field("FileName")?,
            hash: field("Hash")?,
            algorithm,
            freshest,
            operation_id,
        })
    }

    fn check_database(
        &self,
        ctx: &TenantContext,
        operation_id: OperationId,
        evidence: &Evidence<'_>,
    ) -> EvidenceResult<bool> {
        let algorithm = evidence.seal.algorithm;
        let metadata_digest = digest_json(algorithm, &evidence.metadata);
        let lifecycle_digest = digest_json(algorithm, &evidence.lifecycle);

        let mut errors = Vec::new();
        if !metadata_digest.matches_encoded(&evidence.line.metadata_digest) {
            errors.push("Metadata hash mismatch");
        }
        if !lifecycle_digest.matches_encoded(&evidence.line.lifecycle_digest) {
            errors.push("Lifecycle hash mismatch");
        }

        let mut detail = json!({
            "TraceabilityFile": evidence.seal.file_name,
            "DatabaseMetadataDigest": metadata_digest.to_base64(),
            "TraceabilityMetadataDigest": evidence.line.metadata_digest,
            "DatabaseLifecycleDigest": lifecycle_digest.to_base64(),
            "TraceabilityLifecycleDigest": evidence.line.lifecycle_digest,
        });
        self.finish_check(ctx, operation_id, EVIDENCE_AUDIT_DATABASE, evidence, &mut detail, &errors)
    }

    fn check_storage(
        &self,
        ctx: &TenantContext,
        operation_id: OperationId,
        evidence: &Evidence<'_>,
    ) -> EvidenceResult<bool> {
        let stored = evidence.metadata.get("_storage");
        let strategy = stored
            .and_then(|s| s.get("strategyId"))
            .and_then(Value::as_str)
            .unwrap_or(self.settings.seal_strategy.as_str());
        let offer_ids: Vec<String> = stored
            .and_then(|s| s.get("offerIds"))
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();

        let mut errors = Vec::new();
        let mut reported = BTreeMap::new();
        if offer_ids.is_empty() {
            errors.push("No storage metadata found for file".to_string());
        } else {
            let digests = self
                .storage
                .get_replica_digests(
                    ctx,
                    strategy,
                    evidence.profile.category,
                    &evidence.profile.backup_object_name(evidence.id),
                    &offer_ids,
                )
                .map_err(|e| {
                    EvidenceError::fatal_from("An error occurred during storage information retrieval", e)
                })?;
            let mut mismatch = false;
            for offer in &offer_ids {
                match digests.get(offer).cloned().flatten() {
                    Some(digest) => {
                        mismatch |= digest != evidence.line.storage_digest;
                        reported.insert(offer.clone(), digest);
                    },
                    None => errors.push(format!("No storage metadata found for file in offer {offer}")),
                }
            }
            if mismatch {
                errors.push("Storage hash mismatch".to_string());
            }
        }

        let mut detail = json!({
            "TraceabilityFile": evidence.seal.file_name,
            "TraceabilityMetadataAndLifecycleDigest": evidence.line.storage_digest,
            "OfferMetadataAndLifeCycleDigests": reported,
        });
        self.finish_check(ctx, operation_id, EVIDENCE_AUDIT_STORAGE, evidence, &mut detail, &errors)
    }

    /// Record a check's sub-event and report whether it passed.
    fn finish_check(
        &self,
        ctx: &TenantContext,
        operation_id: OperationId,
        event_type: &str,
        evidence: &Evidence<'_>,
        detail: &mut Value,
        errors: &[impl AsRef<str>],
    ) -> EvidenceResult<bool> {
        let passed = errors.is_empty();
        let status = if passed {
            StatusCode::Ok
        } else {
            error!(
                kind = %evidence.profile.kind,
                id = evidence.id,
                seal = %evidence.seal.operation_id,
                check = event_type,
                "evidence check failed"
            );
            if let Some(map) = detail.as_object_mut() {
                map.insert(
                    "Errors".into(),
                    errors.iter().map(|e| Value::from(e.as_ref())).collect(),
                );
            }
            StatusCode::Ko
        };
        let message = format!("{event_type} {status}");
        self.record(ctx, operation_id, event_type, status, &message, detail.take())?;
        Ok(passed)
    }

    fn record(
        &self,
        ctx: &TenantContext,
        operation_id: OperationId,
        event_type: &str,
        status: StatusCode,
        message: &str,
        detail: Value,
    ) -> EvidenceResult<()> {
        let params =
            OperationParameters::new(operation_id, event_type, ProcessType::Audit, status, message)
                .with_detail(detail);
        self.journal.update(ctx, &params).map_err(|e| {
            EvidenceError::fatal_from(
                &format!("Could not update journal operation {operation_id} with status {status}"),
                e,
            )
        })
    }

    fn record_failure(
        &self,
        ctx: &TenantContext,
        operation_id: OperationId,
        status: StatusCode,
        message: &str,
    ) {
        if let Err(e) = self.record(
            ctx,
            operation_id,
            EVIDENCE_AUDIT,
            status,
            message,
            json!({"Message": message}),
        ) {
            error!(%operation_id, %status, error = %e, "could not record audit verdict");
        }
    }
}

fn check_version(evidence: &Evidence<'_>) -> EvidenceResult<()> {
    let current = evidence
        .lifecycle
        .get(VERSION)
        .and_then(Value::as_u64)
        .ok_or_else(|| EvidenceError::fatal(format!("Lifecycle has no {VERSION}")))?;
    let sealed = evidence.line.version;

    if current == sealed {
        Ok(())
    } else if current < sealed {
        Err(EvidenceError::ko(format!(
            "Invalid version. Database version ({current}) cannot be lower than secured one ({sealed})"
        )))
    } else if evidence.seal.freshest {
        Err(EvidenceError::warn(format!(
            "Invalid version. Database version ({current}) not yet secured. Last secured version was ({sealed})"
        )))
    } else {
        Err(EvidenceError::ko(format!(
            "Invalid version. Database version ({current}) has not been secured. Last secured version was ({sealed})"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, OFFERS, PERSISTED};

    const WINDOW_START: &str = "2026-01-15T00:00:00.000";
    const WINDOW_END: &str = "2026-01-15T23:59:59.999";

    fn sealed_unit(fx: &Fixture, id: &str, version: u64) {
        fx.put_unit(id, version, "Sealed title");
        let line = fx.line_for(id);
        fx.seal(WINDOW_START, WINDOW_END, &[line]);
    }

    fn event<'a>(entry: &'a arkiv_journal::OperationEntry, event_type: &str) -> &'a arkiv_journal::OperationEvent {
        entry
            .events
            .iter()
            .find(|e| e.event_type == event_type)
            .unwrap()
    }

    #[test]
    fn test_untouched_entity_is_ok() {
        let fx = Fixture::new();
        sealed_unit(&fx, "u1", 4);

        let result = fx.service().audit(&fx.ctx, "u1", EntityKind::Unit).unwrap();
        assert_eq!(result.status, StatusCode::Ok);
        assert_eq!(result.http_status, 200);
        assert_eq!(result.message, None);

        let entry = fx.audit_entry(result.operation_id);
        assert_eq!(entry.event_type, EVIDENCE_AUDIT);
        assert_eq!(entry.outcome, StatusCode::Ok);
        let kinds: Vec<_> = entry.events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(
            kinds,
            [EVIDENCE_AUDIT, EVIDENCE_AUDIT_DATABASE, EVIDENCE_AUDIT_STORAGE, EVIDENCE_AUDIT]
        );
        let storage = event(&entry, EVIDENCE_AUDIT_STORAGE).detail.clone().unwrap();
        assert_eq!(storage["OfferMetadataAndLifeCycleDigests"].as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_one_replica_mismatch_is_ko() {
        let fx = Fixture::new();
        sealed_unit(&fx, "u1", 4);
        fx.storage
            .overwrite_replica(&fx.ctx, OFFERS[1], DataCategory::Unit, "u1.json", b"tampered".to_vec())
            .unwrap();

        let result = fx.service().audit(&fx.ctx, "u1", EntityKind::Unit).unwrap();
        assert_eq!(result.status, StatusCode::Ko);
        assert_eq!(result.message.as_deref(), Some("Traceability check failed"));

        let entry = fx.audit_entry(result.operation_id);
        assert_eq!(event(&entry, EVIDENCE_AUDIT_DATABASE).outcome, StatusCode::Ok);
        let storage = event(&entry, EVIDENCE_AUDIT_STORAGE);
        assert_eq!(storage.outcome, StatusCode::Ko);
        let detail = storage.detail.clone().unwrap();
        assert_eq!(detail["Errors"], json!(["Storage hash mismatch"]));
        assert_eq!(
            detail["OfferMetadataAndLifeCycleDigests"][OFFERS[1]],
            fx.storage.digest_of(b"tampered")
        );
        assert_eq!(entry.outcome, StatusCode::Ko);
    }

    #[test]
    fn test_missing_replica_is_ko() {
        let fx = Fixture::new();
        sealed_unit(&fx, "u1", 4);
        fx.storage
            .remove_replica(&fx.ctx, OFFERS[0], DataCategory::Unit, "u1.json")
            .unwrap();

        let result = fx.service().audit(&fx.ctx, "u1", EntityKind::Unit).unwrap();
        assert_eq!(result.status, StatusCode::Ko);
        let entry = fx.audit_entry(result.operation_id);
        let detail = event(&entry, EVIDENCE_AUDIT_STORAGE).detail.clone().unwrap();
        assert_eq!(
            detail["Errors"],
            json!(["No storage metadata found for file in offer offer-1"])
        );
    }

    #[test]
    fn test_modified_metadata_is_ko() {
        let fx = Fixture::new();
        sealed_unit(&fx, "u1", 4);
        fx.metadata
            .save_bulk(&fx.ctx, EntityKind::Unit, &[json!({"_id": "u1", "Title": "Rewritten"})])
            .unwrap();

        let result = fx.service().audit(&fx.ctx, "u1", EntityKind::Unit).unwrap();
        assert_eq!(result.status, StatusCode::Ko);
        let entry = fx.audit_entry(result.operation_id);
        let database = event(&entry, EVIDENCE_AUDIT_DATABASE);
        assert_eq!(database.outcome, StatusCode::Ko);
        let detail = database.detail.clone().unwrap();
        assert_eq!(detail["Errors"], json!(["Metadata hash mismatch"]));
        assert_ne!(detail["DatabaseMetadataDigest"], detail["TraceabilityMetadataDigest"]);
        assert_eq!(detail["DatabaseLifecycleDigest"], detail["TraceabilityLifecycleDigest"]);
        // No _storage section left on the rewritten document.
        let storage = event(&entry, EVIDENCE_AUDIT_STORAGE).detail.clone().unwrap();
        assert_eq!(storage["Errors"], json!(["No storage metadata found for file"]));
    }

    #[test]
    fn test_no_covering_seal_is_warning() {
        let fx = Fixture::new();
        fx.put_unit("u1", 4, "Never sealed");
        let line = fx.line_for("u1");
        fx.seal("2025-01-01T00:00:00.000", "2025-01-31T00:00:00.000", &[line]);

        let result = fx.service().audit(&fx.ctx, "u1", EntityKind::Unit).unwrap();
        assert_eq!(result.status, StatusCode::Warning);
        assert_eq!(result.http_status, 206);
        assert_eq!(
            result.message,
            Some(format!("No traceability operation found matching date {PERSISTED}"))
        );

        let entry = fx.audit_entry(result.operation_id);
        assert_eq!(entry.outcome, StatusCode::Warning);
        assert_eq!(
            entry.detail.unwrap()["Message"],
            format!("No traceability operation found matching date {PERSISTED}")
        );
    }

    #[test]
    fn test_unsealed_newer_version_on_freshest_seal_is_warning() {
        let fx = Fixture::new();
        sealed_unit(&fx, "u1", 4);
        fx.put_unit("u1", 5, "Sealed title");

        let result = fx.service().audit(&fx.ctx, "u1", EntityKind::Unit).unwrap();
        assert_eq!(result.status, StatusCode::Warning);
        assert_eq!(
            result.message.as_deref(),
            Some("Invalid version. Database version (5) not yet secured. Last secured version was (4)")
        );
    }

    #[test]
    fn test_unsealed_newer_version_with_fresher_seal_is_ko() {
        let fx = Fixture::new();
        sealed_unit(&fx, "u1", 4);
        fx.seal("2026-02-01T00:00:00.000", "2026-02-28T00:00:00.000", &[]);
        fx.put_unit("u1", 5, "Sealed title");

        let result = fx.service().audit(&fx.ctx, "u1", EntityKind::Unit).unwrap();
        assert_eq!(result.status, StatusCode::Ko);
        assert_eq!(
            result.message.as_deref(),
            Some("Invalid version. Database version (5) has not been secured. Last secured version was (4)")
        );
    }

    #[test]
    fn test_older_version_is_ko() {
        let fx = Fixture::new();
        sealed_unit(&fx, "u1", 4);
        fx.put_unit("u1", 3, "Sealed title");

        let result = fx.service().audit(&fx.ctx, "u1", EntityKind::Unit).unwrap();
        assert_eq!(result.status, StatusCode::Ko);
        assert_eq!(
            result.message.as_deref(),
            Some("Invalid version. Database version (3) cannot be lower than secured one (4)")
        );
    }

    #[test]
    fn test_entity_absent_from_ledger_is_ko() {
        let fx = Fixture::new();
        fx.put_unit("u1", 4, "a");
        fx.put_unit("u2", 1, "b");
        let other = fx.line_for("u2");
        fx.seal(WINDOW_START, WINDOW_END, &[other]);

        let result = fx.service().audit(&fx.ctx, "u1", EntityKind::Unit).unwrap();
        assert_eq!(result.status, StatusCode::Ko);
        assert_eq!(
            result.message.as_deref(),
            Some("Could not find matching traceability info in the file")
        );
    }

    #[test]
    fn test_malformed_ledger_line_is_fatal() {
        let fx = Fixture::new();
        fx.put_unit("u1", 4, "a");
        let good = serde_json::to_string(&fx.line_for("u1")).unwrap();
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        writer
            .start_file(crate::ledger::LEDGER_FILE_NAME, zip::write::SimpleFileOptions::default())
            .unwrap();
        std::io::Write::write_all(&mut writer, format!("not json\n{good}\n").as_bytes()).unwrap();
        let archive = writer.finish().unwrap().into_inner();
        fx.seal_archive(WINDOW_START, WINDOW_END, archive, None);

        let result = fx.service().audit(&fx.ctx, "u1", EntityKind::Unit).unwrap();
        assert_eq!(result.status, StatusCode::Fatal);
        assert_eq!(result.http_status, 500);
        assert_eq!(
            result.message.as_deref(),
            Some("Could not parse traceability file information line 'not json'")
        );
    }

    #[test]
    fn test_archive_digest_mismatch_is_fatal() {
        let fx = Fixture::new();
        fx.put_unit("u1", 4, "a");
        let archive = crate::ledger::encode_archive(&[fx.line_for("u1")]).unwrap();
        fx.seal_archive(WINDOW_START, WINDOW_END, archive, Some("AAAA"));

        let result = fx.service().audit(&fx.ctx, "u1", EntityKind::Unit).unwrap();
        assert_eq!(result.status, StatusCode::Fatal);
        assert!(result.message.unwrap().contains("digest mismatch"));
    }

    #[test]
    fn test_missing_documents_are_ko() {
        let fx = Fixture::new();
        let result = fx.service().audit(&fx.ctx, "nope", EntityKind::Unit).unwrap();
        assert_eq!(result.status, StatusCode::Ko);
        assert_eq!(result.message.as_deref(), Some("No such unit metadata 'nope'"));

        fx.metadata
            .save_bulk(&fx.ctx, EntityKind::ObjectGroup, &[json!({"_id": "g1"})])
            .unwrap();
        let result = fx.service().audit(&fx.ctx, "g1", EntityKind::ObjectGroup).unwrap();
        assert_eq!(result.status, StatusCode::Ko);
        assert_eq!(
            result.message.as_deref(),
            Some("No such lifecycle object group found 'g1'")
        );
    }

    #[test]
    fn test_backend_failure_is_fatal() {
        let fx = Fixture::new();
        sealed_unit(&fx, "u1", 4);
        fx.lifecycles.fail_with("connection reset");

        let result = fx.service().audit(&fx.ctx, "u1", EntityKind::Unit).unwrap();
        assert_eq!(result.status, StatusCode::Fatal);
        let message = result.message.unwrap();
        assert!(message.starts_with("An error occurred during unit lifecycle retrieval"));
        assert!(message.contains("connection reset"));

        let entry = fx.audit_entry(result.operation_id);
        assert_eq!(entry.outcome, StatusCode::Fatal);
    }

    #[test]
    fn test_temporary_files_are_removed() {
        let fx = Fixture::new();
        sealed_unit(&fx, "u1", 4);
        let tmp = tempfile::tempdir().unwrap();
        let service = fx.service_with(AuditSettings {
            tmp_dir: Some(tmp.path().to_path_buf()),
            ..AuditSettings::default()
        });

        assert_eq!(service.audit(&fx.ctx, "u1", EntityKind::Unit).unwrap().status, StatusCode::Ok);
        fx.put_unit("u1", 3, "Sealed title");
        assert_eq!(service.audit(&fx.ctx, "u1", EntityKind::Unit).unwrap().status, StatusCode::Ko);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_invalid_arguments() {
        let fx = Fixture::new();
        let service = fx.service();
        assert!(matches!(
            service.audit(&fx.ctx, " ", EntityKind::Unit),
            Err(EvidenceError::InvalidArgument(_))
        ));
        assert!(matches!(
            service.audit_named(&fx.ctx, "u1", "FOLDER"),
            Err(EvidenceError::InvalidArgument(_))
        ));
        let result = service.audit_named(&fx.ctx, "g1", "object_group").unwrap();
        assert_eq!(result.status, StatusCode::Ko);
    }
}
