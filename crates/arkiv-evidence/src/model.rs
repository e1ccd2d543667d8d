//! Audit settings and results.

use std::path::PathBuf;

use arkiv_core::{OperationId, StatusCode};
use serde::{Deserialize, Serialize};

/// Event type of the audit operation and of its final verdict.
pub const EVIDENCE_AUDIT: &str = "EVIDENCE_AUDIT";
/// Event type of the database check.
pub const EVIDENCE_AUDIT_DATABASE: &str = "EVIDENCE_AUDIT_DATABASE";
/// Event type of the storage check.
pub const EVIDENCE_AUDIT_STORAGE: &str = "EVIDENCE_AUDIT_STORAGE";
/// Event type of lifecycle sealing operations.
pub const DEFAULT_SEAL_EVENT_TYPE: &str = "LOGBOOK_LC_SECURISATION";

/// Where the audit finds seals and writes its temporary files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    /// Journal event type of sealing operations.
    pub seal_event_type: String,
    /// Storage strategy holding sealed archives.
    pub seal_strategy: String,
    /// Parent of the per-run temporary directory; system default when unset.
    pub tmp_dir: Option<PathBuf>,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            seal_event_type: DEFAULT_SEAL_EVENT_TYPE.to_string(),
            seal_strategy: "default".to_string(),
            tmp_dir: None,
        }
    }
}

/// Structured outcome of one audit run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRunResult {
    /// Id of the audit operation recorded in the journal.
    pub operation_id: OperationId,
    /// `OK`, `WARNING`, `KO` or `FATAL`.
    pub status: StatusCode,
    /// Why the run did not end `OK`.
    pub message: Option<String>,
    /// HTTP status equivalent to `status`.
    pub http_status: u16,
}

impl AuditRunResult {
    pub(crate) fn new(operation_id: OperationId, status: StatusCode, message: Option<String>) -> Self {
        Self {
            operation_id,
            status,
            message,
            http_status: status.http_status(),
        }
    }
}
