//! Operation entries and the parameters that create and extend them.
//!
//! Entries are persisted with the internal field names below; `select`
//! rewrites the underscore-prefixed ones to their external form.
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `_id` | operation id |
//! | `_tenant` | owning tenant |
//! | `_v` | version, incremented on every appended event |
//! | `_lastPersistedDate` | time of the last durable write |
//! | `evType`, `evTypeProc`, `evDateTime` | type, process type and creation time |
//! | `outcome`, `outDetail`, `outMessg` | status of the latest event |
//! | `evDetData` | detail of the latest event that carried one |
//! | `events` | every event, in append order |

use std::fmt;

use arkiv_core::{OperationId, StatusCode, TenantContext, format_timestamp, now};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Family of process an operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessType {
    /// Audits, including evidence audits.
    Audit,
    /// Sealing of journals and lifecycles.
    Traceability,
    /// Ingest of new archives.
    Ingest,
    /// Metadata updates.
    Update,
    /// Storage maintenance, including reconstruction.
    Storage,
    /// Administrative actions on collections.
    Masterdata,
}

impl fmt::Display for ProcessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Audit => "AUDIT",
            Self::Traceability => "TRACEABILITY",
            Self::Ingest => "INGEST",
            Self::Update => "UPDATE",
            Self::Storage => "STORAGE",
            Self::Masterdata => "MASTERDATA",
        };
        f.write_str(name)
    }
}

/// Description of one event, as supplied by the caller of `create`/`update`.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationParameters {
    /// Operation the event belongs to.
    pub operation_id: OperationId,
    /// Unique id of this event.
    pub event_id: Uuid,
    /// Event type, e.g. `EVIDENCE_AUDIT_DATABASE`.
    pub event_type: String,
    /// Process family.
    pub process_type: ProcessType,
    /// Outcome of the event.
    pub outcome: StatusCode,
    /// Explicit outcome detail code; defaults to `{event_type}.{outcome}`.
    pub outcome_detail: Option<String>,
    /// Human-readable message.
    pub message: String,
    /// Structured detail payload.
    pub detail: Option<Value>,
}

impl OperationParameters {
    /// Describe an event.
    #[must_use]
    pub fn new(
        operation_id: OperationId,
        event_type: impl Into<String>,
        process_type: ProcessType,
        outcome: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation_id,
            event_id: Uuid::new_v4(),
            event_type: event_type.into(),
            process_type,
            outcome,
            outcome_detail: None,
            message: message.into(),
            detail: None,
        }
    }

    /// Attach a structured detail payload.
    #[must_use]
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Override the outcome detail code.
    #[must_use]
    pub fn with_outcome_detail(mut self, outcome_detail: impl Into<String>) -> Self {
        self.outcome_detail = Some(outcome_detail.into());
        self
    }

    /// The effective outcome detail code.
    #[must_use]
    pub fn outcome_detail(&self) -> String {
        self.outcome_detail
            .clone()
            .unwrap_or_else(|| format!("{}.{}", self.event_type, self.outcome))
    }

    fn to_event(&self) -> OperationEvent {
        OperationEvent {
            event_id: self.event_id.to_string(),
            event_type: self.event_type.clone(),
            process_type: self.process_type,
            date_time: format_timestamp(&now()),
            outcome: self.outcome,
            outcome_detail: self.outcome_detail(),
            message: self.message.clone(),
            detail: self.detail.clone(),
        }
    }
}

/// One event of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationEvent {
    /// Unique event id.
    #[serde(rename = "evId")]
    pub event_id: String,
    /// Event type.
    #[serde(rename = "evType")]
    pub event_type: String,
    /// Process family.
    #[serde(rename = "evTypeProc")]
    pub process_type: ProcessType,
    /// When the event was recorded.
    #[serde(rename = "evDateTime")]
    pub date_time: String,
    /// Outcome of the event.
    pub outcome: StatusCode,
    /// Outcome detail code.
    #[serde(rename = "outDetail")]
    pub outcome_detail: String,
    /// Human-readable message.
    #[serde(rename = "outMessg")]
    pub message: String,
    /// Structured detail payload.
    #[serde(rename = "evDetData", default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

/// A journal operation document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationEntry {
    /// Operation id.
    #[serde(rename = "_id")]
    pub id: OperationId,
    /// Owning tenant.
    #[serde(rename = "_tenant")]
    pub tenant: u32,
    /// Incremented on every appended event.
    #[serde(rename = "_v")]
    pub version: u64,
    /// Time of the last durable write.
    #[serde(rename = "_lastPersistedDate")]
    pub last_persisted_date: String,
    /// Operation type (type of the creating event).
    #[serde(rename = "evType")]
    pub event_type: String,
    /// Process family.
    #[serde(rename = "evTypeProc")]
    pub process_type: ProcessType,
    /// Creation time.
    #[serde(rename = "evDateTime")]
    pub date_time: String,
    /// Status of the latest event.
    pub outcome: StatusCode,
    /// Outcome detail of the latest event.
    #[serde(rename = "outDetail")]
    pub outcome_detail: String,
    /// Message of the latest event.
    #[serde(rename = "outMessg")]
    pub message: String,
    /// Detail of the latest event that carried one.
    #[serde(rename = "evDetData", default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
    /// Events in append order.
    pub events: Vec<OperationEvent>,
}

impl OperationEntry {
    /// Build a new entry from its creating event.
    #[must_use]
    pub fn create(ctx: &TenantContext, params: &OperationParameters) -> Self {
        let event = params.to_event();
        Self {
            id: params.operation_id,
            tenant: ctx.tenant_id(),
            version: 0,
            last_persisted_date: event.date_time.clone(),
            event_type: event.event_type.clone(),
            process_type: event.process_type,
            date_time: event.date_time.clone(),
            outcome: event.outcome,
            outcome_detail: event.outcome_detail.clone(),
            message: event.message.clone(),
            detail: event.detail.clone(),
            events: vec![event],
        }
    }

    /// Append an event and revise the top-level status.
    pub fn append(&mut self, params: &OperationParameters) {
        let event = params.to_event();
        self.version = self.version.saturating_add(1);
        self.last_persisted_date = event.date_time.clone();
        self.outcome = event.outcome;
        self.outcome_detail = event.outcome_detail.clone();
        self.message = event.message.clone();
        if event.detail.is_some() {
            self.detail = event.detail.clone();
        }
        self.events.push(event);
    }

    /// The most recent event.
    #[must_use]
    pub fn last_event(&self) -> Option<&OperationEvent> {
        self.events.last()
    }
}
