//! Arkiv Journal - the append-only operation journal.
//!
//! Every system process records its progress as an [`OperationEntry`]: a
//! document created once and then extended with events until the process
//! ends. This crate provides:
//!
//! - The entry model and the parameters callers use to describe events
//! - [`JournalStore`]: durable storage of entries, with [`KvJournalStore`]
//!   built on the raw KV layer
//! - [`OperationBackup`]: mirroring of every written entry to object storage
//! - [`JournalService`]: the [`OperationJournal`] implementation that ties
//!   storage and backup together
//! - [`AlertingJournal`]: a decorator raising out-of-band alerts for
//!   configured outcomes
//! - Index administration delegated to an [`IndexationHelper`]
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use arkiv_core::{OperationId, StatusCode, TenantContext};
//! use arkiv_journal::prelude::*;
//! use arkiv_storage::{MemoryObjectStorage, MemoryWorkspace};
//!
//! let storage = Arc::new(MemoryObjectStorage::new().with_strategy("default", ["offer-1"]));
//! let backup = OperationBackup::new(storage, Arc::new(MemoryWorkspace::new()), "default");
//! let journal = JournalService::new(Arc::new(KvJournalStore::in_memory()), backup);
//!
//! let ctx = TenantContext::new(0);
//! let id = OperationId::new();
//! let params = OperationParameters::new(
//!     id,
//!     "EVIDENCE_AUDIT",
//!     ProcessType::Audit,
//!     StatusCode::Started,
//!     "Evidence audit started",
//! );
//! journal.create(&ctx, &params).unwrap();
//! assert_eq!(journal.get_by_id(&ctx, id).unwrap().events.len(), 1);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod alert;
mod backup;
mod entry;
mod error;
mod indexation;
mod journal;
mod service;
mod store;

pub use alert::{Alert, AlertLevel, AlertRule, AlertService, AlertingJournal, LogAlertService};
pub use backup::OperationBackup;
pub use entry::{OperationEntry, OperationEvent, OperationParameters, ProcessType};
pub use error::{JournalError, JournalResult};
pub use indexation::{
    IndexParameters, IndexationHelper, MemoryIndexationHelper, ReindexationResult,
};
pub use journal::{OPERATION_COLLECTION, OperationJournal, external_field_names};
pub use service::JournalService;
pub use store::{JournalStore, KvJournalStore};
