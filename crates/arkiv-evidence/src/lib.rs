//! Arkiv Evidence - probative-value audit of archived entities.
//!
//! Lifecycle sealing operations periodically write a ledger of digests
//! (metadata, lifecycle and stored backup) for every entity they cover,
//! pack it into a zip archive and record the archive's own digest in the
//! operation journal. An audit proves an entity has not drifted since:
//!
//! 1. fetch the entity's metadata and lifecycle
//! 2. find the successful seal covering its last persistence date
//! 3. download and verify the archive, then read the entity's ledger line
//! 4. compare versions, database digests and every replica's digest
//!
//! The run is journaled as an `EVIDENCE_AUDIT` operation and ends with a
//! graded verdict: `OK`, `WARNING` (not sealed yet), `KO` (evidence
//! contradicts the current state) or `FATAL` (the audit could not run).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use arkiv_core::{EntityKind, TenantContext};
//! use arkiv_evidence::prelude::*;
//! use arkiv_journal::OperationJournal;
//! use arkiv_repository::{LifecycleRepository, MetadataRepository};
//! use arkiv_storage::ObjectStorage;
//!
//! fn audit(
//!     journal: Arc<dyn OperationJournal>,
//!     metadata: Arc<dyn MetadataRepository>,
//!     lifecycles: Arc<dyn LifecycleRepository>,
//!     storage: Arc<dyn ObjectStorage>,
//! ) -> EvidenceResult<()> {
//!     let service = EvidenceAuditService::new(journal, metadata, lifecycles, storage);
//!     let result = service.audit(&TenantContext::new(1), "unit-1", EntityKind::Unit)?;
//!     println!("{} {:?}", result.status, result.message);
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod artifacts;
mod error;
mod ledger;
mod model;
mod profile;
mod service;

#[cfg(test)]
mod testing;

pub use artifacts::SealArtifacts;
pub use error::{EvidenceError, EvidenceResult};
pub use ledger::{LEDGER_FILE_NAME, TraceabilityLine, encode_archive, find_line};
pub use model::{
    AuditRunResult, AuditSettings, DEFAULT_SEAL_EVENT_TYPE, EVIDENCE_AUDIT, EVIDENCE_AUDIT_DATABASE,
    EVIDENCE_AUDIT_STORAGE,
};
pub use profile::EntityProfile;
pub use service::EvidenceAuditService;
