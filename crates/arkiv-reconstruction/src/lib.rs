//! Arkiv Reconstruction - rebuilding primary stores from backups.
//!
//! Every unit and object group is backed up to object storage as a
//! [`BackupSnapshot`] holding its metadata document and its lifecycle. The
//! storage write log orders these backups; reconstruction replays a window
//! of that log into the lifecycle log, the primary metadata store and the
//! search index, then reports the offset to resume from. Journal entries are
//! backed up whole and replay into the attached journal store the same way.
//!
//! Failures are graded:
//!
//! - a malformed or incomplete backup is skipped
//! - a primary-store failure is logged and tolerated
//! - a search-index failure yields `KO` but the offset still advances
//! - a lifecycle failure yields `KO` and the offset stays put
//! - an invalid request is an error, never a verdict
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use arkiv_core::{StatusCode, TenantContext};
//! use arkiv_reconstruction::prelude::*;
//! use arkiv_repository::{MemoryLifecycleRepository, MemoryMetadataRepository, MemorySearchIndex};
//! use arkiv_storage::MemoryObjectStorage;
//!
//! let storage = Arc::new(MemoryObjectStorage::new().with_strategy("default", ["offer-1"]));
//! let service = ReconstructionService::new(
//!     storage,
//!     Arc::new(MemoryMetadataRepository::new()),
//!     Arc::new(MemoryLifecycleRepository::new()),
//!     Arc::new(MemorySearchIndex::new()),
//!     Arc::new(KvOffsetRepository::in_memory()),
//!     "default",
//! );
//!
//! let request = ReconstructionRequest::new("Unit", 10, 0, 100);
//! let response = service.reconstruct(&TenantContext::new(10), &request).unwrap();
//! assert_eq!(response.status, StatusCode::Ok);
//! assert_eq!(response.offset, 0);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod model;
mod offset;
mod restore;
mod service;

pub use error::{ReconstructionError, ReconstructionResult};
pub use model::{
    BackupSnapshot, Collection, ReconstructionRequest, ReconstructionResponse, category_of, entity_id,
    parse_collection,
};
pub use offset::{KvOffsetRepository, OffsetRepository};
pub use restore::RestoreBackupService;
pub use service::{DEFAULT_BULK_SIZE, ReconstructionService};
