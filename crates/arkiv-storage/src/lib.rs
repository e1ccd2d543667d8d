//! Arkiv Storage - persistence layer for the consistency subsystem.
//!
//! Provides three storage surfaces:
//!
//! # Raw Key-Value ([`KvStore`])
//!
//! Namespaced byte-level `get`/`set`/`insert`/`delete`. Backs the durable
//! operation journal and the reconstruction offset cursors. [`block_on`]
//! bridges the async trait into the synchronous services built on it.
//!
//! # Object Storage ([`ObjectStorage`])
//!
//! Offer-based, content-addressable storage. Each strategy replicates an
//! object to a set of offers; every mutation is appended to a strictly
//! ordered write log that reconstruction uses as a cursor source.
//!
//! # Workspace ([`Workspace`])
//!
//! Short-lived staging containers. Backups are staged in the workspace,
//! stored into object storage from there, then removed.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod kv;
pub mod memory;
pub mod object;
pub mod prelude;
pub mod workspace;

pub use error::{StorageError, StorageResult};
pub use kv::{KvStore, MemoryKvStore, block_on};
pub use memory::MemoryObjectStorage;
pub use object::{
    DataCategory, ObjectDescription, ObjectStorage, Order, ReplicaDigests, WriteAction,
    WriteLogEntry,
};
pub use workspace::{MemoryWorkspace, Workspace};
