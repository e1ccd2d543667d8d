//! Arkiv Repository - document collaborators of the consistency subsystem.
//!
//! This crate defines the interfaces the journal, reconstruction and
//! evidence services use to reach the rest of the back office:
//!
//! - [`MetadataRepository`]: the primary document store for units and
//!   object groups
//! - [`LifecycleRepository`]: the per-entity lifecycle log
//! - [`SearchIndex`]: the search index mirroring the primary store
//!
//! It also provides the JSON [`Query`] language shared by `select`
//! operations, and in-memory implementations of every interface.
//!
//! Documents are plain [`serde_json::Value`] objects identified by their
//! `_id` field.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;
pub mod query;

mod error;
mod memory;
mod traits;

pub use error::{RepositoryError, RepositoryResult};
pub use memory::{MemoryLifecycleRepository, MemoryMetadataRepository, MemorySearchIndex};
pub use query::Query;
pub use traits::{LifecycleRepository, MetadataRepository, SearchIndex, document_id};
