//! Prelude module - commonly used types for convenient import.
//!
//! Use `use arkiv_repository::prelude::*;` to import all essential types.

pub use crate::{RepositoryError, RepositoryResult};

pub use crate::{LifecycleRepository, MetadataRepository, Query, SearchIndex, document_id};

pub use crate::{MemoryLifecycleRepository, MemoryMetadataRepository, MemorySearchIndex};
