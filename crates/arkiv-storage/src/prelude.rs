//! Prelude module - commonly used types for convenient import.
//!
//! Use `use arkiv_storage::prelude::*;` to import all essential types.

pub use crate::{StorageError, StorageResult};

pub use crate::{KvStore, MemoryKvStore, block_on};

pub use crate::{
    DataCategory, MemoryObjectStorage, ObjectDescription, ObjectStorage, Order, ReplicaDigests,
    WriteAction, WriteLogEntry,
};

pub use crate::{MemoryWorkspace, Workspace};
