//! Prelude module - commonly used types for convenient import.
//!
//! Use `use arkiv_reconstruction::prelude::*;` to import all essential types.

// Errors
pub use crate::{ReconstructionError, ReconstructionResult};

// Requests and snapshots
pub use crate::{BackupSnapshot, Collection, ReconstructionRequest, ReconstructionResponse};

// Services
pub use crate::{KvOffsetRepository, OffsetRepository, ReconstructionService, RestoreBackupService};
