//! Prelude module - commonly used types for convenient import.
//!
//! Use `use arkiv_evidence::prelude::*;` to import all essential types.

// Errors
pub use crate::{EvidenceError, EvidenceResult};

// Settings and results
pub use crate::{AuditRunResult, AuditSettings};

// Ledger
pub use crate::{SealArtifacts, TraceabilityLine};

// Service
pub use crate::EvidenceAuditService;
