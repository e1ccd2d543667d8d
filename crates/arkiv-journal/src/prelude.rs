//! Prelude module - commonly used types for convenient import.
//!
//! Use `use arkiv_journal::prelude::*;` to import all essential types.

// Errors
pub use crate::{JournalError, JournalResult};

// Entries
pub use crate::{OperationEntry, OperationEvent, OperationParameters, ProcessType};

// Journal and its implementation
pub use crate::{JournalService, JournalStore, KvJournalStore, OperationBackup, OperationJournal};

// Alerting
pub use crate::{Alert, AlertLevel, AlertRule, AlertService, AlertingJournal, LogAlertService};

// Indexation
pub use crate::{IndexParameters, IndexationHelper, MemoryIndexationHelper, ReindexationResult};
