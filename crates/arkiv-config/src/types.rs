//! Configuration struct definitions.
//!
//! Every section implements [`Default`], so a bare `[section]` header in a
//! file still yields a working configuration.

use std::path::PathBuf;

use arkiv_evidence::AuditSettings;
use arkiv_journal::AlertRule;
use arkiv_telemetry::LogConfig;
use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Object storage defaults.
    pub storage: StorageSection,
    /// Operation journal settings.
    pub journal: JournalSection,
    /// Reconstruction settings.
    pub reconstruction: ReconstructionSection,
    /// Evidence audit settings.
    pub evidence: AuditSettings,
    /// Logging level, format and per-crate directives.
    pub logging: LogConfig,
}

/// Object storage defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Strategy entity backups are written to and read from.
    pub default_strategy: String,
    /// Directory for staging files before they are stored.
    pub tmp_dir: Option<PathBuf>,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            default_strategy: "default".to_owned(),
            tmp_dir: None,
        }
    }
}

/// Operation journal settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalSection {
    /// Strategy operation backups are written to.
    pub backup_strategy: String,
    /// Rules raising alerts on journal writes.
    pub alerts: Vec<AlertRule>,
}

impl Default for JournalSection {
    fn default() -> Self {
        Self {
            backup_strategy: "default".to_owned(),
            alerts: Vec::new(),
        }
    }
}

/// Reconstruction settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionSection {
    /// Write-log entries replayed per bulk.
    pub bulk_size: usize,
}

impl Default for ReconstructionSection {
    fn default() -> Self {
        Self { bulk_size: 1000 }
    }
}
