//! Requests, responses and backup snapshots.

use std::fmt;

use arkiv_core::{EntityKind, StatusCode};
use arkiv_storage::DataCategory;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ReconstructionError, ReconstructionResult};

/// A primary store that can be rebuilt from its backups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Collection {
    /// Archive units: metadata, lifecycles and search index.
    Unit,
    /// Object groups: metadata, lifecycles and search index.
    ObjectGroup,
    /// The operation journal.
    Operation,
}

impl Collection {
    /// Canonical upper-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unit => "UNIT",
            Self::ObjectGroup => "OBJECT_GROUP",
            Self::Operation => "OPERATION",
        }
    }

    /// The entity kind of a metadata collection; `None` for the journal.
    #[must_use]
    pub fn entity_kind(self) -> Option<EntityKind> {
        match self {
            Self::Unit => Some(EntityKind::Unit),
            Self::ObjectGroup => Some(EntityKind::ObjectGroup),
            Self::Operation => None,
        }
    }

    /// Storage category holding the collection's backups.
    #[must_use]
    pub fn category(self) -> DataCategory {
        match self.entity_kind() {
            Some(kind) => category_of(kind),
            None => DataCategory::BackupOperation,
        }
    }
}

impl From<EntityKind> for Collection {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Unit => Self::Unit,
            EntityKind::ObjectGroup => Self::ObjectGroup,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve a collection name (`Unit`, `OBJECT_GROUP`, `operation`, ...).
///
/// # Errors
///
/// Returns [`ReconstructionError::InvalidArgument`] for any other name.
pub fn parse_collection(name: &str) -> ReconstructionResult<Collection> {
    let upper = name.trim().to_ascii_uppercase();
    if upper == Collection::Operation.as_str() {
        return Ok(Collection::Operation);
    }
    upper
        .parse::<EntityKind>()
        .map(Collection::from)
        .map_err(|_| ReconstructionError::InvalidArgument(format!("unknown collection: {name}")))
}

/// Storage category holding the backups of a collection.
#[must_use]
pub fn category_of(kind: EntityKind) -> DataCategory {
    match kind {
        EntityKind::Unit => DataCategory::Unit,
        EntityKind::ObjectGroup => DataCategory::ObjectGroup,
    }
}

/// A request to replay one window of the backup write log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconstructionRequest {
    /// Collection name, matched case-insensitively.
    pub collection: String,
    /// Tenant whose stores are rebuilt.
    pub tenant: Option<u32>,
    /// Last sequence already replayed; entries after it are listed.
    #[serde(default)]
    pub offset: u64,
    /// Maximum number of write-log entries in the window.
    pub limit: i64,
}

impl ReconstructionRequest {
    /// Build a request.
    #[must_use]
    pub fn new(collection: impl Into<String>, tenant: u32, offset: u64, limit: i64) -> Self {
        Self {
            collection: collection.into(),
            tenant: Some(tenant),
            offset,
            limit,
        }
    }

    /// Check the request and resolve its collection, tenant and limit.
    ///
    /// # Errors
    ///
    /// Returns [`ReconstructionError::InvalidArgument`] for an unknown
    /// collection, a missing tenant or a negative limit.
    pub fn validate(&self) -> ReconstructionResult<(Collection, u32, usize)> {
        let kind = parse_collection(&self.collection)?;
        let tenant = self
            .tenant
            .ok_or_else(|| ReconstructionError::InvalidArgument("tenant is required".into()))?;
        let limit = usize::try_from(self.limit).map_err(|_| {
            ReconstructionError::InvalidArgument(format!("limit must be positive: {}", self.limit))
        })?;
        Ok((kind, tenant, limit))
    }
}

/// Outcome of one replayed window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconstructionResponse {
    /// Collection that was rebuilt.
    pub collection: Collection,
    /// Tenant that was rebuilt.
    pub tenant: u32,
    /// Offset to resume from.
    pub offset: u64,
    /// `OK` or `KO`.
    pub status: StatusCode,
}

/// A backed-up entity: its metadata document and its lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSnapshot {
    /// Metadata document, as saved in the primary store.
    pub metadata: Value,
    /// Lifecycle document, as saved in the lifecycle log.
    pub lifecycle: Value,
    /// Write-log sequence that produced this backup.
    #[serde(skip)]
    pub offset: u64,
}

impl BackupSnapshot {
    /// Build a snapshot from its two parts.
    #[must_use]
    pub fn new(metadata: Value, lifecycle: Value) -> Self {
        Self {
            metadata,
            lifecycle,
            offset: 0,
        }
    }

    /// Serialize the snapshot as it is stored in object storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the documents cannot be serialized.
    pub fn to_bytes(&self) -> ReconstructionResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ReconstructionError::Runtime(e.to_string()))
    }
}

/// Id of the entity a backup object belongs to (`<id>.json` becomes `<id>`).
#[must_use]
pub fn entity_id(object_name: &str) -> &str {
    object_name.strip_suffix(".json").unwrap_or(object_name)
}
