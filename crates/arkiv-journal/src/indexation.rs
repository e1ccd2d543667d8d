//! Index administration delegated to a generic helper.

use std::collections::BTreeMap;
use std::sync::RwLock;

use arkiv_core::{StatusCode, format_timestamp, now};
use serde::{Deserialize, Serialize};

use crate::error::{JournalError, JournalResult};

/// A reindex request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexParameters {
    /// Collection to reindex.
    pub collection: String,
    /// Tenants whose documents are reindexed.
    pub tenants: Vec<u32>,
}

/// Outcome of a reindex request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReindexationResult {
    /// Collection that was targeted.
    pub collection: String,
    /// Tenants that were targeted.
    pub tenants: Vec<u32>,
    /// `OK` when the new index was built.
    pub status: StatusCode,
    /// Name of the new index, on success.
    pub index_name: Option<String>,
    /// Explanation, on failure.
    pub message: Option<String>,
}

impl ReindexationResult {
    /// A failed result.
    #[must_use]
    pub fn ko(params: &IndexParameters, message: impl Into<String>) -> Self {
        Self {
            collection: params.collection.clone(),
            tenants: params.tenants.clone(),
            status: StatusCode::Ko,
            index_name: None,
            message: Some(message.into()),
        }
    }
}

/// Generic index administration shared by every collection.
pub trait IndexationHelper: Send + Sync {
    /// Build a fresh index for a collection and tenants.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be built.
    fn reindex(&self, params: &IndexParameters) -> JournalResult<ReindexationResult>;

    /// Point an alias at an index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index does not exist.
    fn switch_index(&self, alias: &str, new_index: &str) -> JournalResult<()>;
}

/// In-memory [`IndexationHelper`] tracking built indexes and aliases.
#[derive(Debug, Default)]
pub struct MemoryIndexationHelper {
    indexes: RwLock<Vec<String>>,
    aliases: RwLock<BTreeMap<String, String>>,
}

impl MemoryIndexationHelper {
    /// Create an empty helper.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index an alias currently points at.
    #[must_use]
    pub fn alias_target(&self, alias: &str) -> Option<String> {
        self.aliases.read().ok()?.get(alias).cloned()
    }
}

impl IndexationHelper for MemoryIndexationHelper {
    fn reindex(&self, params: &IndexParameters) -> JournalResult<ReindexationResult> {
        let tenants = params
            .tenants
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("_");
        let index_name = format!(
            "{}_{}_{}",
            params.collection.to_lowercase(),
            tenants,
            format_timestamp(&now()).replace([':', '.'], "-")
        );
        self.indexes
            .write()
            .map_err(|e| JournalError::Database(e.to_string()))?
            .push(index_name.clone());
        Ok(ReindexationResult {
            collection: params.collection.clone(),
            tenants: params.tenants.clone(),
            status: StatusCode::Ok,
            index_name: Some(index_name),
            message: None,
        })
    }

    fn switch_index(&self, alias: &str, new_index: &str) -> JournalResult<()> {
        let known = self
            .indexes
            .read()
            .map_err(|e| JournalError::Database(e.to_string()))?
            .iter()
            .any(|i| i == new_index);
        if !known {
            return Err(JournalError::NotFound(format!("index {new_index}")));
        }
        self.aliases
            .write()
            .map_err(|e| JournalError::Database(e.to_string()))?
            .insert(alias.to_string(), new_index.to_string());
        Ok(())
    }
}
