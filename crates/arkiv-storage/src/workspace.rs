//! Workspace staging area.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{StorageError, StorageResult};

/// Short-lived staging containers for objects on their way into storage.
pub trait Workspace: Send + Sync {
    /// Create a container if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace backend fails.
    fn create_container(&self, container: &str) -> StorageResult<()>;

    /// Whether a container exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace backend fails.
    fn container_exists(&self, container: &str) -> StorageResult<bool>;

    /// Write an object into a container, overwriting any previous copy.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the container does not exist.
    fn put_object(&self, container: &str, path: &str, data: Vec<u8>) -> StorageResult<()>;

    /// Read an object.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the object does not exist.
    fn get_object(&self, container: &str, path: &str) -> StorageResult<Vec<u8>>;

    /// Remove an object.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the object does not exist.
    fn delete_object(&self, container: &str, path: &str) -> StorageResult<()>;
}

/// In-memory workspace.
#[derive(Debug, Default)]
pub struct MemoryWorkspace {
    containers: RwLock<HashMap<String, HashMap<String, Vec<u8>>>>,
}

impl MemoryWorkspace {
    /// Create an empty workspace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects currently staged in a container.
    #[must_use]
    pub fn object_count(&self, container: &str) -> usize {
        self.containers
            .read()
            .ok()
            .and_then(|c| c.get(container).map(HashMap::len))
            .unwrap_or(0)
    }
}

impl Workspace for MemoryWorkspace {
    fn create_container(&self, container: &str) -> StorageResult<()> {
        if container.is_empty() {
            return Err(StorageError::InvalidKey(
                "container name must not be empty".into(),
            ));
        }
        let mut containers = self
            .containers
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        containers.entry(container.to_string()).or_default();
        Ok(())
    }

    fn container_exists(&self, container: &str) -> StorageResult<bool> {
        let containers = self
            .containers
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(containers.contains_key(container))
    }

    fn put_object(&self, container: &str, path: &str, data: Vec<u8>) -> StorageResult<()> {
        let mut containers = self
            .containers
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        let objects = containers
            .get_mut(container)
            .ok_or_else(|| StorageError::NotFound(format!("container {container}")))?;
        objects.insert(path.to_string(), data);
        Ok(())
    }

    fn get_object(&self, container: &str, path: &str) -> StorageResult<Vec<u8>> {
        let containers = self
            .containers
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        containers
            .get(container)
            .and_then(|objects| objects.get(path))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("{container}/{path}")))
    }

    fn delete_object(&self, container: &str, path: &str) -> StorageResult<()> {
        let mut containers = self
            .containers
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        containers
            .get_mut(container)
            .and_then(|objects| objects.remove(path))
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(format!("{container}/{path}")))
    }
}
