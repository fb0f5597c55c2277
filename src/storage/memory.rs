//! In-process storage backend
//!
//! Backs the store contract with namespaced maps behind a mutex. Intended
//! for tests and for embedding the library without a durable database.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::error::{PromptStageError, Result};

use super::StorageBackend;

/// In-memory storage backend
///
/// Namespaces map to ordered key-value maps, so `list` iterates in key
/// order like the durable backend.
///
/// # Examples
///
/// ```
/// use promptstage::storage::{MemoryBackend, StorageBackend};
///
/// let backend = MemoryBackend::new();
/// backend.set("prompts", "greet", b"{}").unwrap();
/// assert!(backend.get("prompts", "greet").unwrap().is_some());
/// ```
#[derive(Debug, Default)]
pub struct MemoryBackend {
    namespaces: Mutex<HashMap<String, BTreeMap<String, Vec<u8>>>>,
}

impl MemoryBackend {
    /// Creates an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    fn with_namespaces<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, BTreeMap<String, Vec<u8>>>) -> T,
    ) -> Result<T> {
        let mut guard = self
            .namespaces
            .lock()
            .map_err(|_| PromptStageError::Storage("memory backend lock poisoned".to_string()))?;
        Ok(f(&mut guard))
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        self.with_namespaces(|namespaces| {
            namespaces
                .get(namespace)
                .and_then(|entries| entries.get(key).cloned())
        })
    }

    fn set(&self, namespace: &str, key: &str, value: &[u8]) -> Result<()> {
        self.with_namespaces(|namespaces| {
            namespaces
                .entry(namespace.to_string())
                .or_default()
                .insert(key.to_string(), value.to_vec());
        })
    }

    fn delete(&self, namespace: &str, key: &str) -> Result<()> {
        self.with_namespaces(|namespaces| {
            if let Some(entries) = namespaces.get_mut(namespace) {
                entries.remove(key);
            }
        })
    }

    fn take(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        self.with_namespaces(|namespaces| {
            namespaces
                .get_mut(namespace)
                .and_then(|entries| entries.remove(key))
        })
    }

    fn list(&self, namespace: &str) -> Result<Vec<Vec<u8>>> {
        self.with_namespaces(|namespaces| {
            namespaces
                .get(namespace)
                .map(|entries| entries.values().cloned().collect())
                .unwrap_or_default()
        })
    }
}
