//! Durable storage backend over an embedded sled database
//!
//! Each namespace maps to a sled tree, so prompt, session, and pending
//! records live in separate keyspaces of one database file.

use std::path::PathBuf;

use ::sled::{Db, Tree};
use directories::ProjectDirs;

use crate::error::{PromptStageError, Result};

use super::StorageBackend;

/// Durable storage backend
pub struct SledBackend {
    db: Db,
}

impl SledBackend {
    /// Opens the database at the default data directory
    ///
    /// The location can be overridden with the `PROMPTSTAGE_DB` environment
    /// variable, which makes it easy to point the library at a test DB or
    /// alternate file without changing the user's application data dir.
    pub fn new() -> Result<Self> {
        if let Ok(override_path) = std::env::var("PROMPTSTAGE_DB") {
            return Self::new_with_path(override_path);
        }

        let proj_dirs = ProjectDirs::from("com", "promptstage", "promptstage").ok_or_else(|| {
            PromptStageError::Storage("could not determine data directory".to_string())
        })?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .map_err(|e| PromptStageError::Storage(format!("failed to create data directory: {}", e)))?;

        Self::new_with_path(data_dir.join("promptstage.db"))
    }

    /// Opens the database at the specified path
    ///
    /// This is primarily useful for tests where the default application
    /// data directory is not desirable (for example, a temporary directory).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use promptstage::storage::SledBackend;
    ///
    /// let backend = SledBackend::new_with_path("/tmp/promptstage.db").unwrap();
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let db = ::sled::open(&path)
            .map_err(|e| PromptStageError::Storage(format!("failed to open database: {}", e)))?;
        Ok(Self { db })
    }

    fn tree(&self, namespace: &str) -> Result<Tree> {
        self.db
            .open_tree(namespace)
            .map_err(|e| PromptStageError::Storage(format!("failed to open tree '{}': {}", namespace, e)).into())
    }

    fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| PromptStageError::Storage(format!("flush failed: {}", e)))?;
        Ok(())
    }
}

impl StorageBackend for SledBackend {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self
            .tree(namespace)?
            .get(key)
            .map_err(|e| PromptStageError::Storage(format!("get failed: {}", e)))?;
        Ok(value.map(|ivec| ivec.to_vec()))
    }

    fn set(&self, namespace: &str, key: &str, value: &[u8]) -> Result<()> {
        self.tree(namespace)?
            .insert(key, value)
            .map_err(|e| PromptStageError::Storage(format!("insert failed: {}", e)))?;
        self.flush()
    }

    fn delete(&self, namespace: &str, key: &str) -> Result<()> {
        self.tree(namespace)?
            .remove(key)
            .map_err(|e| PromptStageError::Storage(format!("remove failed: {}", e)))?;
        self.flush()
    }

    fn take(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        // Tree::remove returns the previous value atomically, which is what
        // the spend-once guarantee for staged messages rests on.
        let previous = self
            .tree(namespace)?
            .remove(key)
            .map_err(|e| PromptStageError::Storage(format!("remove failed: {}", e)))?;
        self.flush()?;
        Ok(previous.map(|ivec| ivec.to_vec()))
    }

    fn list(&self, namespace: &str) -> Result<Vec<Vec<u8>>> {
        let mut values = Vec::new();
        for entry in self.tree(namespace)?.iter() {
            let (_, value) =
                entry.map_err(|e| PromptStageError::Storage(format!("iteration failed: {}", e)))?;
            values.push(value.to_vec());
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::tempdir;

    fn create_test_backend() -> (SledBackend, tempfile::TempDir) {
        let dir = tempdir().expect("failed to create tempdir");
        let backend =
            SledBackend::new_with_path(dir.path().join("test.db")).expect("failed to open backend");
        (backend, dir)
    }

    #[test]
    fn test_get_returns_none_for_missing_key() {
        let (backend, _dir) = create_test_backend();
        assert!(backend.get("prompts", "missing").unwrap().is_none());
    }

    #[test]
    fn test_set_then_get_roundtrip() {
        let (backend, _dir) = create_test_backend();
        backend.set("prompts", "a", b"payload").unwrap();
        assert_eq!(backend.get("prompts", "a").unwrap().unwrap(), b"payload");
    }

    #[test]
    fn test_namespaces_map_to_separate_trees() {
        let (backend, _dir) = create_test_backend();
        backend.set("prompts", "a", b"prompt").unwrap();
        backend.set("sessions", "a", b"session").unwrap();
        assert_eq!(backend.get("prompts", "a").unwrap().unwrap(), b"prompt");
        assert_eq!(backend.get("sessions", "a").unwrap().unwrap(), b"session");
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (backend, _dir) = create_test_backend();
        backend.set("prompts", "a", b"payload").unwrap();
        backend.delete("prompts", "a").unwrap();
        backend.delete("prompts", "a").unwrap();
        assert!(backend.get("prompts", "a").unwrap().is_none());
    }

    #[test]
    fn test_take_returns_value_once() {
        let (backend, _dir) = create_test_backend();
        backend.set("pending", "m1", b"staged").unwrap();
        assert_eq!(backend.take("pending", "m1").unwrap().unwrap(), b"staged");
        assert!(backend.take("pending", "m1").unwrap().is_none());
    }

    #[test]
    fn test_list_returns_values_in_key_order() {
        let (backend, _dir) = create_test_backend();
        backend.set("prompts", "b", b"2").unwrap();
        backend.set("prompts", "a", b"1").unwrap();
        let values = backend.list("prompts").unwrap();
        assert_eq!(values, vec![b"1".to_vec(), b"2".to_vec()]);
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempdir().expect("failed to create tempdir");
        let path = dir.path().join("reopen.db");

        {
            let backend = SledBackend::new_with_path(&path).expect("open failed");
            backend.set("sessions", "s1", b"record").unwrap();
        }

        let backend = SledBackend::new_with_path(&path).expect("reopen failed");
        assert_eq!(backend.get("sessions", "s1").unwrap().unwrap(), b"record");
    }

    #[test]
    #[serial]
    fn test_new_respects_env_override() {
        let dir = tempdir().expect("failed to create tempdir");
        let db_path = dir.path().join("override.db");
        env::set_var("PROMPTSTAGE_DB", db_path.to_string_lossy().to_string());

        let backend = SledBackend::new().expect("new failed with env override");
        backend.set("prompts", "a", b"x").unwrap();
        assert!(db_path.exists());

        env::remove_var("PROMPTSTAGE_DB");
    }
}
