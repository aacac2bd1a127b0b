//! Credential persistence
//!
//! Provides trait-based storage for the finished credential bundle.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

/// Mode of a written credential file (unix)
pub const CREDS_FILE_MODE: u32 = 0o600;

/// Error type for credential store operations
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to write credentials to '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PersistenceError {
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}

/// Destination for a credential bundle
pub trait CredentialStore {
    /// Store the bundle, returning where it went
    fn persist(&self, bundle: &[u8]) -> Result<PathBuf, PersistenceError>;
}

impl<S: CredentialStore + ?Sized> CredentialStore for &S {
    fn persist(&self, bundle: &[u8]) -> Result<PathBuf, PersistenceError> {
        (**self).persist(bundle)
    }
}

// ============================================================================
// File-based Credential Store
// ============================================================================

/// Writes the bundle to a single file, readable by the owner only.
///
/// The bundle is written to a temporary file next to the target and renamed
/// into place, so the target never holds a partial bundle. The parent
/// directory must exist.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Target file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn directory(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn persist(&self, bundle: &[u8]) -> Result<PathBuf, PersistenceError> {
        let fail = |source| PersistenceError::write(&self.path, source);

        let mut file = tempfile::Builder::new()
            .prefix(".nsc-user-creds")
            .tempfile_in(self.directory())
            .map_err(fail)?;
        restrict_permissions(file.path()).map_err(fail)?;
        file.write_all(bundle).map_err(fail)?;
        file.as_file().sync_all().map_err(fail)?;
        file.persist(&self.path).map_err(|err| fail(err.error))?;

        Ok(self.path.clone())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(CREDS_FILE_MODE))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

// ============================================================================
// In-Memory Credential Store
// ============================================================================

/// Keeps every persisted bundle in memory
pub struct MemoryCredentialStore {
    path: PathBuf,
    writes: Mutex<Vec<Vec<u8>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::with_path("memory.creds")
    }

    /// Store reporting `path` as its destination
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Number of bundles persisted so far
    pub fn write_count(&self) -> usize {
        self.lock().len()
    }

    /// Most recent bundle
    pub fn last(&self) -> Option<Vec<u8>> {
        self.lock().last().cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Vec<u8>>> {
        self.writes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn persist(&self, bundle: &[u8]) -> Result<PathBuf, PersistenceError> {
        self.lock().push(bundle.to_vec());
        Ok(self.path.clone())
    }
}

impl std::fmt::Debug for MemoryCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCredentialStore")
            .field("path", &self.path)
            .field("writes", &self.write_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_writes_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user.creds");

        let store = FileCredentialStore::new(&path);
        let written = store.persist(b"bundle").unwrap();

        assert_eq!(written, path);
        assert_eq!(std::fs::read(&path).unwrap(), b"bundle");

        // Only the target remains, no temporary files
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_file_store_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user.creds");
        std::fs::write(&path, b"old contents that are longer").unwrap();

        FileCredentialStore::new(&path).persist(b"new").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user.creds");
        std::fs::write(&path, b"old").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        FileCredentialStore::new(&path).persist(b"bundle").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, CREDS_FILE_MODE);
    }

    #[test]
    fn test_file_store_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("user.creds");

        let err = FileCredentialStore::new(&path).persist(b"bundle").unwrap_err();
        assert!(err.to_string().contains("user.creds"));
        assert!(!path.exists());
    }

    #[test]
    fn test_bare_file_name_uses_current_directory() {
        let store = FileCredentialStore::new("nats-user.creds");
        assert_eq!(store.directory(), PathBuf::from("."));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryCredentialStore::with_path("x.creds");
        assert_eq!(store.write_count(), 0);

        let path = store.persist(b"one").unwrap();
        store.persist(b"two").unwrap();

        assert_eq!(path, PathBuf::from("x.creds"));
        assert_eq!(store.write_count(), 2);
        assert_eq!(store.last(), Some(b"two".to_vec()));
    }
}
