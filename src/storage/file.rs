//! JSON-file-based document backend.
//!
//! Stores each document as a pretty-printed JSON file under a
//! configurable directory (default: `$XDG_DATA_HOME/repo-ledger/`), using
//! the document path as the relative file path.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use super::{DocumentBackend, VersionedDocument, content_hash, render_document};
use crate::error::{LedgerError, Result};
use crate::models::VersionToken;

/// Application name used for the XDG data directory.
const APP_NAME: &str = "repo-ledger";

/// Sentinel file used for cross-process file locking.
const LOCK_FILE: &str = "ledger.lock";

/// Directory-backed document storage.
///
/// The version token of a document is the SHA-256 of its file bytes, so
/// an edit made by hand outside the library is detected as a conflict.
///
/// # Concurrency
///
/// Thread safety within a single process is provided by an in-process
/// [`Mutex`]. Cross-process safety is achieved via an advisory file lock
/// on `ledger.lock` (using [`std::fs::File::lock`] /
/// [`std::fs::File::lock_shared`]). Reads take a shared lock, writes an
/// exclusive one, and every write goes to a temporary file that is then
/// renamed over the target.
///
/// # File layout
///
/// ```text
/// <dir>/
///   ledger.lock           (cross-process lock sentinel)
///   data/
///     contas.json
///     transacoes.json
///     ...
/// ```
#[derive(Debug)]
pub struct FileBackend {
    /// Root directory containing all documents.
    dir: PathBuf,
    /// Mutex serializing concurrent in-process access.
    lock: Mutex<()>,
    /// Sentinel file for cross-process advisory locking.
    lock_file: fs::File,
}

impl FileBackend {
    /// Creates a backend rooted at the given directory.
    ///
    /// Creates the directory (and parents) if it does not exist and opens
    /// (or creates) the lock sentinel.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the lock
    /// file cannot be opened.
    #[inline]
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).map_err(storage_io_error)?;
        let lock_file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))
            .map_err(storage_io_error)?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
            lock_file,
        })
    }

    /// Returns the default XDG-compliant data directory for this
    /// application.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform data directory cannot be
    /// determined.
    #[inline]
    pub fn default_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|data_path| data_path.join(APP_NAME))
            .ok_or_else(|| {
                LedgerError::Storage("could not determine platform data directory".into())
            })
    }

    /// Resolves a document path inside the root directory, rejecting
    /// absolute paths and parent components.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let safe = !path.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if safe {
            Ok(self.dir.join(relative))
        } else {
            Err(LedgerError::InvalidArgument(format!(
                "document path must be relative and stay inside the store: {path:?}"
            )))
        }
    }

    /// Acquires the in-process guard and a shared file lock, executes
    /// `op`, then releases the file lock.
    fn with_shared_lock<R, F: FnOnce() -> Result<R>>(&self, op: F) -> Result<R> {
        let _guard: MutexGuard<'_, ()> = self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        self.lock_file.lock_shared().map_err(storage_io_error)?;
        let result = op();
        if let Err(err) = self.lock_file.unlock()
            && result.is_ok()
        {
            return Err(storage_io_error(err));
        }
        result
    }

    /// Acquires the in-process guard and an exclusive file lock, executes
    /// `op`, then releases the file lock.
    fn with_exclusive_lock<R, F: FnOnce() -> Result<R>>(&self, op: F) -> Result<R> {
        let _guard: MutexGuard<'_, ()> = self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        self.lock_file.lock().map_err(storage_io_error)?;
        let result = op();
        if let Err(err) = self.lock_file.unlock()
            && result.is_ok()
        {
            return Err(storage_io_error(err));
        }
        result
    }

    /// Reads a document file. Returns `None` if it does not exist.
    fn read_document(path: &str, file: &Path) -> Result<Option<VersionedDocument>> {
        let bytes = match fs::read(file) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(storage_io_error(err)),
        };
        let content = serde_json::from_slice(&bytes).map_err(|err| LedgerError::Encoding {
            path: path.to_owned(),
            reason: err.to_string(),
        })?;
        Ok(Some(VersionedDocument {
            content,
            version: content_hash(&bytes),
        }))
    }

    /// Atomically writes a document file (write-to-tmp then rename).
    fn write_document(file: &Path, text: &str) -> Result<()> {
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).map_err(storage_io_error)?;
        }
        let mut tmp_name = file.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);
        fs::write(&tmp_path, text).map_err(storage_io_error)?;
        fs::rename(&tmp_path, file).map_err(storage_io_error)?;
        Ok(())
    }
}

/// Wraps an I/O error into a [`LedgerError::Storage`].
fn storage_io_error(err: std::io::Error) -> LedgerError {
    LedgerError::Storage(Box::new(err))
}

/// Wraps a mutex poison error into a [`LedgerError::Storage`].
fn lock_poison_error<T>(err: &std::sync::PoisonError<T>) -> LedgerError {
    LedgerError::Storage(err.to_string().into())
}

impl DocumentBackend for FileBackend {
    #[inline]
    #[tracing::instrument(skip_all, fields(path = %path))]
    fn fetch(&self, path: &str) -> Result<Option<VersionedDocument>> {
        let file = self.resolve(path)?;
        self.with_shared_lock(|| Self::read_document(path, &file))
    }

    #[inline]
    #[tracing::instrument(skip_all, fields(path = %path))]
    fn put(
        &self,
        path: &str,
        document: &Value,
        message: &str,
        version: Option<&VersionToken>,
    ) -> Result<VersionToken> {
        let file = self.resolve(path)?;
        let text = render_document(document)?;
        self.with_exclusive_lock(|| {
            let current = Self::read_document(path, &file)?.map(|doc| doc.version);
            if current.as_ref() != version {
                tracing::debug!("version precondition failed");
                return Err(LedgerError::Conflict {
                    path: path.to_owned(),
                });
            }
            Self::write_document(&file, &text)?;
            tracing::debug!(message, "document written");
            Ok(content_hash(text.as_bytes()))
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    /// Helper to create a [`FileBackend`] in a temporary directory.
    fn temp_backend() -> (FileBackend, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().to_path_buf()).unwrap();
        (backend, dir)
    }

    #[test]
    fn fetch_missing_returns_none() {
        let (backend, _dir) = temp_backend();
        assert!(backend.fetch("data/contas.json").unwrap().is_none());
    }

    #[test]
    fn put_then_fetch_roundtrip() {
        let (backend, dir) = temp_backend();
        let doc = json!([{"id": "c1", "name": "Checking", "initial_balance": 10.5}]);
        let version = backend
            .put("data/contas.json", &doc, "create accounts", None)
            .unwrap();

        let fetched = backend.fetch("data/contas.json").unwrap().unwrap();
        assert_eq!(fetched.content, doc);
        assert_eq!(fetched.version, version);

        let on_disk = fs::read_to_string(dir.path().join("data/contas.json")).unwrap();
        assert!(on_disk.ends_with('\n'));
        assert!(on_disk.contains("\n    \"id\": \"c1\""));
    }

    #[test]
    fn stale_version_conflicts() {
        let (backend, _dir) = temp_backend();
        let first = backend.put("data/metas.json", &json!([]), "create", None).unwrap();
        let second = backend
            .put("data/metas.json", &json!([{"id": "g"}]), "update", Some(&first))
            .unwrap();
        assert_ne!(first, second);

        let err = backend
            .put("data/metas.json", &json!([]), "stale", Some(&first))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict { .. }));
    }

    #[test]
    fn create_over_existing_conflicts() {
        let (backend, _dir) = temp_backend();
        let _version = backend.put("a.json", &json!([]), "create", None).unwrap();
        let err = backend.put("a.json", &json!([]), "again", None).unwrap_err();
        assert!(matches!(err, LedgerError::Conflict { .. }));
    }

    #[test]
    fn hand_edit_is_detected() {
        let (backend, dir) = temp_backend();
        let version = backend.put("a.json", &json!([]), "create", None).unwrap();
        fs::write(dir.path().join("a.json"), "[1]\n").unwrap();
        let err = backend
            .put("a.json", &json!([2]), "update", Some(&version))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict { .. }));
    }

    #[test]
    fn invalid_json_is_an_encoding_error() {
        let (backend, dir) = temp_backend();
        fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        let err = backend.fetch("broken.json").unwrap_err();
        assert!(matches!(err, LedgerError::Encoding { .. }));
    }

    #[test]
    fn escaping_paths_are_rejected() {
        let (backend, _dir) = temp_backend();
        assert!(matches!(
            backend.fetch("../outside.json"),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            backend.fetch("/etc/passwd"),
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(backend.fetch(""), Err(LedgerError::InvalidArgument(_))));
    }

    #[test]
    fn default_dir_ends_with_app_name() {
        if let Ok(dir) = FileBackend::default_dir() {
            assert!(dir.ends_with(APP_NAME));
        }
    }
}
