//! In-memory document backend for testing.
//!
//! Provides [`InMemoryBackend`], a thread-safe map of documents that
//! enforces the same version preconditions as the remote store and keeps
//! a log of every commit.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use super::{DocumentBackend, VersionedDocument, content_hash, render_document};
use crate::error::{LedgerError, Result};
use crate::models::VersionToken;

/// One successful write recorded by [`InMemoryBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Document path.
    pub path: String,
    /// Commit message.
    pub message: String,
    /// Version produced by the write.
    pub version: VersionToken,
}

/// Thread-safe in-memory document backend.
///
/// Version tokens are SHA-256 hashes of the rendered document, except for
/// documents placed with [`InMemoryBackend::seed`], which keep the token
/// they were seeded with.
///
/// # Example
///
/// ```rust
/// use repo_ledger::storage::InMemoryBackend;
/// use repo_ledger::store::DocumentStore;
///
/// let store = DocumentStore::new(InMemoryBackend::new());
/// let (doc, version) = store.read("data/metas.json", None).unwrap();
/// assert!(doc.is_null());
/// assert!(version.is_none());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    /// All state behind a single mutex for thread-safe interior mutability.
    inner: Mutex<Inner>,
}

/// Inner mutable state.
#[derive(Debug, Default)]
struct Inner {
    /// Stored documents by path.
    documents: HashMap<String, VersionedDocument>,
    /// Successful writes in order.
    commits: Vec<Commit>,
    /// Number of fetch calls served.
    fetches: usize,
}

impl InMemoryBackend {
    /// Creates a new empty backend.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a document at `path` with a chosen version token, as if
    /// another writer had committed it. Not recorded as a commit.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    #[inline]
    pub fn seed<V: Into<VersionToken>>(&self, path: &str, content: Value, version: V) -> Result<()> {
        self.with_lock(|inner| {
            let _old = inner.documents.insert(
                path.to_owned(),
                VersionedDocument {
                    content,
                    version: version.into(),
                },
            );
        })
    }

    /// Returns the current body of `path`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    #[inline]
    pub fn document(&self, path: &str) -> Result<Option<Value>> {
        self.with_lock(|inner| inner.documents.get(path).map(|doc| doc.content.clone()))
    }

    /// Returns every successful write so far, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    #[inline]
    pub fn commits(&self) -> Result<Vec<Commit>> {
        self.with_lock(|inner| inner.commits.clone())
    }

    /// Returns how many fetches have been served.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    #[inline]
    pub fn fetch_count(&self) -> Result<usize> {
        self.with_lock(|inner| inner.fetches)
    }

    /// Acquires the inner lock and applies a closure.
    fn with_lock<R, F: FnOnce(&mut Inner) -> R>(&self, op: F) -> Result<R> {
        let mut inner = self.inner.lock().map_err(|err| lock_error(&err))?;
        Ok(op(&mut inner))
    }
}

/// Wraps a mutex poison error into a [`LedgerError::Storage`].
fn lock_error<T>(err: &std::sync::PoisonError<T>) -> LedgerError {
    LedgerError::Storage(err.to_string().into())
}

impl DocumentBackend for InMemoryBackend {
    #[inline]
    fn fetch(&self, path: &str) -> Result<Option<VersionedDocument>> {
        self.with_lock(|inner| {
            inner.fetches += 1;
            inner.documents.get(path).cloned()
        })
    }

    #[inline]
    fn put(
        &self,
        path: &str,
        document: &Value,
        message: &str,
        version: Option<&VersionToken>,
    ) -> Result<VersionToken> {
        let rendered = render_document(document)?;
        self.with_lock(|inner| {
            let current = inner.documents.get(path).map(|doc| &doc.version);
            if current != version {
                tracing::debug!(path, "version precondition failed");
                return Err(LedgerError::Conflict {
                    path: path.to_owned(),
                });
            }
            let new_version = content_hash(rendered.as_bytes());
            let _old = inner.documents.insert(
                path.to_owned(),
                VersionedDocument {
                    content: document.clone(),
                    version: new_version.clone(),
                },
            );
            inner.commits.push(Commit {
                path: path.to_owned(),
                message: message.to_owned(),
                version: new_version.clone(),
            });
            Ok(new_version)
        })?
    }
}
