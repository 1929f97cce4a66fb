//! Pluggable backends holding whole JSON documents.
//!
//! A backend knows nothing about business schemas: it fetches a document
//! with its version token and replaces it under an optional version
//! precondition. [`crate::store::DocumentStore`] builds the conflict
//! recovery on top of this narrow interface, so a remote repository, a
//! local directory or an in-memory map are interchangeable.

#[cfg(feature = "storage-file")]
mod file;
mod memory;

use serde_json::Value;
use sha2::{Digest as _, Sha256};

use crate::error::Result;
use crate::models::VersionToken;

#[cfg(feature = "storage-file")]
pub use file::FileBackend;
pub use memory::{Commit, InMemoryBackend};

/// A document body together with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedDocument {
    /// Parsed JSON body.
    pub content: Value,
    /// Opaque version token (the content hash on the wire).
    pub version: VersionToken,
}

/// Blocking whole-document storage.
///
/// Implementations must be safe to share across threads; they use
/// interior mutability where they hold state.
pub trait DocumentBackend: core::fmt::Debug + Send + Sync {
    /// Fetches the document at `path`.
    ///
    /// Returns `Ok(None)` if the document does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or the stored
    /// body is not valid JSON.
    fn fetch(&self, path: &str) -> Result<Option<VersionedDocument>>;

    /// Creates or replaces the document at `path` and returns its new
    /// version token.
    ///
    /// When `version` is given the write only succeeds if the stored
    /// document is still at that version. Without it the write only
    /// succeeds if the document does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Conflict`](crate::error::LedgerError::Conflict)
    /// if the precondition does not hold, or another error if the backend
    /// fails.
    fn put(
        &self,
        path: &str,
        document: &Value,
        message: &str,
        version: Option<&VersionToken>,
    ) -> Result<VersionToken>;
}

/// Renders a document in its persisted form: pretty JSON with a
/// trailing newline.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
#[inline]
pub fn render_document(document: &Value) -> Result<String> {
    let mut text = serde_json::to_string_pretty(document)?;
    text.push('\n');
    Ok(text)
}

/// SHA-256 of `bytes` as a lowercase hex version token.
pub(crate) fn content_hash(bytes: &[u8]) -> VersionToken {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    VersionToken::new(format!("{:x}", hasher.finalize()))
}
