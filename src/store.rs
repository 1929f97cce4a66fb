//! Whole-document reads and writes with conflict recovery.
//!
//! [`DocumentStore`] adds the document-level contract on top of a
//! [`DocumentBackend`]: create-on-read with a default, and exactly one
//! reload-and-retry when a write's version precondition fails.

use serde_json::Value;

use crate::error::{LedgerError, Result};
use crate::models::VersionToken;
use crate::storage::DocumentBackend;

/// Document-level operations over any backend.
#[derive(Debug)]
pub struct DocumentStore<B> {
    /// Underlying backend.
    backend: B,
}

#[cfg(feature = "http")]
impl DocumentStore<crate::client::ContentsClient> {
    /// Connects to the repository described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    #[inline]
    pub fn connect(
        config: &crate::config::ConnectionConfig,
        policy: crate::config::RetryPolicy,
    ) -> Result<Self> {
        Ok(Self::new(crate::client::ContentsClient::from_config(
            config, policy,
        )?))
    }
}

impl<B: DocumentBackend> DocumentStore<B> {
    /// Wraps a backend.
    #[inline]
    #[must_use]
    pub const fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the underlying backend.
    #[inline]
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Reads the document at `path`.
    ///
    /// If the document is absent and `default` is given, the default is
    /// written first and re-read to obtain a fresh version token. If it
    /// is absent without a default, returns `(Value::Null, None)`.
    ///
    /// # Errors
    ///
    /// Propagates backend errors such as
    /// [`LedgerError::AccessDenied`] and [`LedgerError::Store`].
    #[tracing::instrument(skip_all, fields(path = %path))]
    pub fn read(&self, path: &str, default: Option<&Value>) -> Result<(Value, Option<VersionToken>)> {
        if let Some(doc) = self.backend.fetch(path)? {
            return Ok((doc.content, Some(doc.version)));
        }
        let Some(initial) = default else {
            tracing::debug!("document absent, no default");
            return Ok((Value::Null, None));
        };

        tracing::info!("creating document from default");
        let created = match self
            .backend
            .put(path, initial, &format!("create {path}"), None)
        {
            Ok(version) => Some(version),
            // Someone else created it first; their copy wins.
            Err(LedgerError::Conflict { .. }) => None,
            Err(err) => return Err(err),
        };
        Ok(self.backend.fetch(path)?.map_or_else(
            || (initial.clone(), created),
            |doc| (doc.content, Some(doc.version)),
        ))
    }

    /// Same as [`Self::read`] with a default.
    ///
    /// # Errors
    ///
    /// See [`Self::read`].
    #[inline]
    pub fn exists_or_create(&self, path: &str, default: &Value) -> Result<(Value, VersionToken)> {
        match self.read(path, Some(default))? {
            (content, Some(version)) => Ok((content, version)),
            (_, None) => Err(LedgerError::Store {
                path: path.to_owned(),
                status: 0,
                message: "document was created but no version was returned".to_owned(),
            }),
        }
    }

    /// Writes `document` to `path` under an optional version precondition
    /// and returns the new version token.
    ///
    /// On a precondition failure the current version is re-read and the
    /// same document is written once more with it. The retried write
    /// replaces whatever the other writer committed.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Conflict`] if the retry fails as well, or
    /// any other backend error.
    #[tracing::instrument(skip_all, fields(path = %path))]
    pub fn write(
        &self,
        path: &str,
        document: &Value,
        message: &str,
        version: Option<&VersionToken>,
    ) -> Result<VersionToken> {
        match self.backend.put(path, document, message, version) {
            Ok(new_version) => Ok(new_version),
            Err(LedgerError::Conflict { .. }) => {
                tracing::warn!("version conflict, reloading and retrying once");
                let fresh = self.backend.fetch(path)?.map(|doc| doc.version);
                self.backend.put(path, document, message, fresh.as_ref())
            }
            Err(err) => Err(err),
        }
    }

    /// Reads the document, applies `apply` to it and writes it back.
    ///
    /// On a precondition failure the document is re-read and `apply` is
    /// run again on the fresh copy before the single retry, so concurrent
    /// edits to other parts of the document are kept.
    ///
    /// # Errors
    ///
    /// Returns an error from `apply`, [`LedgerError::Conflict`] if the
    /// retry fails as well, or any other backend error.
    #[tracing::instrument(skip_all, fields(path = %path))]
    pub fn update<F>(
        &self,
        path: &str,
        default: Option<&Value>,
        message: &str,
        mut apply: F,
    ) -> Result<(Value, VersionToken)>
    where
        F: FnMut(&mut Value) -> Result<()>,
    {
        let (mut content, version) = self.read(path, default)?;
        apply(&mut content)?;
        match self.backend.put(path, &content, message, version.as_ref()) {
            Ok(new_version) => Ok((content, new_version)),
            Err(LedgerError::Conflict { .. }) => {
                tracing::warn!("version conflict, re-applying edit to fresh copy");
                let (mut fresh, fresh_version) = self.read(path, default)?;
                apply(&mut fresh)?;
                let new_version = self
                    .backend
                    .put(path, &fresh, message, fresh_version.as_ref())?;
                Ok((fresh, new_version))
            }
            Err(err) => Err(err),
        }
    }
}
