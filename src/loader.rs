//! Loading, normalising, and saving the full set of ledger documents.
//!
//! [`SchemaLoader::load_all`] brings every core document into a
//! [`Snapshot`], creating missing documents from their defaults, migrating
//! the legacy collections once, dropping invalid entries, and assigning
//! sequence codes. Each normalisation pass writes only when it changed
//! something, so loading a clean repository never commits.

use alloc::collections::BTreeMap;
use core::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cache::{DEFAULT_TTL, ReadCache};
use crate::config::ConnectionKey;
use crate::error::Result;
use crate::models::{Account, Budget, Category, Goal, Transaction, User, UserId, VersionToken};
use crate::schema::{
    DocumentPath, LegacyCollections, assign_codes, decode_entries, migrate_legacy,
    sanitize_collection,
};
use crate::storage::DocumentBackend;
use crate::store::DocumentStore;

/// Collections whose entries are validated on load.
const SANITIZED: [DocumentPath; 4] = [
    DocumentPath::Transactions,
    DocumentPath::Categories,
    DocumentPath::Goals,
    DocumentPath::Budgets,
];

/// A document as loaded, with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDocument {
    /// Document content.
    pub content: Value,
    /// Version token for the next write.
    pub version: VersionToken,
}

/// Every core document of one repository and branch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Documents by path.
    documents: BTreeMap<DocumentPath, LoadedDocument>,
}

impl Snapshot {
    /// Returns the loaded document at `path`.
    #[inline]
    #[must_use]
    pub fn get(&self, path: DocumentPath) -> Option<&LoadedDocument> {
        self.documents.get(&path)
    }

    /// Version token of the document at `path`.
    #[inline]
    #[must_use]
    pub fn version(&self, path: DocumentPath) -> Option<&VersionToken> {
        self.documents.get(&path).map(|doc| &doc.version)
    }

    /// Iterates over all documents in path order.
    #[inline]
    pub fn documents(&self) -> impl Iterator<Item = (DocumentPath, &LoadedDocument)> {
        self.documents.iter().map(|(path, doc)| (*path, doc))
    }

    /// Decodes the records of the collection at `path`.
    #[must_use]
    pub fn records<T: DeserializeOwned>(&self, path: DocumentPath) -> Vec<T> {
        self.get(path)
            .map(|doc| decode_entries(path, &doc.content))
            .unwrap_or_default()
    }

    /// Unified transactions, soft-deleted ones included.
    #[inline]
    #[must_use]
    pub fn transactions(&self) -> Vec<Transaction> {
        self.records(DocumentPath::Transactions)
    }

    /// Accounts.
    #[inline]
    #[must_use]
    pub fn accounts(&self) -> Vec<Account> {
        self.records(DocumentPath::Accounts)
    }

    /// Categories.
    #[inline]
    #[must_use]
    pub fn categories(&self) -> Vec<Category> {
        self.records(DocumentPath::Categories)
    }

    /// Goals.
    #[inline]
    #[must_use]
    pub fn goals(&self) -> Vec<Goal> {
        self.records(DocumentPath::Goals)
    }

    /// Budgets.
    #[inline]
    #[must_use]
    pub fn budgets(&self) -> Vec<Budget> {
        self.records(DocumentPath::Budgets)
    }

    /// Users.
    #[inline]
    #[must_use]
    pub fn users(&self) -> Vec<User> {
        self.records(DocumentPath::Users)
    }

    /// Looks up a user by id.
    #[must_use]
    pub fn user(&self, id: &UserId) -> Option<User> {
        self.users().into_iter().find(|user| user.id == *id)
    }

    /// Replaces a document after a successful write.
    fn set(&mut self, path: DocumentPath, content: Value, version: VersionToken) {
        let _old = self
            .documents
            .insert(path, LoadedDocument { content, version });
    }
}

/// Loads and saves the ledger documents through a [`DocumentStore`].
#[derive(Debug)]
pub struct SchemaLoader<B> {
    /// Document store.
    store: DocumentStore<B>,
    /// Recent snapshots by connection.
    cache: ReadCache<ConnectionKey, Snapshot>,
    /// User named in commit messages.
    author: Option<UserId>,
}

impl<B: DocumentBackend> SchemaLoader<B> {
    /// Creates a loader with the default one-minute cache.
    #[inline]
    #[must_use]
    pub fn new(store: DocumentStore<B>) -> Self {
        Self::with_cache_ttl(store, DEFAULT_TTL)
    }

    /// Creates a loader whose snapshots stay cached for `ttl`.
    #[inline]
    #[must_use]
    pub fn with_cache_ttl(store: DocumentStore<B>, ttl: Duration) -> Self {
        Self {
            store,
            cache: ReadCache::new(ttl),
            author: None,
        }
    }

    /// Prefixes commit messages with `[<user id>]`.
    #[inline]
    #[must_use]
    pub fn with_author(mut self, author: UserId) -> Self {
        self.author = Some(author);
        self
    }

    /// Returns the underlying store.
    #[inline]
    #[must_use]
    pub const fn store(&self) -> &DocumentStore<B> {
        &self.store
    }

    /// Returns the snapshot cache.
    #[inline]
    #[must_use]
    pub const fn cache(&self) -> &ReadCache<ConnectionKey, Snapshot> {
        &self.cache
    }

    /// Loads every core document, served from the cache while fresh.
    ///
    /// # Errors
    ///
    /// Propagates any store error unchanged.
    #[tracing::instrument(skip_all, fields(key = %key))]
    pub fn load_all(&self, key: &ConnectionKey) -> Result<Snapshot> {
        if let Some(snapshot) = self.cache.get(key) {
            tracing::debug!("snapshot served from cache");
            return Ok(snapshot);
        }
        let snapshot = self.reload()?;
        self.cache.insert(key.clone(), snapshot.clone());
        Ok(snapshot)
    }

    /// Loads every core document from the store, bypassing the cache.
    ///
    /// # Errors
    ///
    /// Propagates any store error unchanged.
    pub fn reload(&self) -> Result<Snapshot> {
        let mut snapshot = Snapshot::default();
        for path in DocumentPath::CORE {
            let (content, version) = self
                .store
                .exists_or_create(path.as_str(), &path.default_content())?;
            snapshot.set(path, content, version);
        }
        self.migrate(&mut snapshot)?;
        self.sanitize(&mut snapshot)?;
        self.number_records(&mut snapshot)?;
        Ok(snapshot)
    }

    /// Maps the legacy collections into transactions while the unified
    /// collection is still empty.
    fn migrate(&self, snapshot: &mut Snapshot) -> Result<()> {
        let unified_is_empty = snapshot
            .get(DocumentPath::Transactions)
            .is_some_and(|doc| doc.content.as_array().is_some_and(Vec::is_empty));
        if !unified_is_empty {
            return Ok(());
        }
        let read = |path: DocumentPath| -> Result<Value> {
            Ok(self.store.read(path.as_str(), None)?.0)
        };
        let legacy = LegacyCollections {
            expenses: read(DocumentPath::LegacyExpenses)?,
            incomes: read(DocumentPath::LegacyIncomes)?,
            payables: read(DocumentPath::LegacyPayables)?,
            receivables: read(DocumentPath::LegacyReceivables)?,
        };
        let migrated = migrate_legacy(&legacy);
        if migrated.is_empty() {
            return Ok(());
        }
        tracing::info!(records = migrated.len(), "migrating legacy collections");
        let content = serde_json::to_value(&migrated)?;
        let message = format!(
            "migrate {} legacy records into {}",
            migrated.len(),
            DocumentPath::Transactions
        );
        let _version = self.commit(snapshot, DocumentPath::Transactions, content, &message)?;
        Ok(())
    }

    /// Drops invalid entries and flattens grouped categories.
    fn sanitize(&self, snapshot: &mut Snapshot) -> Result<()> {
        for path in SANITIZED {
            let Some(doc) = snapshot.get(path) else {
                continue;
            };
            let (content, changed) = sanitize_collection(path, doc.content.clone());
            if changed {
                tracing::info!(%path, "committing sanitized collection");
                let _version =
                    self.commit(snapshot, path, content, &format!("sanitize {path}"))?;
            }
        }
        Ok(())
    }

    /// Gives every coded record a unique code.
    fn number_records(&self, snapshot: &mut Snapshot) -> Result<()> {
        for path in [DocumentPath::Transactions, DocumentPath::Categories] {
            let Some(doc) = snapshot.get(path) else {
                continue;
            };
            let mut content = doc.content.clone();
            if assign_codes(&mut content) {
                tracing::info!(%path, "committing assigned codes");
                let _version =
                    self.commit(snapshot, path, content, &format!("assign codes in {path}"))?;
            }
        }
        Ok(())
    }

    /// Writes `content` at the snapshot's version and updates the snapshot.
    fn commit(
        &self,
        snapshot: &mut Snapshot,
        path: DocumentPath,
        content: Value,
        message: &str,
    ) -> Result<VersionToken> {
        let version =
            self.store
                .write(path.as_str(), &content, message, snapshot.version(path))?;
        snapshot.set(path, content, version.clone());
        Ok(version)
    }

    /// Commit message with the author prefix, if any.
    fn message(&self, message: &str) -> String {
        self.author
            .as_ref()
            .map_or_else(|| message.to_owned(), |author| format!("[{author}] {message}"))
    }

    /// Saves `content` as the document at `path`, updates `snapshot`, and
    /// clears the read cache.
    ///
    /// # Errors
    ///
    /// Propagates store errors, including [`LedgerError::Conflict`] when
    /// the single retry fails.
    ///
    /// [`LedgerError::Conflict`]: crate::error::LedgerError::Conflict
    #[tracing::instrument(skip_all, fields(path = %path))]
    pub fn save(
        &self,
        snapshot: &mut Snapshot,
        path: DocumentPath,
        content: Value,
        message: &str,
    ) -> Result<VersionToken> {
        let message = self.message(message);
        let result = self.commit(snapshot, path, content, &message);
        self.cache.clear();
        result
    }

    /// Serialises `items` and saves them as the collection at `path`.
    ///
    /// # Errors
    ///
    /// See [`Self::save`]; also fails if an item cannot be serialised.
    pub fn save_collection<T: Serialize>(
        &self,
        snapshot: &mut Snapshot,
        path: DocumentPath,
        items: &[T],
        message: &str,
    ) -> Result<VersionToken> {
        let content = serde_json::to_value(items)?;
        self.save(snapshot, path, content, message)
    }
}
