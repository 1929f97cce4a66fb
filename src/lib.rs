//! Household finance records kept as JSON documents in a hosted git
//! repository.
//!
//! The crate has three layers:
//!
//! - [`store`]: whole-document reads and writes against a
//!   [`storage::DocumentBackend`] (the repository contents API through
//!   [`client::ContentsClient`], a local directory, or memory), with
//!   version preconditions and one reload-and-retry on conflict.
//! - [`loader`]: loads every ledger document into a [`loader::Snapshot`],
//!   creating defaults, migrating legacy collections, and normalising
//!   entries, writing only what changed.
//! - [`engine`]: pure functions over the loaded records: derived status,
//!   installments, settlement, balances, reports, and the rest.
//!
//! # Example
//!
//! ```rust
//! use repo_ledger::config::ConnectionKey;
//! use repo_ledger::engine::account_balance;
//! use repo_ledger::loader::SchemaLoader;
//! use repo_ledger::storage::InMemoryBackend;
//! use repo_ledger::store::DocumentStore;
//!
//! let loader = SchemaLoader::new(DocumentStore::new(InMemoryBackend::new()));
//! let snapshot = loader.load_all(&ConnectionKey::new("me/finances", "main"))?;
//! let accounts = snapshot.accounts();
//! let balance = account_balance(&accounts[0], &snapshot.transactions());
//! assert!(balance.is_zero());
//! # Ok::<(), repo_ledger::LedgerError>(())
//! ```

extern crate alloc;

pub mod cache;
#[cfg(feature = "http")]
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod loader;
pub mod models;
pub mod schema;
pub mod storage;
pub mod store;

pub use error::{LedgerError, Result};
pub use loader::{SchemaLoader, Snapshot};
pub use store::DocumentStore;
