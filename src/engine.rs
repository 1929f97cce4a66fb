//! Pure domain logic over loaded collections.
//!
//! Nothing here performs I/O. Functions take the typed records produced
//! by [`crate::loader::SchemaLoader`] and either return derived values or
//! mutate the in-memory collection, which the caller then saves as a
//! whole document.

pub mod balance;
pub mod budgets;
pub mod filter;
pub mod goals;
pub mod installments;
pub mod permissions;
pub mod records;
pub mod recurring;
pub mod reports;
pub mod settlement;
pub mod status;

pub use balance::account_balance;
pub use filter::TransactionFilter;
pub use installments::{generate_installments, generate_installments_with_scale};
pub use settlement::{settle, unsettle};
pub use status::derive_status;
