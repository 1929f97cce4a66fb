//! Typed records stored in the ledger documents.
//!
//! Every collection member is decoded into one of these types during
//! sanitation; an entry that does not decode is dropped rather than
//! repaired. Field aliases accept the older document vocabulary so that
//! existing repositories keep loading.

mod account;
mod budget;
mod category;
mod enums;
mod goal;
mod ids;
mod legacy;
mod transaction;
mod user;

use serde::{Deserialize, Deserializer};

pub use account::{Account, DEFAULT_CURRENCY};
pub use budget::Budget;
pub use category::Category;
pub use enums::{Role, Status, TransactionKind};
pub use goal::Goal;
pub use ids::{
    AccountId, BudgetId, CategoryId, GoalId, InstallmentGroupId, TransactionId, UserId,
    VersionToken,
};
pub use legacy::{LegacyBill, LegacyEntry};
pub use transaction::{Installment, Transaction};
pub use user::User;

/// Account that records fall back to when they do not name one.
pub const DEFAULT_ACCOUNT_ID: &str = "c1";

/// Serde default for flags that are on unless stated otherwise.
pub(crate) const fn default_true() -> bool {
    true
}

/// Reads a sequence code, treating anything but a positive integer that
/// fits in `u32` as missing.
pub(crate) fn lenient_code<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_u64()
        .filter(|code| *code > 0)
        .and_then(|code| u32::try_from(code).ok()))
}
