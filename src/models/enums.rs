//! Enumeration types for constrained record values.

use serde::{Deserialize, Serialize};

/// Direction of a transaction or category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Money leaving an account.
    #[serde(alias = "despesa", alias = "despesas", alias = "expenses")]
    Expense,
    /// Money entering an account.
    #[serde(alias = "receita", alias = "receitas", alias = "incomes")]
    Income,
}

impl TransactionKind {
    /// Returns the lowercase wire name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
        }
    }
}

impl core::fmt::Display for TransactionKind {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement status of a transaction.
///
/// Always derived from the due and settled dates, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// A settled date is present.
    Settled,
    /// Unsettled and the due date has passed.
    Overdue,
    /// Unsettled and due today.
    DueToday,
    /// Unsettled and due in the future, or no usable due date.
    Planned,
}

impl Status {
    /// Returns a short human-readable label.
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Settled => "settled",
            Self::Overdue => "overdue",
            Self::DueToday => "due today",
            Self::Planned => "planned",
        }
    }
}

impl core::fmt::Display for Status {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// Role flag carried by a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// May change any record.
    Admin,
    /// Read-only access.
    #[default]
    #[serde(alias = "membro", alias = "viewer")]
    Member,
}
