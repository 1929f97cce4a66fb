//! Composable transaction filter.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::status::today;
use crate::models::{AccountId, CategoryId, Status, Transaction, TransactionKind};

/// Criteria for selecting transactions. Unset criteria match everything.
///
/// Soft-deleted records are excluded unless
/// [`include_deleted`](Self::include_deleted) is called.
///
/// # Examples
///
/// ```rust
/// use chrono::NaiveDate;
/// use repo_ledger::engine::TransactionFilter;
/// use repo_ledger::models::{AccountId, TransactionKind};
///
/// let filter = TransactionFilter::new()
///     .date_range(
///         NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///         NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
///     )
///     .account(AccountId::from("c1"))
///     .kind(TransactionKind::Expense);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Start of the reference-date range (inclusive).
    pub date_from: Option<NaiveDate>,
    /// End of the reference-date range (inclusive).
    pub date_to: Option<NaiveDate>,
    /// Account ID.
    pub account: Option<AccountId>,
    /// Category ID.
    pub category: Option<CategoryId>,
    /// Direction.
    pub kind: Option<TransactionKind>,
    /// Derived status, evaluated against [`Self::today`].
    pub status: Option<Status>,
    /// Description substring (case-insensitive).
    pub description: Option<String>,
    /// Minimum amount (inclusive).
    pub min_amount: Option<Decimal>,
    /// Maximum amount (inclusive).
    pub max_amount: Option<Decimal>,
    /// Whether soft-deleted records match.
    pub include_deleted: bool,
    /// Date used for status matching; the local date when unset.
    pub today: Option<NaiveDate>,
}

impl TransactionFilter {
    /// Creates an empty filter that matches all non-deleted transactions.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to transactions whose reference date (settled date,
    /// else due date) lies within the given range.
    #[inline]
    #[must_use]
    pub const fn date_range(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.date_from = Some(from);
        self.date_to = Some(to);
        self
    }

    /// Restricts to transactions on the given account.
    #[inline]
    #[must_use]
    pub fn account(mut self, id: AccountId) -> Self {
        self.account = Some(id);
        self
    }

    /// Restricts to transactions in the given category.
    #[inline]
    #[must_use]
    pub fn category(mut self, id: CategoryId) -> Self {
        self.category = Some(id);
        self
    }

    /// Restricts to expenses or incomes.
    #[inline]
    #[must_use]
    pub const fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restricts to transactions with the given derived status.
    #[inline]
    #[must_use]
    pub const fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Restricts to transactions whose description contains the given
    /// substring (case-insensitive).
    #[inline]
    #[must_use]
    pub fn description<T: Into<String>>(mut self, text: T) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Restricts to transactions with amounts in `[min, max]`.
    #[inline]
    #[must_use]
    pub const fn amount_range(mut self, min: Decimal, max: Decimal) -> Self {
        self.min_amount = Some(min);
        self.max_amount = Some(max);
        self
    }

    /// Lets soft-deleted records match.
    #[inline]
    #[must_use]
    pub const fn include_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    /// Fixes the date status matching is evaluated against.
    #[inline]
    #[must_use]
    pub const fn today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Returns `true` if the transaction satisfies all set criteria.
    #[inline]
    #[must_use]
    pub fn matches(&self, tx: &Transaction) -> bool {
        (self.include_deleted || !tx.deleted)
            && self.matches_date(tx)
            && self.account.as_ref().is_none_or(|acc| tx.account_id == *acc)
            && self
                .category
                .as_ref()
                .is_none_or(|cat| tx.category_id.as_ref() == Some(cat))
            && self.kind.is_none_or(|kind| tx.kind == kind)
            && self.matches_status(tx)
            && self.matches_description(tx)
            && self.matches_amount(tx)
    }

    /// Applies the filter to a slice.
    #[inline]
    #[must_use]
    pub fn apply<'list>(&self, list: &'list [Transaction]) -> Vec<&'list Transaction> {
        list.iter().filter(|tx| self.matches(tx)).collect()
    }

    /// Checks date range criteria. Undated records fail any date bound.
    fn matches_date(&self, tx: &Transaction) -> bool {
        if self.date_from.is_none() && self.date_to.is_none() {
            return true;
        }
        tx.reference_date().is_some_and(|day| {
            self.date_from.is_none_or(|from| day >= from) && self.date_to.is_none_or(|to| day <= to)
        })
    }

    /// Checks status criteria.
    fn matches_status(&self, tx: &Transaction) -> bool {
        self.status.is_none_or(|status| {
            let today = self.today.unwrap_or_else(today);
            tx.status_on(today) == status
        })
    }

    /// Checks description criteria.
    fn matches_description(&self, tx: &Transaction) -> bool {
        self.description.as_ref().is_none_or(|text| {
            tx.description
                .to_lowercase()
                .contains(&text.to_lowercase())
        })
    }

    /// Checks amount criteria.
    fn matches_amount(&self, tx: &Transaction) -> bool {
        self.min_amount.is_none_or(|min| tx.amount >= min)
            && self.max_amount.is_none_or(|max| tx.amount <= max)
    }
}
