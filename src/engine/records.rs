//! Record CRUD over in-memory collections.
//!
//! Transactions are soft-deleted; categories and budgets are removed
//! outright. Every function edits the slice or vector in place and the
//! caller persists the whole collection afterwards.

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{LedgerError, Result};
use crate::models::{
    Budget, BudgetId, Category, CategoryId, Transaction, TransactionId, TransactionKind,
};

/// Timestamp format for `updated_at` / `deleted_at`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Generates a sortable unique identifier:
/// `<prefix>-YYYYMMDDHHMMSS-<8 hex digits>`.
#[must_use]
pub fn new_id(prefix: &str) -> String {
    let stamp = Local::now().format("%Y%m%d%H%M%S");
    let random: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
    format!("{prefix}-{stamp}-{random}")
}

/// The local current time in the stored timestamp format.
#[must_use]
pub fn now_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Appends `item` and returns its position.
#[inline]
pub fn create<T>(list: &mut Vec<T>, item: T) -> usize {
    let position = list.len();
    list.push(item);
    position
}

/// Finds a transaction by id, including soft-deleted ones.
#[inline]
#[must_use]
pub fn find<'list>(list: &'list [Transaction], id: &TransactionId) -> Option<&'list Transaction> {
    list.iter().find(|tx| tx.id == *id)
}

/// Finds a transaction by id for editing, including soft-deleted ones.
#[inline]
pub fn find_mut<'list>(
    list: &'list mut [Transaction],
    id: &TransactionId,
) -> Option<&'list mut Transaction> {
    list.iter_mut().find(|tx| tx.id == *id)
}

/// Applies `apply` to the non-deleted transaction with `id` and stamps
/// `updated_at`. Returns whether a record was edited.
pub fn edit<F>(list: &mut [Transaction], id: &TransactionId, apply: F) -> bool
where
    F: FnOnce(&mut Transaction),
{
    let Some(tx) = list.iter_mut().find(|tx| tx.id == *id && !tx.deleted) else {
        return false;
    };
    apply(tx);
    tx.id = id.clone();
    tx.updated_at = Some(now_timestamp());
    true
}

/// Replaces the transaction with the same id as `record` and stamps
/// `updated_at`. Returns whether a record was replaced.
pub fn replace(list: &mut [Transaction], mut record: Transaction) -> bool {
    let Some(slot) = list.iter_mut().find(|tx| tx.id == record.id) else {
        return false;
    };
    record.updated_at = Some(now_timestamp());
    *slot = record;
    true
}

/// Marks the non-deleted transaction with `id` as deleted. Returns
/// whether a record was deleted.
pub fn soft_delete(list: &mut [Transaction], id: &TransactionId) -> bool {
    let Some(tx) = list.iter_mut().find(|tx| tx.id == *id && !tx.deleted) else {
        return false;
    };
    tx.deleted = true;
    tx.deleted_at = Some(now_timestamp());
    true
}

/// One above the largest transaction code in use.
#[must_use]
pub fn next_code(list: &[Transaction]) -> u32 {
    list.iter().filter_map(|tx| tx.code).max().unwrap_or(0) + 1
}

/// Appends `records`, numbering them after the largest code in use.
pub fn create_numbered(list: &mut Vec<Transaction>, records: Vec<Transaction>) {
    let mut code = next_code(list);
    for mut record in records {
        record.code = Some(code);
        code += 1;
        list.push(record);
    }
}

/// Non-deleted transactions.
#[inline]
pub fn active(list: &[Transaction]) -> impl Iterator<Item = &Transaction> {
    list.iter().filter(|tx| !tx.deleted)
}

/// Non-deleted transactions whose reference date lies in `[from, to]`.
/// Records without a readable date are skipped.
pub fn in_period(list: &[Transaction], from: NaiveDate, to: NaiveDate) -> Vec<&Transaction> {
    active(list)
        .filter(|tx| tx.reference_date().is_some_and(|day| from <= day && day <= to))
        .collect()
}

/// Adds a category, assigning the next free code when `code` is `None`.
///
/// # Errors
///
/// Returns [`LedgerError::InvalidArgument`] if the name is blank or the
/// code is already taken.
pub fn add_category(
    categories: &mut Vec<Category>,
    name: &str,
    kind: TransactionKind,
    code: Option<u32>,
) -> Result<CategoryId> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::InvalidArgument(
            "category name must not be empty".to_owned(),
        ));
    }
    let used_max = categories.iter().filter_map(|cat| cat.code).max().unwrap_or(0);
    let assigned = match code {
        Some(wanted) if categories.iter().any(|cat| cat.code == Some(wanted)) => {
            return Err(LedgerError::InvalidArgument(format!(
                "category code {wanted} is already in use"
            )));
        }
        Some(0) => {
            return Err(LedgerError::InvalidArgument(
                "category code must be positive".to_owned(),
            ));
        }
        Some(wanted) => wanted,
        None => used_max + 1,
    };
    let prefix = match kind {
        TransactionKind::Income => "cr",
        TransactionKind::Expense => "cd",
    };
    let id = CategoryId::new(new_id(prefix));
    categories.push(Category {
        id: id.clone(),
        code: Some(assigned),
        name: trimmed.to_owned(),
        kind,
        extra: serde_json::Map::new(),
    });
    Ok(id)
}

/// Removes the category with `id`. Returns whether one was removed.
pub fn remove_category(categories: &mut Vec<Category>, id: &CategoryId) -> bool {
    let before = categories.len();
    categories.retain(|cat| cat.id != *id);
    categories.len() != before
}

/// Sets the monthly limit for a category, creating an active budget if
/// none exists. Returns the budget id.
///
/// # Errors
///
/// Returns [`LedgerError::InvalidArgument`] if `limit` is negative.
pub fn set_budget(
    budgets: &mut Vec<Budget>,
    category_id: &CategoryId,
    limit: Decimal,
) -> Result<BudgetId> {
    if limit.is_sign_negative() && !limit.is_zero() {
        return Err(LedgerError::InvalidArgument(
            "budget limit must not be negative".to_owned(),
        ));
    }
    if let Some(budget) = budgets.iter_mut().find(|b| b.category_id == *category_id) {
        budget.monthly_limit = limit;
        budget.active = true;
        return Ok(budget.id.clone());
    }
    let id = BudgetId::new(new_id("o"));
    budgets.push(Budget {
        id: id.clone(),
        category_id: category_id.clone(),
        monthly_limit: limit,
        active: true,
        extra: serde_json::Map::new(),
    });
    Ok(id)
}

/// Removes the budget with `id`. Returns whether one was removed.
pub fn remove_budget(budgets: &mut Vec<Budget>, id: &BudgetId) -> bool {
    let before = budgets.len();
    budgets.retain(|budget| budget.id != *id);
    budgets.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccountId;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(id: &str, due: NaiveDate) -> Transaction {
        Transaction::new(
            TransactionId::from(id),
            TransactionKind::Expense,
            "10.00".parse().unwrap(),
            due,
            AccountId::from("c1"),
        )
    }

    #[test]
    fn new_id_has_prefix_timestamp_and_suffix() {
        let id = new_id("t");
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "t");
        assert_eq!(parts[1].len(), 14);
        assert!(parts[1].chars().all(|ch| ch.is_ascii_digit()));
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|ch| ch.is_ascii_hexdigit()));
        assert_ne!(new_id("t"), id);
    }

    #[test]
    fn create_returns_appended_item() {
        let mut list = Vec::new();
        let first = create(&mut list, tx("a", date(2024, 1, 1)));
        let second = create(&mut list, tx("b", date(2024, 1, 2)));
        assert_eq!((first, second), (0, 1));
        assert_eq!(list[second].id, TransactionId::from("b"));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn edit_updates_and_stamps() {
        let mut list = vec![tx("a", date(2024, 1, 1))];
        let edited = edit(&mut list, &TransactionId::from("a"), |record| {
            record.description = "Groceries".to_owned();
        });
        assert!(edited);
        assert_eq!(list[0].description, "Groceries");
        assert!(list[0].updated_at.is_some());
    }

    #[test]
    fn edit_keeps_id() {
        let mut list = vec![tx("a", date(2024, 1, 1))];
        let _edited = edit(&mut list, &TransactionId::from("a"), |record| {
            record.id = TransactionId::from("b");
        });
        assert_eq!(list[0].id, TransactionId::from("a"));
    }

    #[test]
    fn edit_skips_deleted_and_missing() {
        let mut list = vec![tx("a", date(2024, 1, 1))];
        list[0].deleted = true;
        assert!(!edit(&mut list, &TransactionId::from("a"), |_| {}));
        assert!(!edit(&mut list, &TransactionId::from("zzz"), |_| {}));
    }

    #[test]
    fn replace_swaps_whole_record() {
        let mut list = vec![tx("a", date(2024, 1, 1))];
        let mut updated = tx("a", date(2024, 2, 2));
        updated.amount = "99.00".parse().unwrap();
        assert!(replace(&mut list, updated));
        assert_eq!(list[0].due(), Some(date(2024, 2, 2)));
        assert!(list[0].updated_at.is_some());
        assert!(!replace(&mut list, tx("b", date(2024, 1, 1))));
    }

    #[test]
    fn soft_delete_keeps_record() {
        let mut list = vec![tx("a", date(2024, 1, 1)), tx("b", date(2024, 1, 2))];
        assert!(soft_delete(&mut list, &TransactionId::from("a")));
        assert_eq!(list.len(), 2);
        assert!(list[0].deleted);
        assert!(list[0].deleted_at.is_some());
        assert!(!soft_delete(&mut list, &TransactionId::from("a")));
        assert_eq!(active(&list).count(), 1);
        assert!(find(&list, &TransactionId::from("a")).is_some());
    }

    #[test]
    fn in_period_uses_reference_date() {
        let mut settled_late = tx("a", date(2024, 1, 31));
        settled_late.settled_date = Some("2024-02-01".to_owned());
        let mut deleted = tx("c", date(2024, 2, 10));
        deleted.deleted = true;
        let mut undated = tx("d", date(2024, 2, 10));
        undated.due_date = None;
        let list = vec![settled_late, tx("b", date(2024, 2, 15)), deleted, undated];

        let feb: Vec<&str> = in_period(&list, date(2024, 2, 1), date(2024, 2, 29))
            .iter()
            .map(|record| record.id.as_inner())
            .collect();
        assert_eq!(feb, vec!["a", "b"]);
    }

    #[test]
    fn add_category_assigns_next_code() {
        let mut categories = Vec::new();
        let first = add_category(&mut categories, "Food", TransactionKind::Expense, None).unwrap();
        let _second = add_category(&mut categories, "Bonus", TransactionKind::Income, Some(10)).unwrap();
        let _third = add_category(&mut categories, "Fun", TransactionKind::Expense, None).unwrap();
        assert_eq!(categories[0].code, Some(1));
        assert_eq!(categories[2].code, Some(11));
        assert!(first.as_inner().starts_with("cd-"));
        assert!(categories[1].id.as_inner().starts_with("cr-"));
    }

    #[test]
    fn add_category_rejects_bad_input() {
        let mut categories = Vec::new();
        let _id = add_category(&mut categories, "Food", TransactionKind::Expense, Some(3)).unwrap();
        assert!(add_category(&mut categories, "  ", TransactionKind::Expense, None).is_err());
        assert!(add_category(&mut categories, "Dup", TransactionKind::Expense, Some(3)).is_err());
        assert!(add_category(&mut categories, "Zero", TransactionKind::Expense, Some(0)).is_err());
    }

    #[test]
    fn remove_category_is_hard_delete() {
        let mut categories = Vec::new();
        let id = add_category(&mut categories, "Food", TransactionKind::Expense, None).unwrap();
        assert!(remove_category(&mut categories, &id));
        assert!(categories.is_empty());
        assert!(!remove_category(&mut categories, &id));
    }

    #[test]
    fn set_budget_upserts_by_category() {
        let mut budgets = Vec::new();
        let category = CategoryId::from("cd1");
        let id = set_budget(&mut budgets, &category, "500".parse().unwrap()).unwrap();
        let again = set_budget(&mut budgets, &category, "650".parse().unwrap()).unwrap();
        assert_eq!(id, again);
        assert_eq!(budgets.len(), 1);
        assert_eq!(budgets[0].monthly_limit, "650".parse::<Decimal>().unwrap());
        assert!(set_budget(&mut budgets, &category, "-1".parse().unwrap()).is_err());

        assert!(remove_budget(&mut budgets, &id));
        assert!(budgets.is_empty());
    }

    #[test]
    fn create_numbered_continues_codes() {
        let mut first = tx("a", date(2024, 1, 1));
        first.code = Some(9);
        let mut list = vec![first, tx("b", date(2024, 1, 2))];
        assert_eq!(next_code(&list), 10);
        create_numbered(&mut list, vec![tx("c", date(2024, 2, 1)), tx("d", date(2024, 3, 1))]);
        let codes: Vec<Option<u32>> = list.iter().map(|tx| tx.code).collect();
        assert_eq!(codes, vec![Some(9), None, Some(10), Some(11)]);
        assert_eq!(next_code(&[]), 1);
    }
}
