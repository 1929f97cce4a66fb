//! Period aggregates used by dashboards.
//!
//! Every report places a transaction on its reference date (settled date,
//! else due date) and ignores soft-deleted records.

use alloc::collections::BTreeMap;
use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::records::in_period;
use crate::models::{Category, CategoryId, Transaction, TransactionKind};

/// Label for expenses whose category is missing or unknown.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Realized and planned totals over a period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeriodSummary {
    /// Settled incomes.
    pub realized_income: Decimal,
    /// Settled expenses.
    pub realized_expense: Decimal,
    /// Unsettled incomes.
    pub planned_income: Decimal,
    /// Unsettled expenses.
    pub planned_expense: Decimal,
}

impl PeriodSummary {
    /// Realized income minus realized expense.
    #[inline]
    #[must_use]
    pub fn realized_balance(&self) -> Decimal {
        self.realized_income - self.realized_expense
    }

    /// Balance including planned entries.
    #[inline]
    #[must_use]
    pub fn projected_balance(&self) -> Decimal {
        self.realized_balance() + self.planned_income - self.planned_expense
    }
}

/// Summarises the transactions whose reference date falls in `[from, to]`.
#[must_use]
pub fn period_summary(list: &[Transaction], from: NaiveDate, to: NaiveDate) -> PeriodSummary {
    in_period(list, from, to)
        .into_iter()
        .fold(PeriodSummary::default(), |mut acc, tx| {
            let slot = match (tx.kind, tx.is_settled()) {
                (TransactionKind::Income, true) => &mut acc.realized_income,
                (TransactionKind::Expense, true) => &mut acc.realized_expense,
                (TransactionKind::Income, false) => &mut acc.planned_income,
                (TransactionKind::Expense, false) => &mut acc.planned_expense,
            };
            *slot += tx.amount;
            acc
        })
}

/// Expense totals per category name in `[from, to]`, largest first.
///
/// Ties are ordered by name. Expenses without a known category are grouped
/// under [`UNCATEGORIZED`].
#[must_use]
pub fn expenses_by_category(
    list: &[Transaction],
    from: NaiveDate,
    to: NaiveDate,
    categories: &[Category],
) -> Vec<(String, Decimal)> {
    let names: HashMap<&CategoryId, &str> = categories
        .iter()
        .map(|cat| (&cat.id, cat.name.as_str()))
        .collect();
    let mut totals = HashMap::<String, Decimal>::new();
    for tx in in_period(list, from, to) {
        if tx.kind != TransactionKind::Expense {
            continue;
        }
        let name = tx
            .category_id
            .as_ref()
            .and_then(|id| names.get(id).copied())
            .unwrap_or(UNCATEGORIZED);
        *totals.entry(name.to_owned()).or_default() += tx.amount;
    }
    let mut rows: Vec<(String, Decimal)> = totals.into_iter().collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    rows
}

/// Cumulative signed totals per reference date in `[from, to]`.
///
/// Only settled transactions count unless `include_planned` is set.
#[must_use]
pub fn running_balance(
    list: &[Transaction],
    from: NaiveDate,
    to: NaiveDate,
    include_planned: bool,
) -> Vec<(NaiveDate, Decimal)> {
    let mut per_day = BTreeMap::<NaiveDate, Decimal>::new();
    for tx in in_period(list, from, to) {
        if !include_planned && !tx.is_settled() {
            continue;
        }
        if let Some(day) = tx.reference_date() {
            *per_day.entry(day).or_default() += tx.signed_amount();
        }
    }
    let mut total = Decimal::ZERO;
    per_day
        .into_iter()
        .map(|(day, delta)| {
            total += delta;
            (day, total)
        })
        .collect()
}

/// Month key (`YYYY-MM`) of a date, used for monthly grouping.
#[inline]
#[must_use]
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountId, TransactionId};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dec(raw: &str) -> Decimal {
        raw.parse().unwrap()
    }

    fn tx(
        id: &str,
        kind: TransactionKind,
        amount: &str,
        due: NaiveDate,
        settled: Option<NaiveDate>,
    ) -> Transaction {
        let mut tx = Transaction::new(
            TransactionId::from(id),
            kind,
            dec(amount),
            due,
            AccountId::from("c1"),
        );
        tx.settled_date = settled.map(|day| day.to_string());
        tx
    }

    fn category(id: &str, name: &str) -> Category {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": name,
            "kind": "expense",
        }))
        .unwrap()
    }

    fn sample() -> Vec<Transaction> {
        let mut food = tx("a", TransactionKind::Expense, "80", date(2024, 6, 3), Some(date(2024, 6, 3)));
        food.category_id = Some(CategoryId::from("cd2"));
        let mut rent = tx("b", TransactionKind::Expense, "1500", date(2024, 6, 10), None);
        rent.category_id = Some(CategoryId::from("cd1"));
        let mut gone = tx("c", TransactionKind::Expense, "999", date(2024, 6, 4), None);
        gone.deleted = true;
        vec![
            tx("s", TransactionKind::Income, "3000", date(2024, 6, 1), Some(date(2024, 6, 1))),
            food,
            rent,
            gone,
            tx("f", TransactionKind::Income, "400", date(2024, 6, 20), None),
            tx("x", TransactionKind::Expense, "20", date(2024, 6, 3), Some(date(2024, 6, 3))),
            // settled early: counts in May
            tx("m", TransactionKind::Expense, "5", date(2024, 6, 2), Some(date(2024, 5, 31))),
        ]
    }

    #[test]
    fn summary_splits_realized_and_planned() {
        let summary = period_summary(&sample(), date(2024, 6, 1), date(2024, 6, 30));
        assert_eq!(summary.realized_income, dec("3000"));
        assert_eq!(summary.realized_expense, dec("100"));
        assert_eq!(summary.planned_income, dec("400"));
        assert_eq!(summary.planned_expense, dec("1500"));
        assert_eq!(summary.realized_balance(), dec("2900"));
        assert_eq!(summary.projected_balance(), dec("1800"));
    }

    #[test]
    fn categories_sorted_descending_with_uncategorized() {
        let cats = vec![category("cd1", "Housing"), category("cd2", "Food")];
        let rows = expenses_by_category(&sample(), date(2024, 6, 1), date(2024, 6, 30), &cats);
        assert_eq!(
            rows,
            vec![
                ("Housing".to_owned(), dec("1500")),
                ("Food".to_owned(), dec("80")),
                (UNCATEGORIZED.to_owned(), dec("20")),
            ]
        );
    }

    #[test]
    fn running_balance_accumulates_by_day() {
        let settled = running_balance(&sample(), date(2024, 6, 1), date(2024, 6, 30), false);
        assert_eq!(
            settled,
            vec![(date(2024, 6, 1), dec("3000")), (date(2024, 6, 3), dec("2900"))]
        );
        let planned = running_balance(&sample(), date(2024, 6, 1), date(2024, 6, 30), true);
        assert_eq!(planned.last(), Some(&(date(2024, 6, 20), dec("1800"))));
    }

    #[test]
    fn month_key_format() {
        assert_eq!(month_key(date(2024, 3, 9)), "2024-03");
    }
}
