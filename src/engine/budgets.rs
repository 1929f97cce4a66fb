//! Monthly budget consumption.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use super::records::active;
use crate::models::{Budget, BudgetId, CategoryId, Transaction, TransactionKind};

/// Spend against one budget in one month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetUsage {
    /// Budget this row describes.
    pub budget_id: BudgetId,
    /// Category the budget limits.
    pub category_id: CategoryId,
    /// Monthly limit.
    pub limit: Decimal,
    /// Settled expenses in the month.
    pub settled_spent: Decimal,
    /// Unsettled expenses in the month.
    pub planned_spent: Decimal,
}

impl BudgetUsage {
    /// Limit minus settled and planned spend. Negative when overspent.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> Decimal {
        self.limit - self.settled_spent - self.planned_spent
    }

    /// Whether settled spend alone exceeds the limit.
    #[inline]
    #[must_use]
    pub fn is_exceeded(&self) -> bool {
        self.settled_spent > self.limit
    }
}

/// Whether `day` falls in `month` of `year`.
fn in_month(day: NaiveDate, year: i32, month: u32) -> bool {
    day.year() == year && day.month() == month
}

/// Usage of every active budget for `year`/`month`, in budget order.
///
/// Non-deleted expenses in the budget's category count when their
/// reference date falls in the month.
#[must_use]
pub fn budget_usage(
    budgets: &[Budget],
    transactions: &[Transaction],
    year: i32,
    month: u32,
) -> Vec<BudgetUsage> {
    budgets
        .iter()
        .filter(|budget| budget.active)
        .map(|budget| {
            let (settled_spent, planned_spent) = active(transactions)
                .filter(|tx| {
                    tx.kind == TransactionKind::Expense
                        && tx.category_id.as_ref() == Some(&budget.category_id)
                        && tx
                            .reference_date()
                            .is_some_and(|day| in_month(day, year, month))
                })
                .fold((Decimal::ZERO, Decimal::ZERO), |(settled, planned), tx| {
                    if tx.is_settled() {
                        (settled + tx.amount, planned)
                    } else {
                        (settled, planned + tx.amount)
                    }
                });
            BudgetUsage {
                budget_id: budget.id.clone(),
                category_id: budget.category_id.clone(),
                limit: budget.monthly_limit,
                settled_spent,
                planned_spent,
            }
        })
        .collect()
}
