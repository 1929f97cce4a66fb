//! Savings goal progress and income distribution.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use super::installments::DEFAULT_SCALE;
use crate::models::{Goal, GoalId};

/// Fraction of the target reached, clamped to `0..=1`.
///
/// A goal without a positive target has no progress.
#[must_use]
pub fn progress(goal: &Goal) -> Decimal {
    if goal.target_amount <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (goal.accumulated_amount / goal.target_amount).clamp(Decimal::ZERO, Decimal::ONE)
}

/// Amount still missing to reach the target, never negative.
#[inline]
#[must_use]
pub fn remaining_amount(goal: &Goal) -> Decimal {
    (goal.target_amount - goal.accumulated_amount).max(Decimal::ZERO)
}

/// Calendar months between the month of `today` and the month of the
/// deadline. `None` without a deadline, zero for the deadline month and
/// after it.
#[must_use]
pub fn months_remaining(goal: &Goal, today: NaiveDate) -> Option<u32> {
    let deadline = goal.deadline()?;
    let months = (i64::from(deadline.year()) - i64::from(today.year())) * 12
        + i64::from(deadline.month0())
        - i64::from(today.month0());
    Some(u32::try_from(months.max(0)).unwrap_or(0))
}

/// Monthly contribution that closes the gap by the deadline, rounded to
/// cents. `None` without a deadline.
///
/// Zero when the target is already met or no month is left.
#[must_use]
pub fn suggested_monthly_contribution(goal: &Goal, today: NaiveDate) -> Option<Decimal> {
    let months = months_remaining(goal, today)?;
    let missing = remaining_amount(goal);
    if months == 0 || missing.is_zero() {
        return Some(Decimal::ZERO);
    }
    Some((missing / Decimal::from(months)).round_dp(DEFAULT_SCALE))
}

/// Splits a settled income across goals.
///
/// Each active goal with a non-zero `contribution_percent` receives that
/// percentage of `income`, rounded to cents and capped at the amount still
/// missing. Goals receiving nothing are omitted. The caller adds the
/// allocations to `accumulated_amount` and saves the goals.
#[must_use]
pub fn distribute_income(goals: &[Goal], income: Decimal) -> Vec<(GoalId, Decimal)> {
    if income <= Decimal::ZERO {
        return Vec::new();
    }
    goals
        .iter()
        .filter(|goal| goal.active && !goal.contribution_percent.is_zero())
        .filter_map(|goal| {
            let share = (income * goal.contribution_percent / Decimal::ONE_HUNDRED)
                .round_dp(DEFAULT_SCALE)
                .min(remaining_amount(goal));
            (share > Decimal::ZERO).then(|| (goal.id.clone(), share))
        })
        .collect()
}

/// Adds the allocations from [`distribute_income`] to their goals.
pub fn apply_allocations(goals: &mut [Goal], allocations: &[(GoalId, Decimal)]) {
    for allocation in allocations {
        if let Some(goal) = goals.iter_mut().find(|goal| goal.id == allocation.0) {
            goal.accumulated_amount += allocation.1;
        }
    }
}
