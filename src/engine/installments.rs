//! Splitting an amount into an installment group.

use chrono::{Months, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

use super::records::new_id;
use crate::error::{LedgerError, Result};
use crate::models::{Installment, InstallmentGroupId, Transaction, TransactionId};

/// Minor-unit scale used for amounts (cents).
pub const DEFAULT_SCALE: u32 = 2;

/// Advances `date` by `months` calendar months, clamping to the last day
/// of the target month (Jan 31 + 1 month is Feb 29 in a leap year).
#[inline]
#[must_use]
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

/// Splits `amount` into `count` shares rounded to `scale`, with the
/// difference on the last share so the shares sum to `amount`.
///
/// When rounding up would leave the last share negative (five cents in
/// seven) the shares are truncated instead.
fn split_amount(amount: Decimal, count: u32, scale: u32) -> Vec<Decimal> {
    let exact = amount / Decimal::from(count);
    let others = Decimal::from(count - 1);
    let mut share = exact.round_dp(scale);
    if amount - share * others < Decimal::ZERO {
        share = exact.round_dp_with_strategy(scale, RoundingStrategy::ToZero);
    }
    let mut shares = vec![share; usize::try_from(count).unwrap_or(usize::MAX)];
    if let Some(last) = shares.last_mut() {
        *last = amount - share * others;
    }
    shares
}

/// Generates `count` installments of `base` in cents, one every
/// `month_step` months. See [`generate_installments_with_scale`].
///
/// # Errors
///
/// See [`generate_installments_with_scale`].
#[inline]
pub fn generate_installments(
    base: &Transaction,
    count: u32,
    month_step: u32,
) -> Result<Vec<Transaction>> {
    generate_installments_with_scale(base, count, month_step, DEFAULT_SCALE)
}

/// Generates `count` installments of `base`.
///
/// Each installment is a copy of `base` with a fresh id, a share of
/// `base.amount` rounded to `scale` decimal places (the last one absorbs
/// the difference), a shared group id, its one-based position, and a due
/// date `(index - 1) * month_step` months after the base due date. All
/// start unsettled and non-recurring.
///
/// # Errors
///
/// Returns [`LedgerError::InvalidArgument`] if `count` is zero, the base
/// due date is missing or unreadable, or a due date overflows.
pub fn generate_installments_with_scale(
    base: &Transaction,
    count: u32,
    month_step: u32,
    scale: u32,
) -> Result<Vec<Transaction>> {
    if count == 0 {
        return Err(LedgerError::InvalidArgument(
            "installment count must be at least 1".to_owned(),
        ));
    }
    let first_due = base.due().ok_or_else(|| {
        LedgerError::InvalidArgument(format!(
            "installment base needs a due date, got {:?}",
            base.due_date
        ))
    })?;
    let group_id = InstallmentGroupId::new(new_id("g"));
    let shares = split_amount(base.amount, count, scale);

    (1..=count)
        .zip(shares)
        .map(|(index, amount)| {
            let offset = (index - 1)
                .checked_mul(month_step)
                .ok_or_else(|| LedgerError::InvalidArgument("month offset overflows".to_owned()))?;
            let due = add_months(first_due, offset).ok_or_else(|| {
                LedgerError::InvalidArgument(format!(
                    "due date {first_due} plus {offset} months is out of range"
                ))
            })?;
            let mut installment = base.clone();
            installment.id = TransactionId::new(new_id("p"));
            installment.code = None;
            installment.amount = amount;
            installment.due_date = Some(due.to_string());
            installment.settled_date = None;
            installment.settlement_method = None;
            installment.recurring = false;
            installment.deleted = false;
            installment.deleted_at = None;
            installment.updated_at = None;
            installment.installment = Some(Installment {
                group_id: group_id.clone(),
                index,
                total: count,
            });
            Ok(installment)
        })
        .collect()
}
