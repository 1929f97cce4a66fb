//! Marking transactions as settled and reversing it.

use chrono::NaiveDate;

use super::status::today;
use crate::models::Transaction;

/// Settles `record` today, recording `method` when given.
#[inline]
pub fn settle(record: &mut Transaction, method: Option<&str>) {
    settle_on(record, today(), method);
}

/// Settles `record` on `date`, recording `method` when given.
pub fn settle_on(record: &mut Transaction, date: NaiveDate, method: Option<&str>) {
    record.settled_date = Some(date.to_string());
    if let Some(chosen) = method {
        record.settlement_method = Some(chosen.to_owned());
    }
}

/// Reverses [`settle`]: clears the settled date and settlement method.
#[inline]
pub fn unsettle(record: &mut Transaction) {
    record.settled_date = None;
    record.settlement_method = None;
}
