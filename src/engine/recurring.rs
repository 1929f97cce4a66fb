//! Monthly recurrence.

use chrono::{Datelike, Months, NaiveDate};

use super::records::new_id;
use crate::models::{Transaction, TransactionId};

/// Moves `date` into `year`/`month`, clamping the day to the month length.
#[must_use]
pub fn in_month(date: NaiveDate, year: i32, month: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = first.checked_add_months(Months::new(1))?;
    let last_day = next.pred_opt()?.day();
    NaiveDate::from_ymd_opt(year, month, date.day().min(last_day))
}

/// Copies every non-deleted recurring transaction into `year`/`month`.
///
/// Copies get a fresh id, are unsettled, and are not themselves recurring,
/// so calling this again for the next month only repeats the originals.
/// Records already due in the target month are skipped, as are records
/// without a readable due date.
#[must_use]
pub fn generate_recurring(list: &[Transaction], year: i32, month: u32) -> Vec<Transaction> {
    list.iter()
        .filter(|tx| tx.recurring && !tx.deleted)
        .filter_map(|tx| {
            let due = tx.due()?;
            if due.year() == year && due.month() == month {
                return None;
            }
            let target = in_month(due, year, month)?;
            let mut copy = tx.clone();
            copy.id = TransactionId::new(new_id("r"));
            copy.code = None;
            copy.due_date = Some(target.to_string());
            copy.settled_date = None;
            copy.settlement_method = None;
            copy.recurring = false;
            copy.installment = None;
            copy.updated_at = None;
            Some(copy)
        })
        .collect()
}
