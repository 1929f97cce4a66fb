//! Settlement status derivation.
//!
//! Status is never stored. It is recomputed from the due and settled
//! dates every time it is needed.

use chrono::{Local, NaiveDate};

use crate::models::Status;

/// Date format used for every stored date.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The local current date.
#[inline]
#[must_use]
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parses a stored date. Accepts `YYYY-MM-DD` or a timestamp that starts
/// with one (`2024-03-05T10:00:00`).
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).ok().or_else(|| {
        trimmed
            .get(..10)
            .and_then(|prefix| NaiveDate::parse_from_str(prefix, DATE_FORMAT).ok())
    })
}

/// Derives the status of a transaction relative to the local current
/// date. See [`derive_status_on`].
#[inline]
#[must_use]
pub fn derive_status(due_date: Option<&str>, settled_date: Option<&str>) -> Status {
    derive_status_on(due_date, settled_date, today())
}

/// Derives the status of a transaction relative to `today`.
///
/// `Settled` if a settled date is present; otherwise `Overdue` when the
/// due date is before `today`, `DueToday` when equal, and `Planned` when
/// later, missing or unreadable.
#[must_use]
pub fn derive_status_on(
    due_date: Option<&str>,
    settled_date: Option<&str>,
    today: NaiveDate,
) -> Status {
    if settled_date.is_some_and(|raw| !raw.trim().is_empty()) {
        return Status::Settled;
    }
    match due_date.and_then(parse_date) {
        Some(due) if due < today => Status::Overdue,
        Some(due) if due == today => Status::DueToday,
        Some(_) | None => Status::Planned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn settled_wins_over_due_date() {
        let today = date(2024, 6, 10);
        assert_eq!(
            derive_status_on(Some("2024-01-01"), Some("2024-01-02"), today),
            Status::Settled
        );
        assert_eq!(derive_status_on(None, Some("2024-01-02"), today), Status::Settled);
    }

    #[test]
    fn unsettled_compares_due_date_with_today() {
        let today = date(2024, 6, 10);
        assert_eq!(derive_status_on(Some("2024-06-09"), None, today), Status::Overdue);
        assert_eq!(derive_status_on(Some("2024-06-10"), None, today), Status::DueToday);
        assert_eq!(derive_status_on(Some("2024-06-11"), None, today), Status::Planned);
    }

    #[test]
    fn missing_or_unreadable_due_date_is_planned() {
        let today = date(2024, 6, 10);
        assert_eq!(derive_status_on(None, None, today), Status::Planned);
        assert_eq!(derive_status_on(Some("soon"), None, today), Status::Planned);
        assert_eq!(derive_status_on(Some("2024-02-30"), None, today), Status::Planned);
    }

    #[test]
    fn blank_settled_date_is_not_settled() {
        let today = date(2024, 6, 10);
        assert_eq!(derive_status_on(Some("2024-06-10"), Some(" "), today), Status::DueToday);
    }

    #[test]
    fn parse_date_accepts_timestamps() {
        assert_eq!(parse_date("2024-03-05"), Some(date(2024, 3, 5)));
        assert_eq!(parse_date(" 2024-03-05 "), Some(date(2024, 3, 5)));
        assert_eq!(parse_date("2024-03-05T10:11:12.123"), Some(date(2024, 3, 5)));
        assert_eq!(parse_date("05/03/2024"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn derive_status_uses_local_today() {
        let today = today().to_string();
        assert_eq!(derive_status(Some(&today), None), Status::DueToday);
    }
}
