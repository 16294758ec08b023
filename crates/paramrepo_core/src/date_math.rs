//! Month arithmetic helpers for the monthly time axis.
//!
//! Growth coefficients are addressed by whole-month offsets, so everything here
//! works on `(year, month)` pairs directly instead of going through jiff's
//! `Span` balancing. Day-of-month only matters when counting whole months
//! between two arbitrary dates.

use jiff::civil::Date;

/// Months elapsed since year 0 for the month containing `d`.
#[inline]
fn month_ordinal(d: Date) -> i32 {
    i32::from(d.year()) * 12 + i32::from(d.month()) - 1
}

/// Whole months from `from` to `to` (negative when `to` is earlier).
///
/// A partial month does not count: 2009-01-15 to 2009-02-14 is zero months,
/// to 2009-02-15 is one. For month-start dates this is the plain month difference.
#[inline]
pub fn months_between(from: Date, to: Date) -> i32 {
    let raw = month_ordinal(to) - month_ordinal(from);
    if raw > 0 && to.day() < from.day() {
        raw - 1
    } else if raw < 0 && to.day() > from.day() {
        raw + 1
    } else {
        raw
    }
}

/// Shift a date by `n` calendar months, keeping the day of month.
///
/// Returns `None` when the target day does not exist (e.g. Jan 31 + 1 month)
/// or the year leaves jiff's supported range.
pub fn add_months(d: Date, n: i32) -> Option<Date> {
    let ordinal = month_ordinal(d) + n;
    let year = i16::try_from(ordinal.div_euclid(12)).ok()?;
    let month = (ordinal.rem_euclid(12) + 1) as i8;
    Date::new(year, month, d.day()).ok()
}

#[inline]
pub fn is_month_start(d: Date) -> bool {
    d.day() == 1
}

/// Day zero of spreadsheet serial dates (the 1900 date system).
const SPREADSHEET_EPOCH: (i16, i8, i8) = (1899, 12, 30);

/// Convert a spreadsheet serial day number to a civil date.
///
/// Fractional parts (time of day) are dropped.
pub fn from_spreadsheet_serial(serial: f64) -> Option<Date> {
    if !serial.is_finite() {
        return None;
    }
    let days = serial.trunc() as i64;
    let (y, m, d) = SPREADSHEET_EPOCH;
    jiff::civil::date(y, m, d)
        .checked_add(jiff::Span::new().try_days(days).ok()?)
        .ok()
}
