use chrono::{Local, NaiveDate, TimeDelta};

use crate::error::DashboardError;

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d"];

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parses a report date relative to `today`.
///
/// Accepts `today`, `yesterday`, `-Nd` / `-Nw` offsets, and ISO or
/// day-first calendar dates as they come out of the sheet.
pub fn parse_report_date(input: &str, today: NaiveDate) -> Result<NaiveDate, DashboardError> {
    let input = input.trim();
    let invalid = || DashboardError::InvalidDate(input.to_string());

    match input.to_lowercase().as_str() {
        "today" | "tod" => return Ok(today),
        "yesterday" | "yest" => return today.pred_opt().ok_or_else(invalid),
        _ => {}
    }

    if let Some(rest) = input.strip_prefix('-') {
        if let Some(date) = parse_offset(rest, today) {
            return date.ok_or_else(invalid);
        }
    }

    // Sheets often carry a midnight time component.
    let date_part = input.split([' ', 'T']).next().unwrap_or(input);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
        .ok_or_else(invalid)
}

/// `Nd` / `Nw` back from `today`. `None` when `rest` is not an offset at all,
/// `Some(None)` when it is one but lands outside the calendar.
fn parse_offset(rest: &str, today: NaiveDate) -> Option<Option<NaiveDate>> {
    let (num_str, per_unit) = if let Some(n) = rest.strip_suffix('d') {
        (n, 1)
    } else if let Some(n) = rest.strip_suffix('w') {
        (n, 7)
    } else {
        return None;
    };
    let count = i64::try_from(num_str.parse::<u64>().ok()?).ok()?;
    let delta = count.checked_mul(per_unit).and_then(TimeDelta::try_days);
    Some(delta.and_then(|d| today.checked_sub_signed(d)))
}

/// Every calendar day in `start..=end`; empty when `start > end`.
pub fn calendar_days(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

/// Column heading used by the summary table, e.g. `07-May`.
pub fn column_label(date: NaiveDate) -> String {
    date.format("%d-%b").to_string()
}
