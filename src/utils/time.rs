use std::iter;

use anyhow::{anyhow, Result};
use chrono::{Local, NaiveDate};
use chrono_english::{parse_date_string, Dialect};

/// This is the standard way of converting a date to a string in habitual.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Returns `from`, the day before it, the day before that and so on.
pub fn days_backwards(from: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    iter::successors(Some(from), |day| day.pred_opt())
}

/// Parses a date typed by the user. Accepts `YYYY-MM-DD` as well as English expressions such as
/// "yesterday" or "2 days ago".
pub fn parse_user_date(value: &str) -> Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") {
        return Ok(date);
    }
    parse_date_string(value, Local::now(), Dialect::Uk)
        .map(|v| v.date_naive())
        .map_err(|e| anyhow!("Can't parse {value} into a date: {e}"))
}
